// Use cases layer: application workflows for the arena server.

pub mod arena;
pub mod game;
pub mod types;

pub use arena::{ArenaHandle, ArenaSettings};
pub use game::Simulation;
pub use types::{
    ArenaBroadcast, DirectEvent, DirectMessage, DuelResult, GameEvent, Outbound, WorldFrame,
    WorldUpdate,
};
