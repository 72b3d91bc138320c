// Domain layer: core simulation types and rules.

pub mod duel;
pub mod state;
pub mod store;
pub mod systems;
pub mod tuning;

pub use duel::{Duel, DuelCoordinator, DuelKey, DuelPhase};
pub use state::{
    DuelState, Orb, OrbSnapshot, Participant, ParticipantId, ParticipantSnapshot, radius_for_mass,
};
pub use store::EntityStore;
