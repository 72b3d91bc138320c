// Gameplay tuning, kept apart from runtime/server configuration.

pub mod duel;
pub mod participant;
pub mod world;

pub use duel::DuelTuning;
pub use participant::ParticipantTuning;
pub use world::WorldTuning;

/// All gameplay knobs for one arena.
#[derive(Debug, Clone, Default)]
pub struct ArenaTuning {
    pub participant: ParticipantTuning,
    pub world: WorldTuning,
    pub duel: DuelTuning,
}
