/// Gameplay tuning for participants.
///
/// Keep this separate from runtime/server configuration (tick rates, buffer sizes, etc.).

#[derive(Debug, Clone, Copy)]
pub struct ParticipantTuning {
    /// Maximum distance covered per tick, in world units.
    pub speed: f64,

    /// Mass every participant spawns with.
    pub spawn_mass: f64,

    /// Mass gained per consumed orb.
    pub orb_mass: f64,
}

impl Default for ParticipantTuning {
    fn default() -> Self {
        Self {
            speed: 5.0,
            spawn_mass: 20.0,
            orb_mass: 1.0,
        }
    }
}
