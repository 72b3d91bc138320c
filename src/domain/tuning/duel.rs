// Duel mini-game tuning.

pub const DUEL_VOCABULARY: [&str; 10] = [
    "NEON", "CORTEX", "SYNAPSE", "CYBER", "MATRIX", "PROTOCOL", "SYSTEM", "DATA", "NODE", "FLUX",
];

#[derive(Debug, Clone)]
pub struct DuelTuning {
    /// Share of the loser's mass handed to the winner.
    pub steal_fraction: f64,

    /// The loser's mass never drops below this after a duel.
    pub min_mass: f64,

    /// Distance the loser is pushed away from the winner.
    pub knockback: f64,

    /// Ticks an Active duel may last before it is cancelled (0 disables expiry).
    pub timeout_ticks: u64,

    /// Challenge words; stored upper-case.
    pub vocabulary: &'static [&'static str],
}

impl Default for DuelTuning {
    fn default() -> Self {
        Self {
            steal_fraction: 0.3,
            min_mass: 10.0,
            knockback: 100.0,
            // 30 seconds at 60 Hz.
            timeout_ticks: 1800,
            vocabulary: &DUEL_VOCABULARY,
        }
    }
}
