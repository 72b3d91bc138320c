// World layout and orb field tuning.

pub const PARTICIPANT_PALETTE: [&str; 5] = ["#00FFFF", "#FF00FF", "#FFFF00", "#00FF00", "#FF0000"];
pub const ORB_COLOR: &str = "#FFFFFF";

#[derive(Debug, Clone)]
pub struct WorldTuning {
    /// Spawn area width; positions are drawn from `0..width`.
    pub width: f64,

    /// Spawn area height; positions are drawn from `0..height`.
    pub height: f64,

    /// Orb population maintained by the arena.
    pub orb_count: usize,

    /// Pickup radius added to a participant's radius for orb overlap checks.
    pub orb_pickup_radius: f64,

    /// Colors assigned to joining participants.
    pub palette: &'static [&'static str],

    pub orb_color: &'static str,
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            width: 2000.0,
            height: 2000.0,
            orb_count: 50,
            orb_pickup_radius: 5.0,
            palette: &PARTICIPANT_PALETTE,
            orb_color: ORB_COLOR,
        }
    }
}
