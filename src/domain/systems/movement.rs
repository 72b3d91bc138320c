use crate::domain::state::Participant;

#[derive(Debug, Clone, Copy)]
pub struct MovementConfig {
    pub speed: f64, // units per tick
}

/// Steering-seek: advance at most `speed` toward the target, snapping when within reach.
pub fn tick_participant(p: &mut Participant, cfg: MovementConfig) {
    let dx = p.target_x - p.x;
    let dy = p.target_y - p.y;
    let distance = dx.hypot(dy);

    if distance <= cfg.speed {
        p.x = p.target_x;
        p.y = p.target_y;
        return;
    }

    p.x += dx / distance * cfg.speed;
    p.y += dy / distance * cfg.speed;
}

pub fn tick_all(participants: &mut [Participant], cfg: MovementConfig) {
    // Dueling does not block movement.
    for p in participants.iter_mut() {
        tick_participant(p, cfg);
    }
}
