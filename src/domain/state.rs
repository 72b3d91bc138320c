// Domain-level simulation entities and snapshot types.

pub type ParticipantId = u64;

/// Radius of a participant with zero mass.
pub const BASE_RADIUS: f64 = 20.0;

/// Radius is always derived from mass; nothing stores it.
pub fn radius_for_mass(mass: f64) -> f64 {
    BASE_RADIUS + mass.sqrt() * 2.0
}

/// Duel membership of a participant. The opponent id only exists while dueling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelState {
    Idle,
    InDuel { opponent: ParticipantId },
}

#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub x: f64,
    pub y: f64,

    // Last commanded movement target.
    pub target_x: f64,
    pub target_y: f64,

    pub color: &'static str,
    pub duel: DuelState,

    mass: f64,
}

impl Participant {
    pub fn new(id: ParticipantId, x: f64, y: f64, mass: f64, color: &'static str) -> Self {
        Self {
            id,
            x,
            y,
            target_x: x,
            target_y: y,
            color,
            duel: DuelState::Idle,
            mass,
        }
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass;
    }

    pub fn radius(&self) -> f64 {
        radius_for_mass(self.mass)
    }

    pub fn is_dueling(&self) -> bool {
        matches!(self.duel, DuelState::InDuel { .. })
    }

    pub fn opponent(&self) -> Option<ParticipantId> {
        match self.duel {
            DuelState::InDuel { opponent } => Some(opponent),
            DuelState::Idle => None,
        }
    }

    /// Moves the participant and resets its target so it stays put.
    #[cfg(test)]
    pub(crate) fn place_at(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.target_x = x;
        self.target_y = y;
    }

    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        (self.x - x).hypot(self.y - y)
    }
}

#[derive(Debug, Clone)]
pub struct Orb {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantSnapshot {
    pub id: ParticipantId,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub mass: f64,
    pub color: &'static str,
    pub in_duel: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrbSnapshot {
    pub id: u64,
    pub x: f64,
    pub y: f64,
    pub color: &'static str,
}

impl From<&Participant> for ParticipantSnapshot {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.id,
            x: p.x,
            y: p.y,
            radius: p.radius(),
            mass: p.mass(),
            color: p.color,
            in_duel: p.is_dueling(),
        }
    }
}

impl From<&Orb> for OrbSnapshot {
    fn from(o: &Orb) -> Self {
        Self {
            id: o.id,
            x: o.x,
            y: o.y,
            color: o.color,
        }
    }
}
