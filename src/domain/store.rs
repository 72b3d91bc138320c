// Canonical owner of participant and orb records. All writes go through here.

use super::state::{Orb, OrbSnapshot, Participant, ParticipantId, ParticipantSnapshot};
use super::tuning::{ParticipantTuning, WorldTuning};
use rand::Rng;
use rand::seq::SliceRandom;

/// Result of a single orb pickup.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbPickup {
    pub participant_id: ParticipantId,
    pub orb_id: u64,
    pub mass: f64,
}

pub struct EntityStore {
    world: WorldTuning,
    participant: ParticipantTuning,

    // Join order doubles as the fixed enumeration order for collision scans.
    participants: Vec<Participant>,
    orbs: Vec<Orb>,
    next_orb_id: u64,
}

impl EntityStore {
    pub fn new(world: WorldTuning, participant: ParticipantTuning) -> Self {
        Self {
            world,
            participant,
            participants: Vec::new(),
            orbs: Vec::new(),
            next_orb_id: 1,
        }
    }

    /// Spawns a participant at a random position with a random palette color.
    ///
    /// Re-adding a live id keeps the existing record.
    pub fn add_participant<R: Rng>(&mut self, id: ParticipantId, rng: &mut R) -> &Participant {
        if let Some(idx) = self.index_of(id) {
            return &self.participants[idx];
        }

        let (x, y) = self.random_position(rng);
        let color = self
            .world
            .palette
            .choose(rng)
            .copied()
            .unwrap_or(self.world.orb_color);
        self.participants.push(Participant::new(
            id,
            x,
            y,
            self.participant.spawn_mass,
            color,
        ));

        let last = self.participants.len() - 1;
        &self.participants[last]
    }

    /// Deletes the record. Callers cancel any duel first.
    pub fn remove_participant(&mut self, id: ParticipantId) -> Option<Participant> {
        let idx = self.index_of(id)?;
        Some(self.participants.remove(idx))
    }

    /// Overwrites the movement target; unknown ids are ignored.
    pub fn apply_input(&mut self, id: ParticipantId, target_x: f64, target_y: f64) -> bool {
        match self.participant_mut(id) {
            Some(p) => {
                p.target_x = target_x;
                p.target_y = target_y;
                true
            }
            None => false,
        }
    }

    pub fn spawn_orbs<R: Rng>(&mut self, count: usize, rng: &mut R) {
        for _ in 0..count {
            let (x, y) = self.random_position(rng);
            let id = self.next_orb_id;
            self.next_orb_id = self.next_orb_id.wrapping_add(1);
            self.orbs.push(Orb {
                id,
                x,
                y,
                color: self.world.orb_color,
            });
        }
    }

    /// Removes the orb, feeds the participant and spawns exactly one replacement.
    pub fn consume_orb<R: Rng>(
        &mut self,
        participant_id: ParticipantId,
        orb_id: u64,
        rng: &mut R,
    ) -> Option<OrbPickup> {
        let p_idx = self.index_of(participant_id)?;
        let orb_idx = self.orbs.iter().position(|o| o.id == orb_id)?;

        self.orbs.remove(orb_idx);
        let participant = &mut self.participants[p_idx];
        let mass = participant.mass() + self.participant.orb_mass;
        participant.set_mass(mass);

        self.spawn_orbs(1, rng);

        Some(OrbPickup {
            participant_id,
            orb_id,
            mass,
        })
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn participant_mut(&mut self, id: ParticipantId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.id == id)
    }

    /// Participants in join order.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn participants_mut(&mut self) -> &mut [Participant] {
        &mut self.participants
    }

    pub fn orbs(&self) -> &[Orb] {
        &self.orbs
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn snapshot(&self) -> (Vec<ParticipantSnapshot>, Vec<OrbSnapshot>) {
        (
            self.participants
                .iter()
                .map(ParticipantSnapshot::from)
                .collect(),
            self.orbs.iter().map(OrbSnapshot::from).collect(),
        )
    }

    fn index_of(&self, id: ParticipantId) -> Option<usize> {
        self.participants.iter().position(|p| p.id == id)
    }

    fn random_position<R: Rng>(&self, rng: &mut R) -> (f64, f64) {
        (
            rng.gen_range(0.0..self.world.width),
            rng.gen_range(0.0..self.world.height),
        )
    }

    #[cfg(test)]
    pub(crate) fn push_orb_at(&mut self, x: f64, y: f64) -> u64 {
        let id = self.next_orb_id;
        self.next_orb_id = self.next_orb_id.wrapping_add(1);
        self.orbs.push(Orb {
            id,
            x,
            y,
            color: self.world.orb_color,
        });
        id
    }
}
