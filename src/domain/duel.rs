// Duel coordinator: per-pair state machine triggered by participant overlap.
//
// Idle -> Active when the collision pass pairs two idle participants.
// Active -> Resolved when one side types the word, either side leaves, or the duel expires.

use super::state::{DuelState, ParticipantId};
use super::store::EntityStore;
use super::tuning::DuelTuning;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Unordered participant pair; `(a, b)` and `(b, a)` map to the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DuelKey {
    low: ParticipantId,
    high: ParticipantId,
}

impl DuelKey {
    pub fn new(a: ParticipantId, b: ParticipantId) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn members(&self) -> [ParticipantId; 2] {
        [self.low, self.high]
    }

    pub fn contains(&self, id: ParticipantId) -> bool {
        self.low == id || self.high == id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelPhase {
    Active,
    Resolved,
}

#[derive(Debug, Clone)]
pub struct Duel {
    pub key: DuelKey,
    pub word: &'static str,
    pub started_tick: u64,
    pub phase: DuelPhase,
}

/// Effects of a won duel, already applied to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct DuelResolution {
    pub winner: ParticipantId,
    pub loser: ParticipantId,
    pub steal: f64,
    pub winner_mass: f64,
    pub loser_mass: f64,
}

/// A duel that ended without a winner. `notify` lists the members still in the store.
#[derive(Debug, Clone)]
pub struct DuelCancellation {
    pub duel: Duel,
    pub notify: Vec<(ParticipantId, f64)>,
}

/// Splits `steal_fraction` of the loser's mass to the winner, flooring the loser at `min_mass`.
pub fn transfer_mass(
    winner_mass: f64,
    loser_mass: f64,
    steal_fraction: f64,
    min_mass: f64,
) -> (f64, f64) {
    let steal = loser_mass * steal_fraction;
    (winner_mass + steal, (loser_mass - steal).max(min_mass))
}

/// Position of the loser after being pushed `distance` along the winner -> loser direction.
pub fn knockback(winner: (f64, f64), loser: (f64, f64), distance: f64) -> (f64, f64) {
    let angle = (loser.1 - winner.1).atan2(loser.0 - winner.0);
    (
        loser.0 + angle.cos() * distance,
        loser.1 + angle.sin() * distance,
    )
}

pub struct DuelCoordinator {
    tuning: DuelTuning,
    // Ordered map: iteration (and so message emission) is identical across runs.
    duels: BTreeMap<DuelKey, Duel>,
}

impl DuelCoordinator {
    pub fn new(tuning: DuelTuning) -> Self {
        Self {
            tuning,
            duels: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.duels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.duels.is_empty()
    }

    pub fn duels(&self) -> impl Iterator<Item = &Duel> {
        self.duels.values()
    }

    /// The Active duel referencing `id`, if any.
    pub fn active_for(&self, id: ParticipantId) -> Option<&Duel> {
        self.duels.values().find(|d| d.key.contains(id))
    }

    /// Idle -> Active. Returns `None` unless both participants exist and are idle.
    pub fn start<R: Rng>(
        &mut self,
        store: &mut EntityStore,
        a: ParticipantId,
        b: ParticipantId,
        tick: u64,
        rng: &mut R,
    ) -> Option<Duel> {
        if a == b {
            return None;
        }

        let both_idle = [a, b].iter().all(|id| {
            store.participant(*id).is_some_and(|p| !p.is_dueling()) && self.active_for(*id).is_none()
        });
        if !both_idle {
            return None;
        }

        let word = self.tuning.vocabulary.choose(rng).copied()?;

        if let Some(p) = store.participant_mut(a) {
            p.duel = DuelState::InDuel { opponent: b };
        }
        if let Some(p) = store.participant_mut(b) {
            p.duel = DuelState::InDuel { opponent: a };
        }

        let duel = Duel {
            key: DuelKey::new(a, b),
            word,
            started_tick: tick,
            phase: DuelPhase::Active,
        };
        self.duels.insert(duel.key, duel.clone());

        info!(a, b, tick, "duel started");
        debug!(a, b, word, "duel word assigned");
        Some(duel)
    }

    /// Checks an answer from `id`. Wrong answers and answers from idle participants are ignored.
    pub fn submit_answer(
        &mut self,
        store: &mut EntityStore,
        id: ParticipantId,
        text: &str,
    ) -> Option<DuelResolution> {
        let opponent = store.participant(id)?.opponent()?;
        let key = DuelKey::new(id, opponent);
        let duel = self.duels.get(&key)?;

        if text.trim().to_uppercase() != duel.word {
            return None;
        }

        self.duels.remove(&key);
        self.resolve(store, id, opponent)
    }

    fn resolve(
        &mut self,
        store: &mut EntityStore,
        winner_id: ParticipantId,
        loser_id: ParticipantId,
    ) -> Option<DuelResolution> {
        let (winner_pos, winner_mass) = store
            .participant(winner_id)
            .map(|p| ((p.x, p.y), p.mass()))?;
        let Some((loser_pos, loser_mass)) =
            store.participant(loser_id).map(|p| ((p.x, p.y), p.mass()))
        else {
            // Opponent vanished; leave the winner idle without effects.
            if let Some(w) = store.participant_mut(winner_id) {
                w.duel = DuelState::Idle;
            }
            return None;
        };

        let (new_winner_mass, new_loser_mass) = transfer_mass(
            winner_mass,
            loser_mass,
            self.tuning.steal_fraction,
            self.tuning.min_mass,
        );
        let (kx, ky) = knockback(winner_pos, loser_pos, self.tuning.knockback);

        if let Some(w) = store.participant_mut(winner_id) {
            w.set_mass(new_winner_mass);
            w.duel = DuelState::Idle;
        }
        if let Some(l) = store.participant_mut(loser_id) {
            l.set_mass(new_loser_mass);
            l.x = kx;
            l.y = ky;
            l.duel = DuelState::Idle;
        }

        let steal = new_winner_mass - winner_mass;
        info!(
            winner = winner_id,
            loser = loser_id,
            steal,
            winner_mass = new_winner_mass,
            loser_mass = new_loser_mass,
            "duel resolved"
        );

        Some(DuelResolution {
            winner: winner_id,
            loser: loser_id,
            steal,
            winner_mass: new_winner_mass,
            loser_mass: new_loser_mass,
        })
    }

    /// Ends the duel involving `id` with no winner. Call before removing `id` from the store.
    pub fn cancel_for(
        &mut self,
        store: &mut EntityStore,
        id: ParticipantId,
    ) -> Option<DuelCancellation> {
        let key = self.active_for(id)?.key;
        self.cancel(store, key)
    }

    /// Cancels every duel that has been Active for at least the configured number of ticks.
    pub fn expire(&mut self, store: &mut EntityStore, tick: u64) -> Vec<DuelCancellation> {
        if self.tuning.timeout_ticks == 0 {
            return Vec::new();
        }

        let timeout = self.tuning.timeout_ticks;
        let mut expired: Vec<(u64, DuelKey)> = self
            .duels
            .values()
            .filter(|d| tick.saturating_sub(d.started_tick) >= timeout)
            .map(|d| (d.started_tick, d.key))
            .collect();
        // Oldest first, ties broken by pair.
        expired.sort_unstable();

        expired
            .into_iter()
            .filter_map(|(_, key)| {
                let [a, b] = key.members();
                info!(a, b, tick, "duel expired");
                self.cancel(store, key)
            })
            .collect()
    }

    fn cancel(&mut self, store: &mut EntityStore, key: DuelKey) -> Option<DuelCancellation> {
        let mut duel = self.duels.remove(&key)?;
        duel.phase = DuelPhase::Resolved;

        let mut notify = Vec::with_capacity(2);
        for id in key.members() {
            if let Some(p) = store.participant_mut(id) {
                p.duel = DuelState::Idle;
                notify.push((id, p.mass()));
            }
        }

        let [a, b] = key.members();
        info!(a, b, "duel cancelled");
        Some(DuelCancellation { duel, notify })
    }
}
