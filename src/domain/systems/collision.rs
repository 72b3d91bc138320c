use crate::domain::state::{Participant, ParticipantId};
use crate::domain::store::{EntityStore, OrbPickup};
use rand::Rng;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct OrbCollisionConfig {
    pub pickup_radius: f64,
}

/// Participant vs orb pass. Dueling participants cannot feed.
///
/// Orbs are scanned last to first so a replacement appended during the scan is not revisited
/// by the same participant this tick.
pub fn consume_orbs<R: Rng>(
    store: &mut EntityStore,
    rng: &mut R,
    cfg: OrbCollisionConfig,
) -> Vec<OrbPickup> {
    let mut pickups = Vec::new();

    let feeders: Vec<ParticipantId> = store
        .participants()
        .iter()
        .filter(|p| !p.is_dueling())
        .map(|p| p.id)
        .collect();

    for participant_id in feeders {
        let mut orb_idx = store.orbs().len();
        while orb_idx > 0 {
            orb_idx -= 1;

            let Some(p) = store.participant(participant_id) else {
                break;
            };
            let orb = &store.orbs()[orb_idx];
            if p.distance_to(orb.x, orb.y) >= p.radius() + cfg.pickup_radius {
                continue;
            }

            let orb_id = orb.id;
            if let Some(pickup) = store.consume_orb(participant_id, orb_id, rng) {
                debug!(participant_id, orb_id, mass = pickup.mass, "orb consumed");
                pickups.push(pickup);
            }
        }
    }

    pickups
}

fn overlaps(a: &Participant, b: &Participant) -> bool {
    a.distance_to(b.x, b.y) < a.radius() + b.radius()
}

/// Participant vs participant pass (naive O(n^2), fine for tens of participants).
///
/// Pairs are evaluated in join order. A participant already claimed by an earlier pair in the
/// same scan is skipped, so returned pairs never share a member.
pub fn find_duel_pairs(participants: &[Participant]) -> Vec<(ParticipantId, ParticipantId)> {
    let mut pairs = Vec::new();
    let mut claimed = vec![false; participants.len()];

    for i in 0..participants.len() {
        for j in (i + 1)..participants.len() {
            if claimed[i] || claimed[j] {
                continue;
            }

            let (a, b) = (&participants[i], &participants[j]);
            if a.is_dueling() || b.is_dueling() {
                continue;
            }

            if overlaps(a, b) {
                claimed[i] = true;
                claimed[j] = true;
                pairs.push((a.id, b.id));
            }
        }
    }

    pairs
}
