use super::types::{
    ArenaBroadcast, DirectEvent, DirectMessage, DuelResult, GameEvent, Outbound, WorldUpdate,
};
use crate::domain::systems::collision::{self, OrbCollisionConfig};
use crate::domain::systems::movement::{self, MovementConfig};
use crate::domain::tuning::ArenaTuning;
use crate::domain::{DuelCoordinator, EntityStore, ParticipantId};
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// The authoritative arena. Single writer: only the world task owns it.
///
/// Inputs are applied with [`Simulation::apply_event`] between ticks; [`Simulation::step`] runs
/// one full tick (motion, collisions, duels) and returns the snapshot to broadcast.
pub struct Simulation {
    tuning: ArenaTuning,
    store: EntityStore,
    duels: DuelCoordinator,
    rng: StdRng,
    tick: u64,

    // Answers are judged in the duel phase, in arrival order.
    pending_answers: Vec<(ParticipantId, String)>,
    outbox: Vec<Outbound>,
}

impl Simulation {
    pub fn new(tuning: ArenaTuning, mut rng: StdRng) -> Self {
        let mut store = EntityStore::new(tuning.world.clone(), tuning.participant);
        store.spawn_orbs(tuning.world.orb_count, &mut rng);

        Self {
            duels: DuelCoordinator::new(tuning.duel.clone()),
            tuning,
            store,
            rng,
            tick: 0,
            pending_answers: Vec::new(),
            outbox: Vec::new(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    pub fn duels(&self) -> &DuelCoordinator {
        &self.duels
    }

    /// Takes every out-of-band message produced since the last drain.
    pub fn drain_outbox(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    pub fn apply_event(&mut self, ev: GameEvent) {
        match ev {
            GameEvent::Join { participant_id } => {
                self.store.add_participant(participant_id, &mut self.rng);
                info!(participant_id, "participant joined");

                // Joiners get the full world before any periodic snapshot.
                let world = self.world_update();
                self.send_direct(participant_id, DirectEvent::Init { world });
            }
            GameEvent::Leave { participant_id } => {
                self.remove_participant(participant_id);
            }
            GameEvent::Move {
                participant_id,
                target_x,
                target_y,
            } => {
                // Unknown ids race with disconnects; dropping is expected.
                self.store.apply_input(participant_id, target_x, target_y);
            }
            GameEvent::DuelAnswer {
                participant_id,
                text,
            } => {
                let dueling = self
                    .store
                    .participant(participant_id)
                    .is_some_and(|p| p.is_dueling());
                if dueling {
                    self.pending_answers.push((participant_id, text));
                } else {
                    debug!(participant_id, "duel answer from idle participant dropped");
                }
            }
        }
    }

    fn remove_participant(&mut self, participant_id: ParticipantId) {
        // Cancel first so the opponent never points at a missing record.
        if let Some(cancellation) = self.duels.cancel_for(&mut self.store, participant_id) {
            for (id, mass) in cancellation.notify {
                if id != participant_id {
                    self.send_duel_result(id, DuelResult::Cancelled, mass);
                }
            }
        }

        self.pending_answers.retain(|(id, _)| *id != participant_id);

        if self.store.remove_participant(participant_id).is_some() {
            info!(participant_id, "participant left");
            self.outbox
                .push(Outbound::Broadcast(ArenaBroadcast::ParticipantLeft {
                    participant_id,
                    tick: self.tick,
                }));
        }
    }

    /// Runs one fixed step: motion, collisions, duel resolution. Returns the tick's snapshot.
    pub fn step(&mut self) -> WorldUpdate {
        self.tick += 1;

        movement::tick_all(
            self.store.participants_mut(),
            MovementConfig {
                speed: self.tuning.participant.speed,
            },
        );

        collision::consume_orbs(
            &mut self.store,
            &mut self.rng,
            OrbCollisionConfig {
                pickup_radius: self.tuning.world.orb_pickup_radius,
            },
        );
        let pairs = collision::find_duel_pairs(self.store.participants());

        self.resolve_answers();

        for cancellation in self.duels.expire(&mut self.store, self.tick) {
            for (id, mass) in cancellation.notify {
                self.send_duel_result(id, DuelResult::Cancelled, mass);
            }
        }

        for (a, b) in pairs {
            if let Some(duel) = self
                .duels
                .start(&mut self.store, a, b, self.tick, &mut self.rng)
            {
                self.send_direct(
                    a,
                    DirectEvent::DuelChallenge {
                        opponent_id: b,
                        word: duel.word,
                    },
                );
                self.send_direct(
                    b,
                    DirectEvent::DuelChallenge {
                        opponent_id: a,
                        word: duel.word,
                    },
                );
            }
        }

        self.world_update()
    }

    fn resolve_answers(&mut self) {
        for (participant_id, text) in std::mem::take(&mut self.pending_answers) {
            let Some(resolution) = self
                .duels
                .submit_answer(&mut self.store, participant_id, &text)
            else {
                continue;
            };

            self.send_duel_result(
                resolution.winner,
                DuelResult::Win,
                resolution.winner_mass,
            );
            self.send_duel_result(resolution.loser, DuelResult::Lose, resolution.loser_mass);
        }
    }

    fn send_duel_result(&mut self, to: ParticipantId, result: DuelResult, mass: f64) {
        self.send_direct(to, DirectEvent::DuelResolved { result, mass });
    }

    fn send_direct(&mut self, to: ParticipantId, event: DirectEvent) {
        self.outbox
            .push(Outbound::Direct(DirectMessage { to, event }));
    }

    fn world_update(&self) -> WorldUpdate {
        let (participants, orbs) = self.store.snapshot();
        WorldUpdate {
            tick: self.tick,
            participants,
            orbs,
        }
    }
}

fn dispatch(
    outbound: Vec<Outbound>,
    world_tx: &broadcast::Sender<ArenaBroadcast>,
    direct_tx: &broadcast::Sender<DirectMessage>,
) {
    // Best effort: send only fails when nobody is subscribed.
    for msg in outbound {
        match msg {
            Outbound::Direct(direct) => {
                let _ = direct_tx.send(direct);
            }
            Outbound::Broadcast(event) => {
                let _ = world_tx.send(event);
            }
        }
    }
}

pub async fn world_task(
    mut input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<ArenaBroadcast>,
    direct_tx: broadcast::Sender<DirectMessage>,
    mut sim: Simulation,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
) {
    // Drive the fixed-step game loop at the configured tick rate.
    // Late ticks are skipped rather than bursted; each step moves a fixed distance regardless.
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                break;
            }
            _ = interval.tick() => {}
        }

        // Everything queued since the last tick becomes visible at once.
        let mut applied = 0usize;
        while let Ok(ev) = input_rx.try_recv() {
            sim.apply_event(ev);
            applied += 1;
        }
        if applied > 0 {
            debug!(applied, tick = sim.tick(), "inputs applied");
        }
        dispatch(sim.drain_outbox(), &world_tx, &direct_tx);

        let update = sim.step();
        dispatch(sim.drain_outbox(), &world_tx, &direct_tx);

        if world_tx.send(ArenaBroadcast::World(update)).is_err() && sim.store().len() > 0 {
            debug!(tick = sim.tick(), "no world subscribers while participants are present");
        }
    }

    info!(tick = sim.tick(), "world task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::radius_for_mass;
    use crate::domain::tuning::WorldTuning;
    use crate::use_cases::WorldFrame;
    use rand::SeedableRng;

    fn empty_arena() -> Simulation {
        let tuning = ArenaTuning {
            world: WorldTuning {
                orb_count: 0,
                ..WorldTuning::default()
            },
            ..ArenaTuning::default()
        };
        Simulation::new(tuning, StdRng::seed_from_u64(31))
    }

    fn join_at(sim: &mut Simulation, id: ParticipantId, x: f64, y: f64) {
        sim.apply_event(GameEvent::Join { participant_id: id });
        sim.store_mut()
            .participant_mut(id)
            .expect("participant should exist")
            .place_at(x, y);
    }

    fn directs(outbound: Vec<Outbound>) -> Vec<DirectMessage> {
        outbound
            .into_iter()
            .filter_map(|m| match m {
                Outbound::Direct(d) => Some(d),
                Outbound::Broadcast(_) => None,
            })
            .collect()
    }

    fn challenge_word(messages: &[DirectMessage], to: ParticipantId) -> Option<&'static str> {
        messages.iter().find_map(|m| match m.event {
            DirectEvent::DuelChallenge { word, .. } if m.to == to => Some(word),
            _ => None,
        })
    }

    fn duel_result(messages: &[DirectMessage], to: ParticipantId) -> Option<(DuelResult, f64)> {
        messages.iter().find_map(|m| match m.event {
            DirectEvent::DuelResolved { result, mass } if m.to == to => Some((result, mass)),
            _ => None,
        })
    }

    #[test]
    fn when_arena_starts_then_orb_population_is_seeded() {
        let sim = Simulation::new(ArenaTuning::default(), StdRng::seed_from_u64(1));

        assert_eq!(sim.store().orbs().len(), 50);
        assert!(sim.store().is_empty());
    }

    #[test]
    fn when_participant_joins_then_it_receives_init_with_the_whole_world() {
        let mut sim = Simulation::new(ArenaTuning::default(), StdRng::seed_from_u64(2));
        sim.apply_event(GameEvent::Join { participant_id: 1 });
        sim.drain_outbox();

        sim.apply_event(GameEvent::Join { participant_id: 2 });
        let messages = directs(sim.drain_outbox());

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].to, 2);
        let DirectEvent::Init { world } = &messages[0].event else {
            panic!("expected init, got {:?}", messages[0].event);
        };
        assert_eq!(world.participants.len(), 2);
        assert_eq!(world.orbs.len(), 50);
    }

    #[test]
    fn when_ticks_run_then_orb_population_and_radius_invariants_hold() {
        let mut sim = Simulation::new(ArenaTuning::default(), StdRng::seed_from_u64(3));
        for id in 1..=4 {
            sim.apply_event(GameEvent::Join { participant_id: id });
        }

        for tick in 0..600u64 {
            // Sweep everyone across the world so orbs get eaten.
            let x = (tick * 37 % 2000) as f64;
            for id in 1..=4u64 {
                sim.apply_event(GameEvent::Move {
                    participant_id: id,
                    target_x: x,
                    target_y: (id * 400) as f64,
                });
            }

            let update = sim.step();

            assert_eq!(update.orbs.len(), 50);
            for p in &update.participants {
                assert!((p.radius - radius_for_mass(p.mass)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn when_ticks_run_then_no_participant_is_in_two_duels() {
        let mut sim = empty_arena();
        for id in 1..=6u64 {
            join_at(&mut sim, id, 1000.0 + id as f64, 1000.0);
        }

        for _ in 0..5 {
            sim.step();
            let mut seen = Vec::new();
            for duel in sim.duels().duels() {
                for id in duel.key.members() {
                    assert!(!seen.contains(&id), "participant {id} in two duels");
                    seen.push(id);
                }
            }
        }
        assert_eq!(sim.duels().len(), 3);
    }

    #[test]
    fn when_two_participants_collide_and_one_answers_then_the_duel_resolves() {
        let mut sim = empty_arena();
        join_at(&mut sim, 1, 500.0, 500.0);
        join_at(&mut sim, 2, 520.0, 500.0);
        sim.drain_outbox();

        sim.step();
        let messages = directs(sim.drain_outbox());
        let word = challenge_word(&messages, 1).expect("challenge for participant 1");
        assert_eq!(challenge_word(&messages, 2), Some(word));

        sim.apply_event(GameEvent::DuelAnswer {
            participant_id: 1,
            text: word.to_lowercase(),
        });
        let update = sim.step();
        let messages = directs(sim.drain_outbox());

        let (result, mass) = duel_result(&messages, 1).expect("result for winner");
        assert_eq!(result, DuelResult::Win);
        assert!((mass - 26.0).abs() < 1e-9);
        let (result, mass) = duel_result(&messages, 2).expect("result for loser");
        assert_eq!(result, DuelResult::Lose);
        assert!((mass - 14.0).abs() < 1e-9);

        let loser = update
            .participants
            .iter()
            .find(|p| p.id == 2)
            .expect("loser in snapshot");
        assert!((loser.x - 620.0).abs() < 1e-9);
        assert!(!loser.in_duel);
        assert!(sim.duels().is_empty());
    }

    #[test]
    fn when_wrong_answers_arrive_then_the_duel_stays_active() {
        let mut sim = empty_arena();
        join_at(&mut sim, 1, 500.0, 500.0);
        join_at(&mut sim, 2, 520.0, 500.0);
        sim.step();
        sim.drain_outbox();

        for _ in 0..3 {
            sim.apply_event(GameEvent::DuelAnswer {
                participant_id: 2,
                text: "nope".to_string(),
            });
            sim.step();
        }

        assert!(duel_result(&directs(sim.drain_outbox()), 2).is_none());
        assert_eq!(sim.duels().len(), 1);
        assert_eq!(sim.store().participant(2).map(|p| p.mass()), Some(20.0));
    }

    #[test]
    fn when_three_participants_overlap_then_the_third_waits_for_a_later_tick() {
        let mut sim = empty_arena();
        join_at(&mut sim, 1, 500.0, 500.0);
        join_at(&mut sim, 2, 510.0, 500.0);
        join_at(&mut sim, 3, 505.0, 505.0);
        sim.drain_outbox();

        sim.step();
        assert_eq!(sim.duels().len(), 1);
        assert!(sim.duels().active_for(3).is_none());
        let word = challenge_word(&directs(sim.drain_outbox()), 1).expect("challenge");

        sim.apply_event(GameEvent::DuelAnswer {
            participant_id: 1,
            text: word.to_string(),
        });
        sim.step();
        // Resolution happens after this tick's collision pass, so 3 is still waiting.
        assert!(sim.duels().is_empty());
        assert!(!sim.store().participant(3).expect("participant").is_dueling());

        sim.step();
        let duel = sim.duels().active_for(3).expect("third participant challenged");
        assert!(duel.key.contains(1));
    }

    #[test]
    fn when_participant_leaves_mid_duel_then_opponent_is_released() {
        let mut sim = empty_arena();
        join_at(&mut sim, 1, 500.0, 500.0);
        join_at(&mut sim, 2, 520.0, 500.0);
        sim.step();
        sim.drain_outbox();

        sim.apply_event(GameEvent::Leave { participant_id: 1 });
        let outbound = sim.drain_outbox();

        assert!(outbound.iter().any(|m| matches!(
            m,
            Outbound::Broadcast(ArenaBroadcast::ParticipantLeft {
                participant_id: 1,
                tick: 1,
            })
        )));
        let messages = directs(outbound);
        assert_eq!(
            duel_result(&messages, 2),
            Some((DuelResult::Cancelled, 20.0))
        );
        assert!(duel_result(&messages, 1).is_none());

        let remaining = sim.store().participant(2).expect("participant");
        assert!(!remaining.is_dueling());
        assert_eq!(remaining.opponent(), None);
        assert_eq!(remaining.mass(), 20.0);
        assert!(sim.duels().is_empty());
    }

    #[test]
    fn when_answer_is_queued_and_sender_leaves_then_it_is_discarded() {
        let mut sim = empty_arena();
        join_at(&mut sim, 1, 500.0, 500.0);
        join_at(&mut sim, 2, 520.0, 500.0);
        sim.step();
        let word = challenge_word(&directs(sim.drain_outbox()), 1).expect("challenge");

        sim.apply_event(GameEvent::DuelAnswer {
            participant_id: 1,
            text: word.to_string(),
        });
        sim.apply_event(GameEvent::Leave { participant_id: 1 });
        sim.step();

        assert_eq!(sim.store().participant(2).map(|p| p.mass()), Some(20.0));
    }

    #[test]
    fn when_events_reference_unknown_participants_then_they_are_dropped() {
        let mut sim = empty_arena();

        sim.apply_event(GameEvent::Move {
            participant_id: 404,
            target_x: 1.0,
            target_y: 1.0,
        });
        sim.apply_event(GameEvent::DuelAnswer {
            participant_id: 404,
            text: "NEON".to_string(),
        });
        sim.apply_event(GameEvent::Leave { participant_id: 404 });
        sim.step();

        assert!(sim.drain_outbox().is_empty());
        assert!(sim.store().is_empty());
    }

    #[test]
    fn when_duel_times_out_then_both_participants_are_notified() {
        let mut tuning = ArenaTuning::default();
        tuning.world.orb_count = 0;
        tuning.duel.timeout_ticks = 3;
        let mut sim = Simulation::new(tuning, StdRng::seed_from_u64(4));
        join_at(&mut sim, 1, 500.0, 500.0);
        join_at(&mut sim, 2, 520.0, 500.0);

        sim.step();
        sim.drain_outbox();
        sim.step();
        sim.step();
        assert_eq!(sim.duels().len(), 1);

        sim.step();
        let messages = directs(sim.drain_outbox());

        assert_eq!(
            duel_result(&messages, 1),
            Some((DuelResult::Cancelled, 20.0))
        );
        assert_eq!(
            duel_result(&messages, 2),
            Some((DuelResult::Cancelled, 20.0))
        );
        assert!(sim.duels().is_empty());

        // Pairs are found before expiry, so the still-overlapping pair re-duels a tick later.
        sim.step();
        assert_eq!(sim.duels().duels().next().map(|d| d.started_tick), Some(5));
    }

    fn recipients_over_expiring_duels(seed: u64) -> Vec<ParticipantId> {
        let mut tuning = ArenaTuning::default();
        tuning.world.orb_count = 0;
        tuning.duel.timeout_ticks = 2;
        let mut sim = Simulation::new(tuning, StdRng::seed_from_u64(seed));
        for pair in 0..8u64 {
            let x = 100.0 * pair as f64;
            join_at(&mut sim, pair * 2 + 1, x, 100.0);
            join_at(&mut sim, pair * 2 + 2, x + 10.0, 100.0);
        }
        sim.drain_outbox();

        let mut recipients = Vec::new();
        for _ in 0..6 {
            sim.step();
            recipients.extend(directs(sim.drain_outbox()).into_iter().map(|m| m.to));
        }
        recipients
    }

    #[test]
    fn when_many_duels_expire_in_one_tick_then_notifications_replay_identically() {
        let first = recipients_over_expiring_duels(1);

        assert!(!first.is_empty());
        for _ in 0..10 {
            assert_eq!(recipients_over_expiring_duels(1), first);
        }
        // Expiry notifications for tick 3 follow pair order.
        let cancelled_at_tick_3 = &first[16..32];
        assert_eq!(cancelled_at_tick_3, (1..=16).collect::<Vec<_>>().as_slice());
    }

    #[test]
    fn when_someone_leaves_right_after_a_join_then_departure_shares_the_init_tick() {
        let mut sim = empty_arena();
        join_at(&mut sim, 1, 100.0, 100.0);
        sim.step();
        sim.step();
        sim.drain_outbox();

        sim.apply_event(GameEvent::Join { participant_id: 2 });
        sim.apply_event(GameEvent::Leave { participant_id: 1 });
        let outbound = sim.drain_outbox();

        let init_tick = outbound
            .iter()
            .find_map(|m| match m {
                Outbound::Direct(DirectMessage {
                    to: 2,
                    event: DirectEvent::Init { world },
                }) => Some(world.tick),
                _ => None,
            })
            .expect("joiner gets init");
        let left_tick = outbound
            .iter()
            .find_map(|m| match m {
                Outbound::Broadcast(ArenaBroadcast::ParticipantLeft {
                    participant_id: 1,
                    tick,
                }) => Some(*tick),
                _ => None,
            })
            .expect("departure is broadcast");
        assert_eq!(init_tick, 2);
        assert_eq!(left_tick, init_tick);

        // The joiner's init still lists the leaver, so the departure must reach it.
        let departure = WorldFrame {
            tick: left_tick,
            is_snapshot: false,
            bytes: "{}".into(),
        };
        assert!(departure.is_newer_than(init_tick));
        assert_eq!(sim.step().tick, init_tick + 1);
    }

    #[tokio::test]
    async fn when_world_task_runs_then_joiners_get_init_then_snapshots_until_shutdown() {
        let (input_tx, input_rx) = mpsc::channel(16);
        let (world_tx, mut world_rx) = broadcast::channel(64);
        let (direct_tx, mut direct_rx) = broadcast::channel(64);
        let shutdown = Arc::new(Notify::new());

        let handle = tokio::spawn(world_task(
            input_rx,
            world_tx,
            direct_tx,
            empty_arena(),
            Duration::from_millis(5),
            shutdown.clone(),
        ));

        input_tx
            .send(GameEvent::Join { participant_id: 9 })
            .await
            .expect("world task should accept input");

        let init = tokio::time::timeout(Duration::from_secs(2), direct_rx.recv())
            .await
            .expect("init should arrive")
            .expect("direct channel open");
        assert_eq!(init.to, 9);
        assert!(matches!(init.event, DirectEvent::Init { .. }));

        let snapshot = loop {
            let msg = tokio::time::timeout(Duration::from_secs(2), world_rx.recv())
                .await
                .expect("snapshot should arrive")
                .expect("world channel open");
            if let ArenaBroadcast::World(update) = msg {
                if !update.participants.is_empty() {
                    break update;
                }
            }
        };
        assert_eq!(snapshot.participants[0].id, 9);

        shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("world task should stop")
            .expect("world task should not panic");
    }
}
