// Arena orchestration: channel wiring and world task lifecycle.

use crate::domain::tuning::ArenaTuning;
use crate::use_cases::game::{Simulation, world_task};
use crate::use_cases::{ArenaBroadcast, DirectMessage, GameEvent, WorldFrame};
use axum::extract::ws::Utf8Bytes;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tracing::info;

/// Runtime configuration for spawning the arena world.
#[derive(Debug, Clone)]
pub struct ArenaSettings {
    /// Capacity for inbound participant events.
    pub input_channel_capacity: usize,
    /// Capacity for broadcast world updates (raw and serialized).
    pub world_broadcast_capacity: usize,
    /// Capacity for targeted per-participant events.
    pub direct_event_capacity: usize,
    /// Fixed tick interval for the game loop.
    pub tick_interval: Duration,
    pub tuning: ArenaTuning,
    /// Fixed RNG seed for reproducible worlds; entropy when unset.
    pub seed: Option<u64>,
}

/// Channels connecting sockets to the running arena.
#[derive(Clone)]
pub struct ArenaHandle {
    /// Sender for game events into the world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    /// Broadcast sender for raw arena-wide events.
    pub world_tx: broadcast::Sender<ArenaBroadcast>,
    /// Broadcast sender for serialized arena-wide events.
    pub world_bytes_tx: broadcast::Sender<WorldFrame>,
    /// Watch sender holding the latest serialized world snapshot.
    pub world_latest_tx: watch::Sender<Utf8Bytes>,
    /// Broadcast sender for events addressed to one participant.
    pub direct_tx: broadcast::Sender<DirectMessage>,
    shutdown: Arc<Notify>,
}

impl ArenaHandle {
    /// Wires the channels and spawns the authoritative world loop.
    pub fn spawn(settings: ArenaSettings) -> Self {
        let (input_tx, input_rx) = mpsc::channel::<GameEvent>(settings.input_channel_capacity);
        let (world_tx, _world_rx) =
            broadcast::channel::<ArenaBroadcast>(settings.world_broadcast_capacity);
        let (world_bytes_tx, _world_bytes_rx) =
            broadcast::channel::<WorldFrame>(settings.world_broadcast_capacity);
        let (world_latest_tx, _world_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));
        let (direct_tx, _direct_rx) =
            broadcast::channel::<DirectMessage>(settings.direct_event_capacity);
        let shutdown = Arc::new(Notify::new());

        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let sim = Simulation::new(settings.tuning, rng);

        info!(
            seed = ?settings.seed,
            tick_ms = settings.tick_interval.as_millis() as u64,
            "arena spawned"
        );

        tokio::spawn(world_task(
            input_rx,
            world_tx.clone(),
            direct_tx.clone(),
            sim,
            settings.tick_interval,
            shutdown.clone(),
        ));

        Self {
            input_tx,
            world_tx,
            world_bytes_tx,
            world_latest_tx,
            direct_tx,
            shutdown,
        }
    }

    /// Stops the world task after its current tick.
    pub fn shutdown(&self) {
        // notify_one stores a permit, so a signal sent mid-tick is not lost.
        self.shutdown.notify_one();
    }
}
