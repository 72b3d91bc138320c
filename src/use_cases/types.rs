// Use-case level inputs/outputs for the arena loop.

use crate::domain::{OrbSnapshot, ParticipantId, ParticipantSnapshot};
use axum::extract::ws::Utf8Bytes;

/// Intents enqueued by connections; applied by the world task at the next tick boundary.
#[derive(Debug, Clone)]
pub enum GameEvent {
    Join {
        participant_id: ParticipantId,
    },
    Leave {
        participant_id: ParticipantId,
    },
    Move {
        participant_id: ParticipantId,
        target_x: f64,
        target_y: f64,
    },
    DuelAnswer {
        participant_id: ParticipantId,
        text: String,
    },
}

#[derive(Debug, Clone)]
pub struct WorldUpdate {
    pub tick: u64,
    pub participants: Vec<ParticipantSnapshot>,
    pub orbs: Vec<OrbSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelResult {
    Win,
    Lose,
    // Opponent left or the duel expired.
    Cancelled,
}

/// Out-of-band events addressed to a single participant.
#[derive(Debug, Clone)]
pub enum DirectEvent {
    Init {
        world: WorldUpdate,
    },
    DuelChallenge {
        opponent_id: ParticipantId,
        word: &'static str,
    },
    DuelResolved {
        result: DuelResult,
        mass: f64,
    },
}

#[derive(Debug, Clone)]
pub struct DirectMessage {
    pub to: ParticipantId,
    pub event: DirectEvent,
}

/// Events fanned out to every connection.
#[derive(Debug, Clone)]
pub enum ArenaBroadcast {
    World(WorldUpdate),
    // `tick` is the tick the departure was applied on, before that tick's step.
    ParticipantLeft {
        participant_id: ParticipantId,
        tick: u64,
    },
}

/// An arena-wide event serialized once and shared by every connection.
#[derive(Debug, Clone)]
pub struct WorldFrame {
    pub tick: u64,
    pub is_snapshot: bool,
    pub bytes: Utf8Bytes,
}

impl WorldFrame {
    /// Whether a connection initialized at `init_tick` still needs this frame.
    ///
    /// Snapshots up to `init_tick` are already covered by init. Departures applied on
    /// `init_tick` itself may have come after the join in the same drain, so they pass.
    pub fn is_newer_than(&self, init_tick: u64) -> bool {
        if self.is_snapshot {
            self.tick > init_tick
        } else {
            self.tick >= init_tick
        }
    }
}

/// Messages produced while applying inputs or stepping, in emission order.
#[derive(Debug, Clone)]
pub enum Outbound {
    Direct(DirectMessage),
    Broadcast(ArenaBroadcast),
}
