// Wire protocol DTOs and conversions for public arena messages.

use crate::domain::{OrbSnapshot, ParticipantId, ParticipantSnapshot};
use crate::use_cases::{DuelResult, WorldUpdate};
use serde::{Deserialize, Serialize};

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    // Full world for a connection that just joined, plus its own id.
    Init(InitDto),
    // Snapshot of the world for a given tick.
    WorldSnapshot(WorldSnapshotDto),
    DuelChallenge(DuelChallengeDto),
    DuelResolved(DuelResolvedDto),
    ParticipantLeft(ParticipantLeftDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    // Handshake; must be the first meaningful message.
    Join,
    MoveInput(MoveInputDto),
    DuelAnswer(DuelAnswerDto),
}

/// Desired world position; the server steers toward it each tick.
#[derive(Debug, Clone, Deserialize)]
pub struct MoveInputDto {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DuelAnswerDto {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitDto {
    pub self_id: String,
    pub tick: u64,
    pub participants: Vec<ParticipantDto>,
    pub orbs: Vec<OrbDto>,
}

impl InitDto {
    pub fn new(self_id: ParticipantId, update: &WorldUpdate) -> Self {
        Self {
            self_id: self_id.to_string(),
            tick: update.tick,
            participants: update.participants.iter().map(ParticipantDto::from).collect(),
            orbs: update.orbs.iter().map(OrbDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshotDto {
    pub tick: u64,
    pub participants: Vec<ParticipantDto>,
    pub orbs: Vec<OrbDto>,
}

impl From<&WorldUpdate> for WorldSnapshotDto {
    fn from(update: &WorldUpdate) -> Self {
        Self {
            tick: update.tick,
            participants: update.participants.iter().map(ParticipantDto::from).collect(),
            orbs: update.orbs.iter().map(OrbDto::from).collect(),
        }
    }
}

/// Flattened participant state for wire transmission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDto {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub mass: f64,
    pub color: &'static str,
    pub in_duel: bool,
}

impl From<&ParticipantSnapshot> for ParticipantDto {
    fn from(p: &ParticipantSnapshot) -> Self {
        Self {
            id: p.id.to_string(),
            x: p.x,
            y: p.y,
            radius: p.radius,
            mass: p.mass,
            color: p.color,
            in_duel: p.in_duel,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrbDto {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub color: &'static str,
}

impl From<&OrbSnapshot> for OrbDto {
    fn from(orb: &OrbSnapshot) -> Self {
        Self {
            id: orb.id.to_string(),
            x: orb.x,
            y: orb.y,
            color: orb.color,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuelChallengeDto {
    pub opponent_id: String,
    pub word: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuelResultDto {
    Win,
    Lose,
    Cancelled,
}

impl From<DuelResult> for DuelResultDto {
    fn from(result: DuelResult) -> Self {
        match result {
            DuelResult::Win => DuelResultDto::Win,
            DuelResult::Lose => DuelResultDto::Lose,
            DuelResult::Cancelled => DuelResultDto::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DuelResolvedDto {
    pub result: DuelResultDto,
    // Mass after resolution.
    pub mass: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantLeftDto {
    pub id: String,
}
