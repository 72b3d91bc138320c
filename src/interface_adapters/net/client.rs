use crate::domain::ParticipantId;
use crate::interface_adapters::protocol::{
    ClientMessage, DuelChallengeDto, DuelResolvedDto, InitDto, ParticipantLeftDto, ServerMessage,
    WorldSnapshotDto,
};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids;
use crate::use_cases::{
    ArenaBroadcast, ArenaHandle, DirectEvent, DirectMessage, GameEvent, WorldFrame,
};

use axum::{
    Error,
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    WorldUpdatesClosed,
    DirectEventsClosed,
    JoinRequired,
    JoinTimeout,
    ClosedBeforeJoin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_ANSWER_LEN: usize = 64;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn world_update_serializer(
    mut world_rx: broadcast::Receiver<ArenaBroadcast>,
    world_bytes_tx: broadcast::Sender<WorldFrame>,
    world_latest_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each arena-wide event once and broadcast the shared bytes.
    loop {
        match world_rx.recv().await {
            Ok(event) => {
                let (msg, tick, is_snapshot) = match &event {
                    ArenaBroadcast::World(update) => (
                        ServerMessage::WorldSnapshot(WorldSnapshotDto::from(update)),
                        update.tick,
                        true,
                    ),
                    ArenaBroadcast::ParticipantLeft {
                        participant_id,
                        tick,
                    } => (
                        ServerMessage::ParticipantLeft(ParticipantLeftDto {
                            id: participant_id.to_string(),
                        }),
                        *tick,
                        false,
                    ),
                };
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize arena event");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                if is_snapshot {
                    // Store the latest snapshot for lag recovery.
                    let _ = world_latest_tx.send(bytes.clone());
                }
                let _ = world_bytes_tx.send(WorldFrame {
                    tick,
                    is_snapshot,
                    bytes,
                });
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    missed = n,
                    "world serializer lagged; skipping to latest update"
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("world updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_world_serializer(arena: &ArenaHandle) {
    tokio::spawn(world_update_serializer(
        arena.world_tx.subscribe(),
        arena.world_bytes_tx.clone(),
        arena.world_latest_tx.clone(),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let arena = state.arena.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, arena))
}

async fn handle_socket(mut socket: WebSocket, arena: ArenaHandle) {
    // Separate connection id for correlating logs before/after a participant id exists.
    let conn_id = ids::conn_id();
    let span = info_span!("conn", conn_id, participant_id = tracing::field::Empty);

    async move {
        let mut ctx = match bootstrap_connection(&mut socket, &arena).await {
            Ok(ctx) => ctx,
            Err(NetError::ClosedBeforeJoin) => {
                info!("client disconnected before join handshake");
                return;
            }
            Err(e @ (NetError::JoinRequired | NetError::JoinTimeout)) => {
                // The close frame was already sent with a specific reason.
                info!(error = ?e, "join handshake rejected");
                return;
            }
            Err(e) => {
                error!(error = ?e, "failed to bootstrap connection");
                let _ = send_close_with_reason(&mut socket, close_code::ERROR, "bootstrap failed")
                    .await;
                return;
            }
        };

        tracing::Span::current().record("participant_id", ctx.participant_id);
        info!(participant_id = ctx.participant_id, "client connected");

        // Main Client Loop
        if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
            warn!(error = ?e, "client loop exited with error");
        }
    }
    .instrument(span)
    .await
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

struct ConnCtx {
    participant_id: ParticipantId,
    input_tx: mpsc::Sender<GameEvent>,
    world_bytes_rx: broadcast::Receiver<WorldFrame>,
    world_latest_rx: watch::Receiver<Utf8Bytes>,
    direct_rx: broadcast::Receiver<DirectMessage>,
    // World tick the init message described; older frames are dropped.
    init_tick: u64,
    // Mirrors challenge/resolution events so idle answers never reach the arena.
    in_duel: bool,
    // Count lag recovery snapshots sent to this client.
    lag_recovery_count: u64,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,

    invalid_json: u32,

    last_input_full_log: Instant,
    last_world_lag_log: Instant,
    last_invalid_input_log: Instant,

    close_frame: Option<CloseFrame>,
}

#[derive(Debug)]
struct JoinHandshake {
    bytes_in: u64,
    msgs_in: u64,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    arena: &ArenaHandle,
) -> Result<ConnCtx, NetError> {
    // Subscribe before joining so the init reply cannot be missed.
    let mut direct_rx = arena.direct_tx.subscribe();

    let join = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };

    let participant_id = ids::participant_id();

    // Subscribe before Join so no departure applied after our init is missed;
    // frames the init already covers are filtered by tick in the client loop.
    let world_bytes_rx = arena.world_bytes_tx.subscribe();
    let world_latest_rx = arena.world_latest_tx.subscribe();

    // Notify World Task
    // If anything after Join fails, compensate with Leave to avoid "spawned but never connected".
    arena
        .input_tx
        .send(GameEvent::Join { participant_id })
        .await
        .map_err(|_| NetError::InputClosed)?;

    let (init_tick, init) = match timeout(
        JOIN_HANDSHAKE_TIMEOUT,
        wait_for_init(&mut direct_rx, participant_id),
    )
    .await
    {
        Ok(Ok(init)) => init,
        Ok(Err(e)) => {
            compensate_join(&arena.input_tx, participant_id).await;
            return Err(e);
        }
        Err(_) => {
            compensate_join(&arena.input_tx, participant_id).await;
            return Err(NetError::JoinTimeout);
        }
    };

    let bytes_out = match send_message(socket, &init).await {
        Ok(bytes) => bytes as u64,
        Err(e) => {
            compensate_join(&arena.input_tx, participant_id).await;
            return Err(e);
        }
    };

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        participant_id,
        input_tx: arena.input_tx.clone(),
        world_bytes_rx,
        world_latest_rx,
        direct_rx,
        init_tick,
        in_duel: false,
        lag_recovery_count: 0,

        msgs_in: join.msgs_in,
        msgs_out: 1,
        bytes_in: join.bytes_in,
        bytes_out,

        invalid_json: 0,

        last_input_full_log: now,
        last_world_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

async fn compensate_join(input_tx: &mpsc::Sender<GameEvent>, participant_id: ParticipantId) {
    if input_tx
        .send(GameEvent::Leave { participant_id })
        .await
        .is_err()
    {
        warn!(participant_id, "input channel closed; leave not delivered");
    }
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<JoinHandshake, NetError> {
    let mut msgs_in = 0;
    let mut bytes_in = 0;

    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                msgs_in += 1;
                bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join) => return Ok(JoinHandshake { bytes_in, msgs_in }),
                    Ok(ClientMessage::MoveInput(_) | ClientMessage::DuelAnswer(_)) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        return Err(NetError::JoinRequired);
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        return Err(NetError::JoinRequired);
                    }
                }
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

async fn wait_for_init(
    direct_rx: &mut broadcast::Receiver<DirectMessage>,
    participant_id: ParticipantId,
) -> Result<(u64, ServerMessage), NetError> {
    loop {
        match direct_rx.recv().await {
            Ok(DirectMessage {
                to,
                event: DirectEvent::Init { world },
            }) if to == participant_id => {
                let init = ServerMessage::Init(InitDto::new(participant_id, &world));
                return Ok((world.tick, init));
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "direct events lagged while waiting for init");
            }
            Err(broadcast::error::RecvError::Closed) => return Err(NetError::DirectEventsClosed),
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

fn sanitize_move(x: f64, y: f64) -> Option<(f64, f64)> {
    // Out-of-bounds targets are fine; the arena is unbounded.
    (x.is_finite() && y.is_finite()).then_some((x, y))
}

fn sanitize_answer(text: String) -> Option<String> {
    (text.len() <= MAX_ANSWER_LEN).then_some(text)
}

fn enqueue_input(ctx: &mut ConnCtx, event: GameEvent) -> Result<LoopControl, NetError> {
    match ctx.input_tx.try_send(event) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(&mut ctx.last_input_full_log) {
                warn!(
                    participant_id = ctx.participant_id,
                    "input channel full; dropping input"
                );
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(incoming, ctx) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing Arena Broadcast
            world_msg = ctx.world_bytes_rx.recv() => {
                match world_msg {
                    Ok(frame) if frame.is_newer_than(ctx.init_tick) => matches!(
                        forward_world_bytes(frame.bytes, socket, ctx).await,
                        LoopControl::Disconnect
                    ),
                    Ok(_) => false,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        matches!(recover_from_lag(n, socket, ctx).await, LoopControl::Disconnect)
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldUpdatesClosed);
                        true
                    }
                }
            }

            // Outgoing Targeted Event
            direct_msg = ctx.direct_rx.recv() => {
                match direct_msg {
                    Ok(DirectMessage { to, event }) if to == ctx.participant_id => matches!(
                        forward_direct_event(event, socket, ctx).await,
                        LoopControl::Disconnect
                    ),
                    Ok(_) => false,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Targeted events cannot be replayed; the next snapshot still reflects
                        // the authoritative duel state.
                        if should_log(&mut ctx.last_world_lag_log) {
                            warn!(missed = n, "direct events lagged; some were dropped");
                        }
                        false
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::DirectEventsClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    let participant_id = ctx.participant_id;

    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join) => {
                        // Ignore repeated Join packets after bootstrap to keep the session stable.
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(participant_id, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::MoveInput(input)) => {
                        let Some((target_x, target_y)) = sanitize_move(input.x, input.y) else {
                            if should_log(&mut ctx.last_invalid_input_log) {
                                warn!(participant_id, "invalid move target (NaN/inf); dropping");
                            }
                            return Ok(LoopControl::Continue);
                        };

                        enqueue_input(
                            ctx,
                            GameEvent::Move {
                                participant_id,
                                target_x,
                                target_y,
                            },
                        )
                    }
                    Ok(ClientMessage::DuelAnswer(answer)) => {
                        if !ctx.in_duel {
                            debug!(participant_id, "answer outside a duel ignored");
                            return Ok(LoopControl::Continue);
                        }

                        let Some(text) = sanitize_answer(answer.text) else {
                            if should_log(&mut ctx.last_invalid_input_log) {
                                warn!(participant_id, "oversized duel answer; dropping");
                            }
                            return Ok(LoopControl::Continue);
                        };

                        enqueue_input(
                            ctx,
                            GameEvent::DuelAnswer {
                                participant_id,
                                text,
                            },
                        )
                    }
                    Err(parse_err) => {
                        ctx.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(
                                participant_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if ctx.invalid_json > MAX_INVALID_JSON {
                            ctx.close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(participant_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(participant_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_world_bytes(
    world_msg: Utf8Bytes,
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> LoopControl {
    let bytes_len = world_msg.len();
    match socket
        .send(Message::Text(world_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Log unexpected send failures; disconnect will follow immediately.
            warn!(error = ?err, "failed to send world update");
            LoopControl::Disconnect
        }
    }
}

async fn recover_from_lag(missed: u64, socket: &mut WebSocket, ctx: &mut ConnCtx) -> LoopControl {
    if should_log(&mut ctx.last_world_lag_log) {
        warn!(missed, "world updates lagged; sending snapshot");
    }

    // Resync strategy: send the latest world snapshot.
    let latest = ctx.world_latest_rx.borrow().clone();
    if latest.is_empty() {
        if should_log(&mut ctx.last_world_lag_log) {
            warn!("world snapshot unavailable during lag recovery");
        }
        return LoopControl::Continue;
    }

    let bytes_len = latest.len();
    ctx.lag_recovery_count += 1;
    let outcome = forward_world_bytes(latest, socket, ctx).await;

    debug!(
        participant_id = ctx.participant_id,
        bytes = bytes_len,
        count = ctx.lag_recovery_count,
        "sent lag recovery snapshot"
    );

    outcome
}

fn direct_event_message(
    participant_id: ParticipantId,
    event: DirectEvent,
    in_duel: &mut bool,
) -> Option<ServerMessage> {
    match event {
        // Init is consumed during bootstrap.
        DirectEvent::Init { .. } => None,
        DirectEvent::DuelChallenge { opponent_id, word } => {
            *in_duel = true;
            Some(ServerMessage::DuelChallenge(DuelChallengeDto {
                opponent_id: opponent_id.to_string(),
                word,
            }))
        }
        DirectEvent::DuelResolved { result, mass } => {
            *in_duel = false;
            debug!(participant_id, ?result, mass, "duel outcome forwarded");
            Some(ServerMessage::DuelResolved(DuelResolvedDto {
                result: result.into(),
                mass,
            }))
        }
    }
}

async fn forward_direct_event(
    event: DirectEvent,
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> LoopControl {
    let Some(msg) = direct_event_message(ctx.participant_id, event, &mut ctx.in_duel) else {
        return LoopControl::Continue;
    };

    match send_message(socket, &msg).await {
        Ok(bytes) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes as u64;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send direct event");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    let participant_id = ctx.participant_id;

    ctx.input_tx
        .send(GameEvent::Leave { participant_id })
        .await
        .map_err(|_| NetError::InputClosed)?;

    debug!(
        participant_id,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        lag_recovery_count = ctx.lag_recovery_count,
        "connection stats"
    );
    info!(participant_id, "client disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::{DuelResult, WorldUpdate};

    #[test]
    fn when_move_target_is_not_finite_then_it_is_dropped() {
        assert_eq!(sanitize_move(f64::NAN, 1.0), None);
        assert_eq!(sanitize_move(1.0, f64::INFINITY), None);
        assert_eq!(sanitize_move(-50.0, 4000.0), Some((-50.0, 4000.0)));
    }

    #[test]
    fn when_answer_exceeds_limit_then_it_is_dropped() {
        assert!(sanitize_answer("A".repeat(MAX_ANSWER_LEN + 1)).is_none());
        assert_eq!(sanitize_answer("neon".to_string()).as_deref(), Some("neon"));
    }

    #[test]
    fn when_challenge_and_resolution_arrive_then_duel_flag_follows() {
        let mut in_duel = false;

        let challenge = direct_event_message(
            1,
            DirectEvent::DuelChallenge {
                opponent_id: 2,
                word: "NODE",
            },
            &mut in_duel,
        );
        assert!(matches!(challenge, Some(ServerMessage::DuelChallenge(_))));
        assert!(in_duel);

        let resolved = direct_event_message(
            1,
            DirectEvent::DuelResolved {
                result: DuelResult::Win,
                mass: 26.0,
            },
            &mut in_duel,
        );
        assert!(matches!(resolved, Some(ServerMessage::DuelResolved(_))));
        assert!(!in_duel);
    }

    #[test]
    fn when_init_arrives_after_bootstrap_then_it_is_not_forwarded() {
        let mut in_duel = false;
        let event = DirectEvent::Init {
            world: WorldUpdate {
                tick: 0,
                participants: Vec::new(),
                orbs: Vec::new(),
            },
        };

        assert!(direct_event_message(1, event, &mut in_duel).is_none());
    }

    #[tokio::test]
    async fn when_world_events_are_serialized_then_only_snapshots_update_latest() {
        let (world_tx, world_rx) = broadcast::channel(8);
        let (world_bytes_tx, mut world_bytes_rx) = broadcast::channel(8);
        let (world_latest_tx, world_latest_rx) = watch::channel(Utf8Bytes::from(""));
        let task = tokio::spawn(world_update_serializer(
            world_rx,
            world_bytes_tx,
            world_latest_tx,
        ));

        world_tx
            .send(ArenaBroadcast::World(WorldUpdate {
                tick: 4,
                participants: Vec::new(),
                orbs: Vec::new(),
            }))
            .expect("serializer subscribed");
        world_tx
            .send(ArenaBroadcast::ParticipantLeft {
                participant_id: 5,
                tick: 4,
            })
            .expect("serializer subscribed");

        let first = world_bytes_rx.recv().await.expect("snapshot frame");
        let second = world_bytes_rx.recv().await.expect("left frame");
        assert!(first.bytes.as_str().contains(r#""type":"world-snapshot""#));
        assert!(second.bytes.as_str().contains(r#""type":"participant-left""#));
        assert_eq!((first.tick, first.is_snapshot), (4, true));
        assert_eq!((second.tick, second.is_snapshot), (4, false));
        assert_eq!(world_latest_rx.borrow().as_str(), first.bytes.as_str());

        drop(world_tx);
        task.await.expect("serializer should exit cleanly");
    }
}
