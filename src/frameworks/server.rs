// Framework bootstrap for the arena server runtime.

use crate::domain::tuning::{ArenaTuning, DuelTuning};
use crate::frameworks::config;
use crate::interface_adapters::net::{spawn_world_serializer, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{ArenaHandle, ArenaSettings};

use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state();
    // Start the Web Server
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Arc<AppState> {
    let duel_timeout = config::duel_timeout();
    let tuning = ArenaTuning {
        duel: DuelTuning {
            timeout_ticks: config::duration_to_ticks(duel_timeout),
            ..DuelTuning::default()
        },
        ..ArenaTuning::default()
    };
    tracing::debug!(
        duel_timeout_secs = duel_timeout.as_secs(),
        timeout_ticks = tuning.duel.timeout_ticks,
        "duel expiry configured"
    );

    // Single arena; its world task lives for the whole process.
    let arena = ArenaHandle::spawn(ArenaSettings {
        input_channel_capacity: config::INPUT_CHANNEL_CAPACITY,
        world_broadcast_capacity: config::WORLD_BROADCAST_CAPACITY,
        direct_event_capacity: config::DIRECT_EVENT_CAPACITY,
        tick_interval: config::TICK_INTERVAL,
        tuning,
        seed: config::arena_seed(),
    });
    spawn_world_serializer(&arena);

    Arc::new(AppState { arena })
}
