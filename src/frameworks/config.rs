use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("ARENA_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

/// How long an unanswered duel may last; zero disables expiry.
pub fn duel_timeout() -> Duration {
    let secs = env::var("DUEL_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(30);
    Duration::from_secs(secs)
}

pub fn arena_seed() -> Option<u64> {
    env::var("ARENA_SEED")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
}

/// Converts a wall-clock duration into whole ticks at the nominal tick rate.
pub fn duration_to_ticks(duration: Duration) -> u64 {
    (duration.as_millis() * u128::from(TICK_RATE_HZ) / 1000) as u64
}

pub const INPUT_CHANNEL_CAPACITY: usize = 1024;
pub const WORLD_BROADCAST_CAPACITY: usize = 128;
pub const DIRECT_EVENT_CAPACITY: usize = 256;

pub const TICK_RATE_HZ: u64 = 60;
// Whole milliseconds would truncate to 16 ms (62.5 Hz).
pub const TICK_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / TICK_RATE_HZ);
