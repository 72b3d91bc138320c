use std::{
    sync::{
        LazyLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

const SEQUENCE_BITS: u32 = 24;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

// Seconds since the epoch at first use, shifted clear of the sequence bits.
static BOOT_PREFIX: LazyLock<u64> = LazyLock::new(|| {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    secs << SEQUENCE_BITS
});

/// Connection id for log correlation: `boot_secs << 24 | sequence`.
///
/// The high bits tell restarts apart in aggregated logs; the low 24 bits count
/// connections within this process and wrap after ~16M.
pub fn conn_id() -> u64 {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) & SEQUENCE_MASK;
    *BOOT_PREFIX | seq
}

/// Next participant id. Small, sequential, never reused within a process.
pub fn participant_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}
