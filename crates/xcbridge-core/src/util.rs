//! Build session identifiers.

use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static SESSION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Generate a build session ID like `build_0123456789abcdef`.
///
/// Only used to correlate log lines of one `build()` call. The per-process
/// sequence keeps IDs distinct even when the clock does not advance.
pub fn generate_session_id() -> String {
    let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seed = format!("{}:{}:{}", std::process::id(), nanos, seq);
    let digest = Sha256::digest(seed.as_bytes());
    format!("build_{}", hex::encode(&digest[..8]))
}
