//! ID generation utilities for Refinr
//!
//! Run identifiers tag every log line of a run so that concurrent runs can be
//! told apart.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a unique run ID
///
/// Format: `run-{timestamp_ms}-{random_hex}`
/// Example: `run-1738300800123-a1b2c3d4`
pub fn generate_run_id() -> String {
    let timestamp = now_ms();
    let random: u32 = rand::rng().random();
    format!("run-{}-{:08x}", timestamp, random)
}
