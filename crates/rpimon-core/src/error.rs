// ── Core error types ──
//
// The collector-facing taxonomy. Connection errors bubble out of
// ensure_connected and end the run loop (retry exhaustion is handled by
// the transport policy); everything else is a per-tick failure that the
// loop counts and cools down from. Parse misses and absent sources are
// not errors at all — they degrade to skipped samples.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection ──────────────────────────────────────────────────
    /// Transport-level failure; ends the run loop when surfaced from a
    /// reconnect attempt.
    #[error("broker connection error: {0}")]
    Connection(#[from] rpimon_mqtt::Error),

    // ── Collection ──────────────────────────────────────────────────
    /// An external command could not be run or returned a failure code.
    #[error("command `{command}` failed: {reason}")]
    Command { command: String, reason: String },

    /// A record payload was not a JSON object.
    #[error("record payload for '{topic}' must be a JSON object")]
    InvalidRecord { topic: String },

    // ── Ambient ─────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CoreError {
    /// True when the run loop should stop rather than cool down and
    /// retry the next tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(e) if !e.is_transient())
    }
}
