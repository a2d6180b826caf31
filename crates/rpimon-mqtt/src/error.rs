use thiserror::Error;

/// Top-level error type for the `rpimon-mqtt` crate.
///
/// Covers the transport failure modes a collector can see: session
/// establishment, retry exhaustion, and publish failures. `rpimon-core`
/// maps these into its own error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// The session died before the broker acknowledged the connection.
    #[error("connection to broker failed: {reason}")]
    ConnectFailed { reason: String },

    /// The broker did not acknowledge the connection within the window.
    #[error("broker connection timed out after {timeout_secs}s")]
    ConnectTimeout { timeout_secs: u64 },

    /// The bounded retry policy ran out of attempts. Terminal for the
    /// policy instance — the caller gives up collecting and shuts down.
    #[error("retry limit reached after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// An operation required a connected session.
    #[error("not connected to the broker")]
    NotConnected,

    // ── Publish ─────────────────────────────────────────────────────
    /// A single publish failed. Counted by the caller, never retried —
    /// the next scheduled tick publishes a fresh sample.
    #[error("publish to '{topic}' failed: {source}")]
    Publish {
        topic: String,
        #[source]
        source: rumqttc::ClientError,
    },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectFailed { .. }
            | Self::ConnectTimeout { .. }
            | Self::NotConnected
            | Self::Publish { .. } => true,
            Self::RetriesExhausted { .. } => false,
        }
    }
}
