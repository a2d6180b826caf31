//! Broker transport layer for the rpimon collectors.
//!
//! This crate owns everything between a collector and the MQTT broker:
//!
//! - **[`BrokerSession`]** — one live broker session: a rumqttc client plus
//!   a spawned driver task that polls the event loop and turns broker
//!   acknowledgements into [`SessionState`] transitions and
//!   [`SessionEvents`] callbacks. State is never set optimistically by a
//!   caller — only the driver task moves it, and only on broker acks.
//!
//! - **[`ConnectionManager`]** — the retry/lifecycle engine. Dials a fresh
//!   session, polls its connected flag in short slices up to a fixed
//!   timeout, and on failure tears the session down and sleeps the
//!   configured retry delay before the next attempt. Exhausting a bounded
//!   [`RetryPolicy`] is terminal for that policy instance.
//!
//! - **[`Dialer`]** — the seam between the manager and the transport.
//!   Production code uses [`MqttDialer`]; tests drive the manager with
//!   stub dialers under a paused tokio clock, so the retry state machine
//!   is exercised without real sleeps or a real broker.
//!
//! Reconnection is deliberately *not* automatic at this layer: a dropped
//! session only flips state to `Disconnected`, and the collector run loop
//! re-invokes [`ConnectionManager::connect`] when it notices before the
//! next tick.

pub mod error;
pub mod manager;
pub mod retry;
pub mod session;

pub use error::Error;
pub use manager::{ConnectionManager, Dialer, ManagedSession};
pub use retry::RetryPolicy;
pub use session::{
    BrokerSession, DisconnectCounter, MqttDialer, NoopEvents, SessionConfig, SessionEvents,
    SessionState,
};

/// QoS re-export so consumers don't need a direct rumqttc dependency.
pub use rumqttc::QoS;
