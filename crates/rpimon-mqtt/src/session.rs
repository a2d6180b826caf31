// ── Broker session ──
//
// One MQTT session: a rumqttc client plus a driver task polling the event
// loop. State transitions happen only here, on broker acknowledgements —
// ConnAck moves to Connected, a poll error moves to Disconnected and ends
// the driver. Reconnection is the run loop's job, through a fresh session.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Error;
use crate::manager::{Dialer, ManagedSession};

const EVENT_CHANNEL_CAPACITY: usize = 64;

// ── SessionConfig ───────────────────────────────────────────────────

/// How to reach the broker. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Broker host (e.g. `127.0.0.1`).
    pub host: String,
    /// Broker port (default 1883).
    pub port: u16,
    /// Client identifier presented to the broker.
    pub client_id: String,
    /// Username, if the broker requires authentication.
    pub username: Option<String>,
    /// Password, passed through from configuration.
    pub password: Option<SecretString>,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u64,
}

impl SessionConfig {
    /// Same broker, different client identity. The stats aggregator uses
    /// this to derive its publisher and listener sessions from one base.
    pub fn with_client_id(&self, client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..self.clone()
        }
    }
}

// ── SessionState ────────────────────────────────────────────────────

/// Connection state observable by consumers.
///
/// Driven only by broker acknowledgement events in the driver task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

// ── SessionEvents ───────────────────────────────────────────────────

/// Callback interface for session lifecycle and inbound traffic.
///
/// Implemented by a concrete adapter type per collector (the stats
/// aggregator's listener is the main consumer). Callbacks run on the
/// driver task; implementations keep them short and guard shared state
/// with a mutex.
pub trait SessionEvents: Send + Sync {
    fn on_connect(&self) {}
    fn on_disconnect(&self) {}
    fn on_message(&self, _topic: &str, _payload: &[u8]) {}
}

/// Observer for sessions that only publish.
#[derive(Debug, Default)]
pub struct NoopEvents;

impl SessionEvents for NoopEvents {}

/// Observer counting broker-initiated disconnects.
///
/// The disconnect callback only flips state and bumps this counter — it
/// never reconnects. Collectors fold the count into their periodic
/// statistics line.
#[derive(Debug, Default)]
pub struct DisconnectCounter(AtomicU64);

impl DisconnectCounter {
    pub fn count(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl SessionEvents for DisconnectCounter {
    fn on_disconnect(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

// ── BrokerSession ───────────────────────────────────────────────────

/// A live broker session handle.
///
/// Owns the client, the driver task, and the state channel. Dropping the
/// session cancels the driver; [`shutdown`](Self::shutdown) does the same
/// defensively (teardown errors are swallowed).
pub struct BrokerSession {
    client: AsyncClient,
    state: watch::Receiver<SessionState>,
    driver: JoinHandle<()>,
    cancel: CancellationToken,
}

impl BrokerSession {
    /// Open a session: build the client, spawn the driver task, and
    /// return immediately. The broker's ConnAck arrives asynchronously —
    /// callers poll [`connected`](Self::connected) (the
    /// [`ConnectionManager`](crate::ConnectionManager) does this in 0.5 s
    /// slices).
    ///
    /// `subscriptions` are (re)issued on every ConnAck, so they survive a
    /// broker-side session reset.
    pub fn open(
        config: &SessionConfig,
        subscriptions: Vec<(String, QoS)>,
        observer: Arc<dyn SessionEvents>,
    ) -> Self {
        let mut options = MqttOptions::new(
            config.client_id.clone(),
            config.host.clone(),
            config.port,
        );
        options.set_keep_alive(Duration::from_secs(config.keep_alive_secs));
        if let Some(username) = &config.username {
            let password = config
                .password
                .as_ref()
                .map(|p| p.expose_secret().to_owned())
                .unwrap_or_default();
            options.set_credentials(username.clone(), password);
        }

        let (client, event_loop) = AsyncClient::new(options, EVENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(SessionState::Connecting);
        let cancel = CancellationToken::new();

        let driver = tokio::spawn(drive(
            event_loop,
            client.clone(),
            subscriptions,
            state_tx,
            observer,
            cancel.clone(),
        ));

        Self {
            client,
            state: state_rx,
            driver,
            cancel,
        }
    }

    /// Current state as a plain flag.
    pub fn connected(&self) -> bool {
        *self.state.borrow() == SessionState::Connected
    }

    /// Subscribe to state transitions.
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Publish a payload at the given QoS.
    pub async fn publish(&self, topic: &str, payload: Vec<u8>, qos: QoS) -> Result<(), Error> {
        if !self.connected() {
            return Err(Error::NotConnected);
        }
        self.client
            .publish(topic, qos, false, payload)
            .await
            .map_err(|source| Error::Publish {
                topic: topic.to_owned(),
                source,
            })
    }
}

impl ManagedSession for BrokerSession {
    fn connected(&self) -> bool {
        BrokerSession::connected(self)
    }

    fn closed(&self) -> bool {
        self.driver.is_finished()
    }

    fn shutdown(&self) {
        self.cancel.cancel();
        // Best-effort: the channel may already be gone.
        let _ = self.client.try_disconnect();
    }
}

impl Drop for BrokerSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Driver task: polls the event loop until cancellation or a connection
/// error. The loop is not restarted on error — a dead session is replaced
/// wholesale by the connection manager.
async fn drive(
    mut event_loop: EventLoop,
    client: AsyncClient,
    subscriptions: Vec<(String, QoS)>,
    state: watch::Sender<SessionState>,
    observer: Arc<dyn SessionEvents>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                let _ = state.send(SessionState::Disconnected);
                break;
            }
            event = event_loop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        debug!("broker acknowledged connection");
                        let _ = state.send(SessionState::Connected);
                        for (topic, qos) in &subscriptions {
                            if let Err(e) = client.try_subscribe(topic.clone(), *qos) {
                                warn!(topic, error = %e, "subscribe failed");
                            }
                        }
                        observer.on_connect();
                    } else {
                        warn!(code = ?ack.code, "broker refused connection");
                        let _ = state.send(SessionState::Disconnected);
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    observer.on_message(&publish.topic, &publish.payload);
                }
                Ok(_) => {}
                Err(e) => {
                    let was_connected = *state.borrow() == SessionState::Connected;
                    let _ = state.send(SessionState::Disconnected);
                    if was_connected {
                        warn!(error = %e, "broker connection lost");
                    } else {
                        debug!(error = %e, "connection attempt failed");
                    }
                    observer.on_disconnect();
                    break;
                }
            }
        }
    }
}

// ── MqttDialer ──────────────────────────────────────────────────────

/// Production [`Dialer`]: each dial opens a fresh [`BrokerSession`] with
/// the same configuration, subscriptions, and observer.
pub struct MqttDialer {
    config: SessionConfig,
    subscriptions: Vec<(String, QoS)>,
    observer: Arc<dyn SessionEvents>,
}

impl MqttDialer {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            subscriptions: Vec::new(),
            observer: Arc::new(NoopEvents),
        }
    }

    /// Topics to subscribe on every successful connection.
    pub fn with_subscriptions(mut self, subscriptions: Vec<(String, QoS)>) -> Self {
        self.subscriptions = subscriptions;
        self
    }

    /// Lifecycle/message observer wired into each dialed session.
    pub fn with_observer(mut self, observer: Arc<dyn SessionEvents>) -> Self {
        self.observer = observer;
        self
    }
}

impl Dialer for MqttDialer {
    type Session = BrokerSession;

    fn dial(&mut self) -> Result<BrokerSession, Error> {
        Ok(BrokerSession::open(
            &self.config,
            self.subscriptions.clone(),
            Arc::clone(&self.observer),
        ))
    }
}
