// ── Connection manager ──
//
// The retry/lifecycle engine shared by every collector. Modeled as a
// small state machine over the tokio clock rather than a blocking
// while/sleep loop, so tests drive it with a stub dialer under a paused
// clock. Single-session collectors wait up to 10 s for the broker ack;
// the stats aggregator configures 30 s for its session pair.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info};

use crate::error::Error;
use crate::retry::RetryPolicy;

/// Readiness poll slice while waiting for the broker acknowledgement.
pub const CONNECT_POLL_SLICE: Duration = Duration::from_millis(500);

/// Connect timeout for collectors holding a single session.
pub const SINGLE_SESSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Connect timeout where a collector opens two independent sessions.
pub const MULTI_SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimal view of a dialed session the manager needs while waiting for
/// the broker acknowledgement.
pub trait ManagedSession {
    /// Has the broker acknowledged the connection?
    fn connected(&self) -> bool;

    /// Has the session's driver terminated (handshake cannot complete)?
    fn closed(&self) -> bool;

    /// Defensive teardown; errors are swallowed.
    fn shutdown(&self);
}

/// Creates sessions on demand. The seam that lets tests run the manager
/// against stubs instead of a broker.
pub trait Dialer {
    type Session: ManagedSession;

    /// Start a fresh connection attempt.
    fn dial(&mut self) -> Result<Self::Session, Error>;
}

/// Owns one session slot and the retry policy for it.
///
/// [`connect`](Self::connect) blocks its caller (the collector run loop)
/// until a session is established, retry is exhausted, or retry is
/// disabled — it must not run on the scheduler's tick path of another
/// collector tier.
pub struct ConnectionManager<D: Dialer> {
    dialer: D,
    policy: RetryPolicy,
    connect_timeout: Duration,
    connection_failures: u64,
}

impl<D: Dialer> ConnectionManager<D> {
    pub fn new(dialer: D, policy: RetryPolicy) -> Self {
        Self {
            dialer,
            policy,
            connect_timeout: SINGLE_SESSION_TIMEOUT,
            connection_failures: 0,
        }
    }

    /// Override the handshake timeout (see [`MULTI_SESSION_TIMEOUT`]).
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Failed attempts since the last successful connection.
    pub fn connection_failures(&self) -> u64 {
        self.connection_failures
    }

    /// Total connection attempts over the life of the policy.
    pub fn attempts(&self) -> u32 {
        self.policy.attempts()
    }

    /// Establish a session, retrying per policy.
    ///
    /// On success the failure counter resets (the attempt counter does
    /// not — it is monotonic per policy instance). On a bounded policy
    /// running out, or with retry disabled, the error is returned and the
    /// caller is expected to stop collecting and shut down cleanly.
    pub async fn connect(&mut self) -> Result<D::Session, Error> {
        loop {
            let attempt = self.policy.begin_attempt()?;
            info!(attempt, "connecting to broker");

            match self.try_once().await {
                Ok(session) => {
                    info!("broker connection established");
                    self.connection_failures = 0;
                    return Ok(session);
                }
                Err(e) => {
                    self.connection_failures += 1;
                    error!(error = %e, "broker connection failed");

                    if !self.policy.enabled() {
                        return Err(e);
                    }

                    info!(
                        delay_secs = self.policy.delay().as_secs(),
                        "retrying after delay"
                    );
                    sleep(self.policy.delay()).await;
                }
            }
        }
    }

    /// One dial: poll the connected flag in short slices until the
    /// timeout, tearing down the half-open session on failure.
    async fn try_once(&mut self) -> Result<D::Session, Error> {
        let session = self.dialer.dial()?;

        let mut waited = Duration::ZERO;
        while waited < self.connect_timeout {
            if session.connected() {
                return Ok(session);
            }
            if session.closed() {
                session.shutdown();
                return Err(Error::ConnectFailed {
                    reason: "session closed during handshake".into(),
                });
            }
            sleep(CONNECT_POLL_SLICE).await;
            waited += CONNECT_POLL_SLICE;
        }

        session.shutdown();
        Err(Error::ConnectTimeout {
            timeout_secs: self.connect_timeout.as_secs(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Session stub whose connected flag is fixed at dial time.
    struct StubSession {
        connected: bool,
    }

    impl ManagedSession for StubSession {
        fn connected(&self) -> bool {
            self.connected
        }
        fn closed(&self) -> bool {
            !self.connected
        }
        fn shutdown(&self) {}
    }

    /// Dialer that succeeds on the Nth attempt.
    struct SucceedsOnNth {
        dials: Arc<AtomicU32>,
        succeed_on: u32,
    }

    impl Dialer for SucceedsOnNth {
        type Session = StubSession;

        fn dial(&mut self) -> Result<StubSession, Error> {
            let n = self.dials.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(StubSession {
                connected: n >= self.succeed_on,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_policy_makes_exactly_max_attempts() {
        let dials = Arc::new(AtomicU32::new(0));
        let dialer = SucceedsOnNth {
            dials: Arc::clone(&dials),
            succeed_on: u32::MAX,
        };
        let policy = RetryPolicy::new(true, Duration::from_secs(1), 3);
        let mut manager = ConnectionManager::new(dialer, policy);

        let result = manager.connect().await;
        assert!(matches!(result, Err(Error::RetriesExhausted { attempts: 3 })));
        assert_eq!(dials.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_policy_reaches_a_late_success() {
        let dials = Arc::new(AtomicU32::new(0));
        let dialer = SucceedsOnNth {
            dials: Arc::clone(&dials),
            succeed_on: 50,
        };
        let policy = RetryPolicy::unbounded(Duration::from_secs(10));
        let mut manager = ConnectionManager::new(dialer, policy);

        let session = manager.connect().await.unwrap();
        assert!(session.connected());
        assert_eq!(dials.load(Ordering::SeqCst), 50);
        assert_eq!(manager.connection_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_retry_fails_on_first_error() {
        let dials = Arc::new(AtomicU32::new(0));
        let dialer = SucceedsOnNth {
            dials: Arc::clone(&dials),
            succeed_on: 2,
        };
        let policy = RetryPolicy::new(false, Duration::from_secs(1), 0);
        let mut manager = ConnectionManager::new(dialer, policy);

        assert!(manager.connect().await.is_err());
        assert_eq!(dials.load(Ordering::SeqCst), 1);
        assert_eq!(manager.connection_failures(), 1);
    }

    /// A session that never connects but stays alive: the manager must
    /// give up only after the configured timeout.
    struct HungSession;

    impl ManagedSession for HungSession {
        fn connected(&self) -> bool {
            false
        }
        fn closed(&self) -> bool {
            false
        }
        fn shutdown(&self) {}
    }

    struct HungDialer;

    impl Dialer for HungDialer {
        type Session = HungSession;

        fn dial(&mut self) -> Result<HungSession, Error> {
            Ok(HungSession)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn handshake_timeout_is_reported() {
        let policy = RetryPolicy::new(false, Duration::from_secs(1), 0);
        let mut manager =
            ConnectionManager::new(HungDialer, policy).with_connect_timeout(Duration::from_secs(10));

        let result = manager.connect().await;
        assert!(matches!(
            result,
            Err(Error::ConnectTimeout { timeout_secs: 10 })
        ));
    }
}
