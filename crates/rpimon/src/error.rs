//! CLI error types with miette diagnostics.
//!
//! Maps configuration and collector errors into user-facing diagnostics
//! with exit codes. Retry exhaustion and the consecutive-error ceiling
//! are not errors at this level — the run loop logs final statistics and
//! returns cleanly.

use miette::Diagnostic;
use thiserror::Error;

use rpimon_core::CoreError;

/// Exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Configuration error")]
    #[diagnostic(
        code(rpimon::config),
        help(
            "Check the configuration file (default: ~/.config/rpimon/config.toml)\n\
             and the RPIMON_* / MQTT_* environment variables."
        )
    )]
    Config(#[from] rpimon_config::ConfigError),

    #[error("Could not reach the MQTT broker")]
    #[diagnostic(
        code(rpimon::connection),
        help(
            "Check that the broker is running and reachable.\n\
             Broker host and credentials come from the [broker] config section."
        )
    )]
    Connection(#[source] rpimon_mqtt::Error),

    #[error(transparent)]
    #[diagnostic(code(rpimon::collector))]
    Collector(CoreError),
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Connection(e) => Self::Connection(e),
            other => Self::Collector(other),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => exit_code::USAGE,
            Self::Connection(_) => exit_code::CONNECTION,
            Self::Collector(_) => exit_code::GENERAL,
        }
    }
}
