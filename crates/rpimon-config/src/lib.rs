//! Shared configuration for the rpimon collectors.
//!
//! One TOML file plus environment overrides, translated into the
//! transport and scheduler types the collectors consume. The legacy
//! environment contract of the deployed fleet is honoured on top of the
//! `RPIMON_*` namespace: `MQTT_RETRY_ENABLED`, `MQTT_RETRY_DELAY`,
//! `MQTT_MAX_RETRIES`, and `STARTUP_DELAY` keep their meaning.
//!
//! Configuration failures are fatal by design: the process exits before
//! any run loop starts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rpimon_core::TierIntervals;
use rpimon_mqtt::{RetryPolicy, SessionConfig};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration shared by all three collectors.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub broker: BrokerSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub collector: CollectorSettings,

    #[serde(default)]
    pub topics: TopicSettings,

    #[serde(default)]
    pub wifi: WifiSettings,
}

/// Broker endpoint and credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: Option<String>,

    /// Plaintext in the file; wrapped in a `SecretString` the moment it
    /// leaves this crate.
    pub password: Option<String>,

    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: None,
            password: None,
            keep_alive_secs: default_keep_alive(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    1883
}
fn default_keep_alive() -> u64 {
    60
}

/// Reconnection policy. `max_retries == 0` retries forever.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_retry_delay")]
    pub delay_secs: u64,

    #[serde(default)]
    pub max_retries: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_secs: default_retry_delay(),
            max_retries: 0,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_retry_delay() -> u64 {
    10
}

/// Collection pacing.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CollectorSettings {
    /// Delay before the first connection attempt, letting the broker
    /// come up after boot.
    #[serde(default = "default_startup_delay")]
    pub startup_delay_secs: u64,

    #[serde(default)]
    pub intervals: Intervals,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            startup_delay_secs: default_startup_delay(),
            intervals: Intervals::default(),
        }
    }
}

fn default_startup_delay() -> u64 {
    10
}

/// Update intervals in seconds: the three system-metric tiers plus the
/// default cadence of the single-rate collectors.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Intervals {
    #[serde(default = "default_fast")]
    pub fast: u64,

    #[serde(default = "default_normal")]
    pub normal: u64,

    #[serde(default = "default_slow")]
    pub slow: u64,

    #[serde(default = "default_default_interval")]
    pub default: u64,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            fast: default_fast(),
            normal: default_normal(),
            slow: default_slow(),
            default: default_default_interval(),
        }
    }
}

fn default_fast() -> u64 {
    1
}
fn default_normal() -> u64 {
    5
}
fn default_slow() -> u64 {
    30
}
fn default_default_interval() -> u64 {
    3
}

/// Topic naming. The prefix heads every published topic and must match
/// what the dashboard subscribes to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopicSettings {
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for TopicSettings {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

fn default_prefix() -> String {
    "rpi".into()
}

/// Wireless enumeration sources.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WifiSettings {
    #[serde(default = "default_interface")]
    pub interface: String,

    #[serde(default = "default_leases_file")]
    pub leases_file: PathBuf,
}

impl Default for WifiSettings {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            leases_file: default_leases_file(),
        }
    }
}

fn default_interface() -> String {
    "wlan0".into()
}
fn default_leases_file() -> PathBuf {
    PathBuf::from("/var/lib/misc/dnsmasq.leases")
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "rpimon").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("rpimon");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load configuration: defaults ← TOML file ← `RPIMON_*` environment ←
/// legacy environment variables.
///
/// `path` overrides the XDG location; a missing file is fine (defaults
/// apply), a malformed one is fatal.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = path.map_or_else(config_path, Path::to_path_buf);

    let mut config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed("RPIMON_").split("__"))
        .extract()?;

    config.apply_legacy_env();
    config.validate()?;
    Ok(config)
}

impl Config {
    /// The environment contract of the deployed fleet, applied on top of
    /// file and `RPIMON_*` values.
    fn apply_legacy_env(&mut self) {
        if let Ok(value) = std::env::var("MQTT_RETRY_ENABLED") {
            self.retry.enabled = value.to_lowercase() == "true";
        }
        if let Ok(value) = std::env::var("MQTT_RETRY_DELAY") {
            if let Ok(secs) = value.parse() {
                self.retry.delay_secs = secs;
            }
        }
        if let Ok(value) = std::env::var("MQTT_MAX_RETRIES") {
            if let Ok(count) = value.parse() {
                self.retry.max_retries = count;
            }
        }
        if let Ok(value) = std::env::var("STARTUP_DELAY") {
            if let Ok(secs) = value.parse() {
                self.collector.startup_delay_secs = secs;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.topics.prefix.is_empty() {
            return Err(ConfigError::Validation {
                field: "topics.prefix".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.wifi.interface.is_empty() {
            return Err(ConfigError::Validation {
                field: "wifi.interface".into(),
                reason: "must not be empty".into(),
            });
        }
        let intervals = &self.collector.intervals;
        for (field, value) in [
            ("collector.intervals.fast", intervals.fast),
            ("collector.intervals.normal", intervals.normal),
            ("collector.intervals.slow", intervals.slow),
            ("collector.intervals.default", intervals.default),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation {
                    field: field.into(),
                    reason: "must be at least 1 second".into(),
                });
            }
        }
        Ok(())
    }

    // ── Translators ─────────────────────────────────────────────────

    /// Broker session settings for the given client identity.
    pub fn session_config(&self, client_id: &str) -> SessionConfig {
        SessionConfig {
            host: self.broker.host.clone(),
            port: self.broker.port,
            client_id: client_id.to_owned(),
            username: self.broker.username.clone(),
            password: self
                .broker
                .password
                .clone()
                .map(SecretString::from),
            keep_alive_secs: self.broker.keep_alive_secs,
        }
    }

    /// A fresh retry policy instance (attempt counters start at zero).
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.enabled,
            Duration::from_secs(self.retry.delay_secs),
            self.retry.max_retries,
        )
    }

    pub fn tier_intervals(&self) -> TierIntervals {
        TierIntervals {
            fast: Duration::from_secs(self.collector.intervals.fast),
            normal: Duration::from_secs(self.collector.intervals.normal),
            slow: Duration::from_secs(self.collector.intervals.slow),
        }
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.collector.intervals.default)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.collector.startup_delay_secs)
    }
}
