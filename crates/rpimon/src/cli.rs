// ── CLI definition ──

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Raspberry Pi MQTT telemetry collectors.
#[derive(Debug, Parser)]
#[command(name = "rpimon", version, about, propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Path to the configuration file (defaults to the XDG location).
    #[arg(short, long, global = true, env = "CONFIG_FILE", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect CPU, memory, thermal, frequency, and uptime metrics.
    System,

    /// Aggregate broker $SYS statistics and the active topic list.
    Broker,

    /// Enumerate WiFi clients and publish access-point status.
    Wifi(WifiArgs),
}

#[derive(Debug, Args)]
pub struct WifiArgs {
    /// Publish extended per-client records (ip, signal, byte counters)
    /// instead of the simplified name/mac/uptime list.
    #[arg(long)]
    pub extended: bool,
}
