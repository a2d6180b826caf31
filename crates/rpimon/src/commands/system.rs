use std::time::Duration;

use tokio_util::sync::CancellationToken;

use rpimon_core::collectors::{RunLoopOptions, SystemMetricsCollector, run_collector};

use crate::cli::GlobalOpts;
use crate::error::CliError;

const CLIENT_ID: &str = "servermonitoring-collector";

pub async fn handle(global: &GlobalOpts, cancel: CancellationToken) -> Result<(), CliError> {
    let config = rpimon_config::load(global.config.as_deref())?;

    let collector = SystemMetricsCollector::new(
        config.topics.prefix.clone(),
        config.tier_intervals(),
        config.session_config(CLIENT_ID),
        config.retry_policy(),
    );

    // System metrics start immediately; STARTUP_DELAY paces only the
    // broker and wifi collectors.
    let options = RunLoopOptions::quantum_paced(Duration::ZERO);
    run_collector(collector, options, cancel).await?;
    Ok(())
}
