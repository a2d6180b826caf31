use tokio_util::sync::CancellationToken;

use rpimon_core::collectors::{BrokerStatsCollector, RunLoopOptions, run_collector};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub async fn handle(global: &GlobalOpts, cancel: CancellationToken) -> Result<(), CliError> {
    let config = rpimon_config::load(global.config.as_deref())?;

    // Client ids for the session pair are fixed inside the collector
    // (mqttstats-publisher / mqttstats-listener).
    let collector = BrokerStatsCollector::new(
        config.topics.prefix.clone(),
        &config.session_config("mqttstats"),
        &config.retry_policy(),
    );

    let options = RunLoopOptions::fixed_interval(config.update_interval(), config.startup_delay());
    run_collector(collector, options, cancel).await?;
    Ok(())
}
