use tokio_util::sync::CancellationToken;

use rpimon_core::collectors::{RunLoopOptions, WifiStatsCollector, run_collector};

use crate::cli::{GlobalOpts, WifiArgs};
use crate::error::CliError;

const CLIENT_ID: &str = "wifistats-collector";

pub async fn handle(
    global: &GlobalOpts,
    args: &WifiArgs,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let config = rpimon_config::load(global.config.as_deref())?;

    let collector = WifiStatsCollector::new(
        config.topics.prefix.clone(),
        config.wifi.interface.clone(),
        config.wifi.leases_file.clone(),
        config.session_config(CLIENT_ID),
        config.retry_policy(),
    )
    .with_extended(args.extended);

    let options = RunLoopOptions::fixed_interval(config.update_interval(), config.startup_delay());
    run_collector(collector, options, cancel).await?;
    Ok(())
}
