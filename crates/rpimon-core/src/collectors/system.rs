// ── System metrics collector ──
//
// Polls OS counters on three independent cadences:
//
//   fast    per-core CPU %, RAM %
//   normal  CPU/GPU temperature, CPU/GPU frequency
//   slow    swap %, disk %, uptime
//
// Each tier's gathering is fault-isolated: a missing pseudo-file or a
// failed publish skips that metric and never bleeds into the others.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use sysinfo::{CpuRefreshKind, Disks, System};
use tokio::time::Instant as TokioInstant;
use tracing::{debug, info};

use rpimon_mqtt::{ConnectionManager, DisconnectCounter, MqttDialer, RetryPolicy, SessionConfig};

use crate::collectors::Collector;
use crate::error::CoreError;
use crate::model::{round1, round2};
use crate::publisher::TelemetryPublisher;
use crate::sched::{MultiRateScheduler, Tier, TierIntervals};
use crate::source::sysfs;

pub struct SystemMetricsCollector {
    prefix: String,
    scheduler: MultiRateScheduler,
    manager: ConnectionManager<MqttDialer>,
    publisher: TelemetryPublisher,
    system: System,
    disconnects: Arc<DisconnectCounter>,
    thermal_path: PathBuf,
    cpufreq_path: PathBuf,
    uptime_path: PathBuf,
    started_at: Instant,
}

impl SystemMetricsCollector {
    pub fn new(
        prefix: impl Into<String>,
        intervals: TierIntervals,
        session: SessionConfig,
        policy: RetryPolicy,
    ) -> Self {
        let disconnects = Arc::new(DisconnectCounter::default());
        let dialer = MqttDialer::new(session).with_observer(disconnects.clone());
        Self {
            prefix: prefix.into(),
            scheduler: MultiRateScheduler::new(intervals),
            manager: ConnectionManager::new(dialer, policy),
            publisher: TelemetryPublisher::new(),
            system: System::new(),
            disconnects,
            thermal_path: PathBuf::from(sysfs::THERMAL_ZONE_PATH),
            cpufreq_path: PathBuf::from(sysfs::CPUFREQ_PATH),
            uptime_path: PathBuf::from(sysfs::PROC_UPTIME_PATH),
            started_at: Instant::now(),
        }
    }

    async fn collect_fast(&mut self) {
        self.system.refresh_cpu_usage();
        let usages: Vec<f64> = self
            .system
            .cpus()
            .iter()
            .map(|cpu| f64::from(cpu.cpu_usage()))
            .collect();
        for (index, usage) in usages.into_iter().enumerate() {
            let topic = format!("{}/system/cpu/core{}", self.prefix, index + 1);
            let _ = self.publisher.metric(&topic, round1(usage), Some("%")).await;
        }

        self.system.refresh_memory();
        if let Some(ram) = percent(self.system.used_memory(), self.system.total_memory()) {
            let topic = format!("{}/system/memory/ram", self.prefix);
            let _ = self.publisher.metric(&topic, round1(ram), Some("%")).await;
        }
    }

    async fn collect_normal(&mut self) {
        match sysfs::cpu_temperature_celsius(&self.thermal_path) {
            Some(temp) => {
                let value = round1(temp);
                let topic = format!("{}/system/temperature/cpu", self.prefix);
                let _ = self.publisher.metric(&topic, value, Some("°C")).await;
                // The Pi exposes a single sensor; the GPU reading mirrors it.
                let topic = format!("{}/system/temperature/gpu", self.prefix);
                let _ = self.publisher.metric(&topic, value, Some("°C")).await;
            }
            None => debug!("thermal zone unavailable"),
        }

        self.system
            .refresh_cpu_specifics(CpuRefreshKind::new().with_frequency());
        if let Some(mhz) = self.system.cpus().first().map(sysinfo::Cpu::frequency) {
            #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
            let ghz = round2(mhz as f64 / 1000.0);
            let topic = format!("{}/system/frequency/cpu", self.prefix);
            let _ = self.publisher.metric(&topic, ghz, Some("GHz")).await;
        }

        match sysfs::scaling_frequency_mhz(&self.cpufreq_path) {
            Some(mhz) => {
                let topic = format!("{}/system/frequency/gpu", self.prefix);
                let _ = self.publisher.metric(&topic, mhz.round(), Some("MHz")).await;
            }
            None => debug!("cpufreq scaling file unavailable"),
        }
    }

    async fn collect_slow(&mut self) {
        self.system.refresh_memory();
        if let Some(swap) = percent(self.system.used_swap(), self.system.total_swap()) {
            let topic = format!("{}/system/memory/swap", self.prefix);
            let _ = self.publisher.metric(&topic, round1(swap), Some("%")).await;
        }

        if let Some(disk) = root_disk_percent() {
            let topic = format!("{}/system/memory/disk", self.prefix);
            let _ = self.publisher.metric(&topic, round1(disk), Some("%")).await;
        }

        match sysfs::uptime_seconds(&self.uptime_path) {
            Some(uptime) => {
                let topic = format!("{}/system/uptime", self.prefix);
                let _ = self.publisher.metric(&topic, uptime, Some("seconds")).await;
            }
            None => debug!("uptime source unavailable"),
        }
    }
}

impl Collector for SystemMetricsCollector {
    fn name(&self) -> &'static str {
        "system-metrics"
    }

    async fn ensure_connected(&mut self) -> Result<(), CoreError> {
        if self.publisher.connected() {
            return Ok(());
        }
        if self.publisher.session().is_some() {
            tracing::warn!("broker connection lost, reconnecting");
            self.publisher.detach();
        }
        let session = self.manager.connect().await?;
        self.publisher.attach(session);
        Ok(())
    }

    async fn tick(&mut self) -> Result<(), CoreError> {
        for tier in self.scheduler.due(TokioInstant::now()) {
            match tier {
                Tier::Fast => self.collect_fast().await,
                Tier::Normal => self.collect_normal().await,
                Tier::Slow => self.collect_slow().await,
            }
        }
        Ok(())
    }

    fn log_statistics(&self) {
        let runtime = self.started_at.elapsed();
        info!(
            runtime_hours = runtime.as_secs() / 3600,
            runtime_minutes = (runtime.as_secs() % 3600) / 60,
            messages_sent = self.publisher.sent(),
            errors = self.publisher.errors(),
            connection_failures = self.manager.connection_failures(),
            disconnects = self.disconnects.count(),
            "collector statistics"
        );
    }
}

/// used/total as a percentage; `None` when the total is zero (absent
/// swap, unreadable device).
#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn percent(used: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| used as f64 / total as f64 * 100.0)
}

fn root_disk_percent() -> Option<f64> {
    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == Path::new("/"))?;
    let total = root.total_space();
    let used = total.saturating_sub(root.available_space());
    percent(used, total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn percent_of_zero_total_is_none() {
        assert_eq!(percent(10, 0), None);
    }

    #[test]
    fn percent_is_used_over_total() {
        let pct = percent(1, 4).unwrap();
        assert!((pct - 25.0).abs() < f64::EPSILON);
    }
}
