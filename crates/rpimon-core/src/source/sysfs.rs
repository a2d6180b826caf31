// ── Pseudo-file readers ──
//
// Thermal, cpufreq, and uptime counters exposed by the kernel as small
// text files. A missing or unreadable file means the metric is skipped
// this tick (logged at debug at most), never an escalated error.

use std::path::Path;

/// Raspberry Pi SoC temperature, milli-°C.
pub const THERMAL_ZONE_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Current core frequency, kHz. On the Pi this doubles as the GPU-side
/// frequency reading.
pub const CPUFREQ_PATH: &str = "/sys/devices/system/cpu/cpu0/cpufreq/scaling_cur_freq";

/// Seconds since boot (first field).
pub const PROC_UPTIME_PATH: &str = "/proc/uptime";

/// First whitespace-separated token of the file, parsed as a float.
fn read_first_number(path: &Path) -> Option<f64> {
    let content = std::fs::read_to_string(path).ok()?;
    content.split_whitespace().next()?.parse().ok()
}

/// CPU temperature in °C from a thermal-zone file (milli-°C on disk).
pub fn cpu_temperature_celsius(path: &Path) -> Option<f64> {
    read_first_number(path).map(|milli| milli / 1000.0)
}

/// Scaling frequency in MHz from a cpufreq file (kHz on disk).
pub fn scaling_frequency_mhz(path: &Path) -> Option<f64> {
    read_first_number(path).map(|khz| khz / 1000.0)
}

/// Whole seconds since boot from a `/proc/uptime`-shaped file.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
pub fn uptime_seconds(path: &Path) -> Option<u64> {
    read_first_number(path).map(|secs| secs.max(0.0) as u64)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn thermal_zone_is_milli_celsius() {
        let file = temp_file("48312\n");
        let temp = cpu_temperature_celsius(file.path()).unwrap();
        assert!((temp - 48.312).abs() < 1e-9);
    }

    #[test]
    fn scaling_frequency_is_khz() {
        let file = temp_file("600000\n");
        let mhz = scaling_frequency_mhz(file.path()).unwrap();
        assert!((mhz - 600.0).abs() < 1e-9);
    }

    #[test]
    fn uptime_takes_the_first_field() {
        let file = temp_file("90000.27 350001.49\n");
        assert_eq!(uptime_seconds(file.path()), Some(90_000));
    }

    #[test]
    fn missing_file_reads_as_none() {
        assert_eq!(cpu_temperature_celsius(Path::new("/nonexistent/temp")), None);
        assert_eq!(uptime_seconds(Path::new("/nonexistent/uptime")), None);
    }
}
