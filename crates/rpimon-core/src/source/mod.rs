// ── Data sources ──
//
// Opaque text/number sources the collectors read: external commands
// (station dump, interface info, hostname lookup), the DHCP lease file,
// and sysfs/procfs pseudo-files. Command execution sits behind a seam so
// parsers are exercised against canned output in tests.

pub mod leases;
pub mod oui;
pub mod station;
pub mod sysfs;

use std::process::Command;

use crate::error::CoreError;

/// Runs an external command and captures stdout.
///
/// Calls are synchronous and blocking: a slow command delays the current
/// poll tick but cannot corrupt other tiers, which only interleave at the
/// scheduler boundary.
pub trait CommandRunner: Send {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, CoreError>;
}

/// Production runner backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, CoreError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| CoreError::Command {
                command: program.to_owned(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(CoreError::Command {
                command: program.to_owned(),
                reason: format!("exit status {}", output.status),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
