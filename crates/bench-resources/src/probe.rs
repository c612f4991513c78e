//! Point-in-time process observations.

use crate::error::ResourceError;
use std::time::Duration;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::debug;

/// One observation of the current process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSnapshot {
    /// Resident set size in bytes.
    pub rss_bytes: u64,
    /// Cumulative user + system CPU time, when the platform exposes it.
    pub cpu_time: Option<Duration>,
}

/// Source of process observations polled by the monitor.
pub trait ProcessProbe: Send {
    /// Take a snapshot. `None` means this tick is skipped.
    fn snapshot(&mut self) -> Option<ProcessSnapshot>;
}

/// Probe for the current process backed by `sysinfo`.
///
/// Memory is the resident set size and CPU time is the process's
/// accumulated user + system time, both refreshed on every snapshot.
pub struct SysinfoProbe {
    system: System,
    pid: Pid,
}

impl SysinfoProbe {
    pub fn new() -> Result<Self, ResourceError> {
        let pid = sysinfo::get_current_pid()
            .map_err(|e| ResourceError::Unavailable(e.to_string()))?;

        let mut system = System::new();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        if system.process(pid).is_none() {
            return Err(ResourceError::Unavailable(format!(
                "process {pid} not visible"
            )));
        }

        debug!("Resource probe attached to pid {}", pid);
        Ok(Self { system, pid })
    }
}

impl ProcessProbe for SysinfoProbe {
    fn snapshot(&mut self) -> Option<ProcessSnapshot> {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        let process = self.system.process(self.pid)?;

        Some(ProcessSnapshot {
            rss_bytes: process.memory(),
            cpu_time: Some(Duration::from_millis(process.accumulated_cpu_time())),
        })
    }
}
