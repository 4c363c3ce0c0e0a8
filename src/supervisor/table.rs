//! OS process table access.
//!
//! The supervisor talks to the process table through a trait so its
//! decision logic can run against a scripted table in tests. The real
//! implementation wraps `sysinfo`.

use parking_lot::Mutex;
use sysinfo::{Pid, System};

use crate::error::WardenResult;

/// One live process, reduced to what the supervisor matches on.
#[derive(Debug, Clone)]
pub struct ProcessEntry {
    pub pid: u32,
    /// Executable basename as reported by the OS.
    pub exe_name: String,
}

/// Enumerate and signal live processes.
///
/// Enumeration may fail where the process table is restricted; such
/// failures surface as a distinct `Error` status, never as "stopped".
pub trait ProcessTable: Send + Sync {
    /// Snapshot of the live process table.
    fn enumerate(&self) -> WardenResult<Vec<ProcessEntry>>;

    /// Whether a PID is still present in the table.
    fn alive(&self, pid: u32) -> WardenResult<bool>;

    /// Send a termination signal. `Ok(false)` when the process was
    /// already gone.
    fn terminate(&self, pid: u32) -> WardenResult<bool>;
}

/// Process table backed by `sysinfo`.
pub struct SystemTable {
    sys: Mutex<System>,
}

impl SystemTable {
    pub fn new() -> Self {
        Self {
            sys: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SystemTable {
    fn enumerate(&self) -> WardenResult<Vec<ProcessEntry>> {
        let mut sys = self.sys.lock();
        sys.refresh_processes();

        let entries = sys
            .processes()
            .iter()
            .map(|(pid, process)| {
                let exe_name = process
                    .exe()
                    .and_then(|path| path.file_name())
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| process.name().to_string());
                ProcessEntry {
                    pid: pid.as_u32(),
                    exe_name,
                }
            })
            .collect();

        Ok(entries)
    }

    fn alive(&self, pid: u32) -> WardenResult<bool> {
        let mut sys = self.sys.lock();
        sys.refresh_processes();
        Ok(sys.process(Pid::from_u32(pid)).is_some())
    }

    fn terminate(&self, pid: u32) -> WardenResult<bool> {
        let mut sys = self.sys.lock();
        sys.refresh_processes();
        Ok(sys
            .process(Pid::from_u32(pid))
            .map(|process| process.kill())
            .unwrap_or(false))
    }
}
