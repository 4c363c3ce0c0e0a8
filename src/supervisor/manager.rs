//! Bot process supervisor.
//!
//! Spawned processes are tracked by PID; the executable-basename scan of
//! the process table is the fallback used for bots started before this
//! service (or by hand). Basename matching is best effort: an unrelated
//! process sharing the filename is indistinguishable from the bot.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::process::Command;
use tracing::{info, warn};

use crate::database::BotRecord;
use crate::error::{WardenError, WardenResult};

use super::table::ProcessTable;
use super::BotStatus;

pub struct Supervisor {
    table: Arc<dyn ProcessTable>,
    /// Bot name to PID of the child we spawned ourselves.
    children: Arc<DashMap<String, u32>>,
}

impl Supervisor {
    pub fn new(table: Arc<dyn ProcessTable>) -> Self {
        Self {
            table,
            children: Arc::new(DashMap::new()),
        }
    }

    /// Live status of a bot.
    ///
    /// A tracked PID answers first; otherwise the process table is scanned
    /// for a case-insensitive basename match. Enumeration failures come
    /// back as [`BotStatus::Error`], distinct from stopped.
    pub fn status(&self, bot: &BotRecord) -> BotStatus {
        let Some(basename) = bot.exe_basename() else {
            return BotStatus::NotFound;
        };

        if let Some(pid) = self.children.get(&bot.name).map(|entry| *entry) {
            match self.table.alive(pid) {
                Ok(true) => return BotStatus::Running,
                Ok(false) => {
                    // Stale entry; the waiter task has not caught up yet.
                    self.children.remove(&bot.name);
                }
                Err(e) => {
                    warn!("pid check failed for bot {}: {}", bot.name, e);
                    return BotStatus::Error;
                }
            }
        }

        match self.table.enumerate() {
            Ok(entries) => {
                let running = entries
                    .iter()
                    .any(|entry| entry.exe_name.eq_ignore_ascii_case(&basename));
                if running {
                    BotStatus::Running
                } else {
                    BotStatus::Stopped
                }
            }
            Err(e) => {
                warn!("process enumeration failed for bot {}: {}", bot.name, e);
                BotStatus::Error
            }
        }
    }

    /// Spawn the bot executable as a detached child and track its PID.
    pub async fn start(&self, bot: &BotRecord) -> WardenResult<u32> {
        if bot.exe_basename().is_none() {
            return Err(WardenError::NotFound(format!(
                "executable for bot {}",
                bot.name
            )));
        }
        if !Path::new(&bot.exe).exists() {
            return Err(WardenError::NotFound(format!("executable {}", bot.exe)));
        }

        match self.status(bot) {
            BotStatus::Running => {
                return Err(WardenError::AlreadyExists(format!(
                    "bot {} is already running",
                    bot.name
                )));
            }
            BotStatus::Error => {
                return Err(WardenError::External(
                    "process table unavailable".to_string(),
                ));
            }
            _ => {}
        }

        let mut child = Command::new(&bot.exe)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| WardenError::External(format!("failed to spawn {}: {}", bot.exe, e)))?;

        let pid = child.id().unwrap_or_default();
        if pid != 0 {
            self.children.insert(bot.name.clone(), pid);
        }

        // Reap the child and drop the PID entry when it exits.
        let children = Arc::clone(&self.children);
        let name = bot.name.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => info!("bot {} exited: {}", name, status),
                Err(e) => warn!("failed waiting on bot {}: {}", name, e),
            }
            children.remove(&name);
        });

        info!("bot {} started (pid {})", bot.name, pid);
        Ok(pid)
    }

    /// Terminate the tracked child and every basename match in the table.
    ///
    /// Returns the number of processes signaled; zero is a failure
    /// (nothing to stop).
    pub fn stop(&self, bot: &BotRecord) -> WardenResult<u32> {
        let Some(basename) = bot.exe_basename() else {
            return Err(WardenError::NotFound(format!(
                "executable for bot {}",
                bot.name
            )));
        };

        let mut signaled: Vec<u32> = Vec::new();

        if let Some((_, pid)) = self.children.remove(&bot.name) {
            match self.table.terminate(pid) {
                Ok(true) => signaled.push(pid),
                Ok(false) => {}
                Err(e) => warn!("failed to signal pid {} for bot {}: {}", pid, bot.name, e),
            }
        }

        for entry in self.table.enumerate()? {
            if !entry.exe_name.eq_ignore_ascii_case(&basename) || signaled.contains(&entry.pid) {
                continue;
            }
            match self.table.terminate(entry.pid) {
                Ok(true) => signaled.push(entry.pid),
                Ok(false) => {}
                Err(e) => warn!(
                    "failed to signal pid {} for bot {}: {}",
                    entry.pid, bot.name, e
                ),
            }
        }

        if signaled.is_empty() {
            return Err(WardenError::NotFound(format!(
                "no running process for bot {}",
                bot.name
            )));
        }

        info!(
            "bot {} stopped ({} process(es) signaled)",
            bot.name,
            signaled.len()
        );
        Ok(signaled.len() as u32)
    }

    /// Compare declared state against the live table.
    ///
    /// Returns `(bot name, actually running)` for every divergence, for
    /// the caller to persist. Bots whose status cannot be determined are
    /// logged and skipped.
    pub fn reconcile(&self, bots: &[BotRecord]) -> Vec<(String, bool)> {
        let mut divergences = Vec::new();

        for bot in bots {
            match self.status(bot) {
                BotStatus::Running if !bot.state => divergences.push((bot.name.clone(), true)),
                BotStatus::Stopped | BotStatus::NotFound if bot.state => {
                    divergences.push((bot.name.clone(), false))
                }
                BotStatus::Error => {
                    warn!("skipping reconciliation for bot {}: status unknown", bot.name);
                }
                _ => {}
            }
        }

        divergences
    }
}

#[cfg(test)]
mod tests {
    use super::super::table::ProcessEntry;
    use super::*;
    use std::sync::Mutex;

    struct MockTable {
        entries: Vec<ProcessEntry>,
        fail: bool,
        killed: Mutex<Vec<u32>>,
    }

    impl MockTable {
        fn with_entries(entries: Vec<(u32, &str)>) -> Self {
            Self {
                entries: entries
                    .into_iter()
                    .map(|(pid, exe_name)| ProcessEntry {
                        pid,
                        exe_name: exe_name.to_string(),
                    })
                    .collect(),
                fail: false,
                killed: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                entries: Vec::new(),
                fail: true,
                killed: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProcessTable for MockTable {
        fn enumerate(&self) -> WardenResult<Vec<ProcessEntry>> {
            if self.fail {
                return Err(WardenError::External("table unavailable".into()));
            }
            Ok(self.entries.clone())
        }

        fn alive(&self, pid: u32) -> WardenResult<bool> {
            if self.fail {
                return Err(WardenError::External("table unavailable".into()));
            }
            Ok(self.entries.iter().any(|e| e.pid == pid))
        }

        fn terminate(&self, pid: u32) -> WardenResult<bool> {
            if self.alive(pid)? {
                self.killed.lock().unwrap().push(pid);
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }

    fn bot(exe: &str) -> BotRecord {
        BotRecord::new("relay", exe, None, "relay")
    }

    #[test]
    fn test_status_matches_basename_case_insensitive() {
        let table = Arc::new(MockTable::with_entries(vec![(42, "relay.exe")]));
        let supervisor = Supervisor::new(table);
        assert_eq!(
            supervisor.status(&bot("/opt/bots/Relay.EXE")),
            BotStatus::Running
        );
    }

    #[test]
    fn test_status_stopped_when_no_match() {
        let table = Arc::new(MockTable::with_entries(vec![(42, "other.exe")]));
        let supervisor = Supervisor::new(table);
        assert_eq!(
            supervisor.status(&bot("/opt/bots/relay.exe")),
            BotStatus::Stopped
        );
    }

    #[test]
    fn test_status_without_executable_path() {
        let table = Arc::new(MockTable::with_entries(vec![]));
        let supervisor = Supervisor::new(table);
        assert_eq!(supervisor.status(&bot("")), BotStatus::NotFound);
    }

    #[test]
    fn test_status_error_on_enumeration_failure() {
        let table = Arc::new(MockTable::failing());
        let supervisor = Supervisor::new(table);
        assert_eq!(
            supervisor.status(&bot("/opt/bots/relay.exe")),
            BotStatus::Error
        );
    }

    #[test]
    fn test_stop_fails_with_nothing_running() {
        let table = Arc::new(MockTable::with_entries(vec![(7, "other.exe")]));
        let supervisor = Supervisor::new(Arc::clone(&table) as Arc<dyn ProcessTable>);
        let result = supervisor.stop(&bot("/opt/bots/relay.exe"));
        assert!(matches!(result, Err(WardenError::NotFound(_))));
        assert!(table.killed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stop_signals_every_match() {
        let table = Arc::new(MockTable::with_entries(vec![
            (7, "relay.exe"),
            (8, "relay.exe"),
            (9, "other.exe"),
        ]));
        let supervisor = Supervisor::new(Arc::clone(&table) as Arc<dyn ProcessTable>);
        let signaled = supervisor.stop(&bot("/opt/bots/relay.exe")).unwrap();
        assert_eq!(signaled, 2);
        assert_eq!(*table.killed.lock().unwrap(), vec![7, 8]);
    }

    #[tokio::test]
    async fn test_start_fails_for_missing_executable() {
        let table = Arc::new(MockTable::with_entries(vec![]));
        let supervisor = Supervisor::new(table);
        let result = supervisor.start(&bot("/nonexistent/bots/relay.exe")).await;
        assert!(matches!(result, Err(WardenError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_start_fails_when_already_running() {
        // The test binary itself is a path that is guaranteed to exist.
        let exe = std::env::current_exe().unwrap();
        let record = bot(exe.to_str().unwrap());
        let basename = record.exe_basename().unwrap();

        let table = Arc::new(MockTable::with_entries(vec![(1234, basename.as_str())]));
        let supervisor = Supervisor::new(table);
        let result = supervisor.start(&record).await;
        assert!(matches!(result, Err(WardenError::AlreadyExists(_))));
    }

    #[test]
    fn test_reconcile_reports_divergences() {
        let table = Arc::new(MockTable::with_entries(vec![(42, "relay.exe")]));
        let supervisor = Supervisor::new(table);

        let mut running_undeclared = bot("/opt/bots/relay.exe");
        running_undeclared.state = false;

        let mut stopped_declared = BotRecord::new("echo", "/opt/bots/echo.exe", None, "echo");
        stopped_declared.state = true;

        let mut in_sync = BotRecord::new("relay2", "/opt/bots/relay.exe", None, "relay");
        in_sync.state = true;

        let divergences =
            supervisor.reconcile(&[running_undeclared, stopped_declared, in_sync]);
        assert_eq!(
            divergences,
            vec![("relay".to_string(), true), ("echo".to_string(), false)]
        );
    }
}
