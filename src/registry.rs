//! Thread-safe registry of supervised processes.
use std::{
    path::PathBuf,
    sync::{Arc, RwLock},
};

use tracing::{debug, info};

use crate::{
    config::RegistryConfig,
    error::SupervisorError,
    logs::LogItem,
    process::{ProcessSnapshot, SupervisedProcess},
};

/// Owns every [`SupervisedProcess`] and serialises structural changes.
///
/// Entries are kept in insertion order and looked up by identifier with a
/// linear scan; registries are small and queried far more often than they
/// grow. A reader/writer lock guards the collection: `add_process` takes
/// the write side, everything else reads, and per-process lifecycle
/// operations take that process's own lock so different processes never
/// contend.
#[derive(Debug, Default)]
pub struct Registry {
    processes: RwLock<Vec<Arc<SupervisedProcess>>>,
    config: RegistryConfig,
}

impl Registry {
    /// Creates an empty registry with default tunables.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Creates an empty registry with the given tunables.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            processes: RwLock::new(Vec::new()),
            config,
        }
    }

    /// Registers a new process and starts it as part of the call.
    ///
    /// Fails with [`SupervisorError::DuplicateProcess`] when `id` is taken,
    /// leaving the registry unchanged. A launch failure is returned to the
    /// caller, but the entry stays registered in its failed state so it can
    /// be inspected and restarted later.
    pub fn add_process(
        &self,
        id: impl Into<String>,
        run: impl Into<String>,
        folder: impl Into<PathBuf>,
        alert_id: impl Into<String>,
        run_as: Option<String>,
    ) -> Result<(), SupervisorError> {
        let id = id.into();
        let mut processes = self.processes.write()?;

        if processes.iter().any(|process| process.id() == id) {
            return Err(SupervisorError::DuplicateProcess { id });
        }

        let process = Arc::new(SupervisedProcess::new(
            id.clone(),
            run,
            folder,
            alert_id,
            run_as,
            &self.config,
        )?);

        // Insert fully populated before starting: concurrent listings see
        // either no entry or a complete one, never a partial construction.
        processes.push(Arc::clone(&process));
        info!("Registered process '{id}'");

        process.start()
    }

    /// Whether a process with this identifier is registered.
    pub fn process_exists(&self, id: &str) -> bool {
        self.processes
            .read()
            .map(|processes| processes.iter().any(|process| process.id() == id))
            .unwrap_or(false)
    }

    /// Stops the identified process, waiting up to the configured grace
    /// period. Unknown identifiers fail with [`SupervisorError::ProcessNotFound`].
    pub fn stop_process(&self, id: &str) -> Result<(), SupervisorError> {
        self.find(id)?.stop()
    }

    /// Restarts the identified process with its unchanged launch
    /// configuration. Unknown identifiers fail with
    /// [`SupervisorError::ProcessNotFound`].
    pub fn restart_process(&self, id: &str) -> Result<(), SupervisorError> {
        debug!("Restarting process '{id}'");
        self.find(id)?.restart()
    }

    /// Immutable copies of every entry's observable state, in insertion
    /// order.
    pub fn list_processes(&self) -> Result<Vec<ProcessSnapshot>, SupervisorError> {
        let processes = self.processes.read()?;
        processes.iter().map(|process| process.snapshot()).collect()
    }

    /// Newest-first snapshot of the identified process's captured stdout.
    pub fn process_logs(&self, id: &str) -> Result<Vec<LogItem>, SupervisorError> {
        Ok(self.find(id)?.stdout_logs())
    }

    /// Newest-first snapshot of the identified process's captured stderr.
    pub fn process_errors(&self, id: &str) -> Result<Vec<LogItem>, SupervisorError> {
        Ok(self.find(id)?.stderr_logs())
    }

    /// Looks up an entry by identifier under the read lock.
    fn find(&self, id: &str) -> Result<Arc<SupervisedProcess>, SupervisorError> {
        let processes = self.processes.read()?;
        processes
            .iter()
            .find(|process| process.id() == id)
            .cloned()
            .ok_or_else(|| SupervisorError::ProcessNotFound { id: id.to_string() })
    }
}
