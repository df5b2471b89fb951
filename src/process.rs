//! Lifecycle management for one supervised OS process.
use std::{
    io::{BufRead, BufReader},
    os::unix::process::CommandExt,
    path::PathBuf,
    process::{Command, Stdio},
    sync::{Arc, Condvar, Mutex},
    thread,
    time::{Duration, Instant},
};

use nix::unistd::User;
use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;
use tracing::{debug, info, warn};

use crate::{
    config::RegistryConfig,
    error::SupervisorError,
    logs::{now_millis, LogBuffer, LogItem},
};

/// Lifecycle states of a supervised process.
///
/// `Failed` is terminal for one start attempt only; `start` re-enters
/// `Running` from either `Stopped` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleStatus {
    /// Not running; either never started or stopped on request.
    Stopped,
    /// The OS process is alive and its output is being drained.
    Running,
    /// The last start attempt failed or the process exited on its own.
    Failed,
}

/// Observable state of one registry entry, copied out for callers.
///
/// This is the shape a transport layer serialises for list endpoints; the
/// live [`SupervisedProcess`] is never exposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSnapshot {
    /// Caller-supplied identifier, unique across the registry.
    pub id: String,
    /// PID of the OS process, present only while it is running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    /// Command line the process is launched with (whitespace-separated,
    /// no shell quoting).
    pub run: String,
    /// Account the process runs under, when one was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_as: Option<String>,
    /// Working directory of the process.
    pub folder: String,
    /// Text of the last recorded error, cleared by a successful start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Unix milliseconds of the most recent successful start.
    #[serde(rename = "started", skip_serializing_if = "Option::is_none")]
    pub last_started: Option<i64>,
    /// Whether the lifecycle currently considers the process alive.
    pub is_running: bool,
    /// Opaque alert reference, passed through unmodified.
    #[serde(rename = "alertID")]
    pub alert_id: String,
}

/// Mutable lifecycle state, guarded by [`Shared::state`].
#[derive(Debug)]
struct RunState {
    status: LifecycleStatus,
    pid: Option<u32>,
    last_started: Option<i64>,
    last_error: Option<String>,
    /// Set by `stop` before signalling so the waiter records a clean stop
    /// instead of a failure.
    stop_requested: bool,
    /// Incremented on every successful launch; stale waiter threads bail
    /// out when their generation no longer matches.
    generation: u64,
}

/// State shared between the process handle and its waiter thread.
#[derive(Debug)]
struct Shared {
    state: Mutex<RunState>,
    exited: Condvar,
}

/// Interval at which a stop re-checks for termination, mirroring the
/// escalation cadence used for SIGTERM/SIGKILL handling elsewhere.
const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Bounded wait for the waiter to confirm death after a SIGKILL.
const KILL_CONFIRM_TIMEOUT: Duration = Duration::from_secs(2);

/// Wraps one OS-level process: launch configuration, lifecycle state and
/// the two bounded buffers its output streams are drained into.
///
/// `start`, `stop` and `restart` on the same process are serialised by an
/// internal lifecycle mutex; operations on different processes never
/// contend with one another.
#[derive(Debug)]
pub struct SupervisedProcess {
    id: String,
    run: String,
    folder: PathBuf,
    run_as: Option<String>,
    alert_id: String,
    stop_grace: Duration,
    /// Serialises start/stop/restart. Never held while blocking on child
    /// exit beyond the bounded stop grace period.
    lifecycle: Mutex<()>,
    shared: Arc<Shared>,
    stdout: Arc<LogBuffer>,
    stderr: Arc<LogBuffer>,
}

impl SupervisedProcess {
    /// Validates the launch description and builds a process in the
    /// `Stopped` state. Does not touch the OS.
    ///
    /// `run` is split on whitespace and its first token exec'd directly,
    /// without a shell; there is no quoting. Wrap shell syntax in a
    /// script and pass `sh <script>` instead.
    pub fn new(
        id: impl Into<String>,
        run: impl Into<String>,
        folder: impl Into<PathBuf>,
        alert_id: impl Into<String>,
        run_as: Option<String>,
        config: &RegistryConfig,
    ) -> Result<Self, SupervisorError> {
        let id = id.into();
        let run = run.into();

        if id.trim().is_empty() {
            return Err(SupervisorError::LaunchError {
                id,
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "process id must not be empty",
                ),
            });
        }
        if run.trim().is_empty() {
            return Err(SupervisorError::LaunchError {
                id,
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "run command must not be empty",
                ),
            });
        }

        Ok(Self {
            id,
            run,
            folder: folder.into(),
            run_as,
            alert_id: alert_id.into(),
            stop_grace: config.stop_grace,
            lifecycle: Mutex::new(()),
            shared: Arc::new(Shared {
                state: Mutex::new(RunState {
                    status: LifecycleStatus::Stopped,
                    pid: None,
                    last_started: None,
                    last_error: None,
                    stop_requested: false,
                    generation: 0,
                }),
                exited: Condvar::new(),
            }),
            stdout: Arc::new(LogBuffer::new(config.log_capacity)),
            stderr: Arc::new(LogBuffer::new(config.log_capacity)),
        })
    }

    /// Caller-supplied identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the lifecycle currently considers the process alive.
    pub fn is_running(&self) -> bool {
        self.shared
            .state
            .lock()
            .map(|state| state.status == LifecycleStatus::Running)
            .unwrap_or(false)
    }

    /// Newest-first snapshot of captured stdout.
    pub fn stdout_logs(&self) -> Vec<LogItem> {
        self.stdout.snapshot()
    }

    /// Newest-first snapshot of captured stderr.
    pub fn stderr_logs(&self) -> Vec<LogItem> {
        self.stderr.snapshot()
    }

    /// Copies the observable state out for listing.
    pub fn snapshot(&self) -> Result<ProcessSnapshot, SupervisorError> {
        let state = self.shared.state.lock()?;
        Ok(ProcessSnapshot {
            id: self.id.clone(),
            pid: state.pid,
            run: self.run.clone(),
            run_as: self.run_as.clone(),
            folder: self.folder.display().to_string(),
            error: state.last_error.clone(),
            last_started: state.last_started,
            is_running: state.status == LifecycleStatus::Running,
            alert_id: self.alert_id.clone(),
        })
    }

    /// Launches the OS process and begins draining its output.
    ///
    /// Valid from `Stopped` or `Failed`; a process that is already running
    /// is left alone (use [`SupervisedProcess::restart`] for a fresh
    /// instance). On launch failure the error is recorded on the process
    /// and returned to the caller.
    pub fn start(&self) -> Result<(), SupervisorError> {
        let _lifecycle = self.lifecycle.lock()?;
        self.start_locked()
    }

    /// Requests graceful termination, escalating to SIGKILL after the
    /// configured grace period. Idempotent: stopping a process that is not
    /// running succeeds silently. Fails with [`SupervisorError::StopError`]
    /// if the process is still alive after the SIGKILL escalation.
    pub fn stop(&self) -> Result<(), SupervisorError> {
        let _lifecycle = self.lifecycle.lock()?;
        self.stop_locked()
    }

    /// Stops the process if it is running, then starts it again with the
    /// unchanged launch configuration.
    pub fn restart(&self) -> Result<(), SupervisorError> {
        let _lifecycle = self.lifecycle.lock()?;
        self.stop_locked()?;
        self.start_locked()
    }

    fn start_locked(&self) -> Result<(), SupervisorError> {
        {
            let state = self.shared.state.lock()?;
            if state.status == LifecycleStatus::Running {
                debug!("Process '{}' is already running; start is a no-op", self.id);
                return Ok(());
            }
        }

        debug!("Launching process '{}' with command: `{}`", self.id, self.run);

        // Spawn the executable directly rather than through a shell so that
        // a missing binary or permission problem surfaces here, as a
        // launch error, instead of as a deferred shell exit code.
        let mut words = self.run.split_whitespace();
        let program = words.next().unwrap_or_default();
        let mut cmd = Command::new(program);
        cmd.args(words);
        cmd.current_dir(&self.folder);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());

        if let Some(account) = &self.run_as {
            let user = User::from_name(account)
                .ok()
                .flatten()
                .ok_or_else(|| SupervisorError::UnknownUser {
                    id: self.id.clone(),
                    user: account.clone(),
                })?;
            cmd.uid(user.uid.as_raw());
            cmd.gid(user.gid.as_raw());
        }

        // Place the child in its own process group so stop can signal the
        // entire tree without touching the supervisor's group.
        unsafe {
            cmd.pre_exec(|| {
                if libc::setpgid(0, 0) < 0 {
                    let err = std::io::Error::last_os_error();
                    eprintln!("warden pre_exec: setpgid(0, 0) failed: {:?}", err);
                    return Err(err);
                }
                Ok(())
            });
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!("Failed to launch process '{}': {err}", self.id);
                let mut state = self.shared.state.lock()?;
                state.status = LifecycleStatus::Failed;
                state.pid = None;
                state.last_error = Some(err.to_string());
                return Err(SupervisorError::LaunchError {
                    id: self.id.clone(),
                    source: err,
                });
            }
        };

        let pid = child.id();
        info!("Process '{}' started with PID {pid}", self.id);

        if let Some(out) = child.stdout.take() {
            let buffer = Arc::clone(&self.stdout);
            thread::spawn(move || {
                let reader = BufReader::new(out);
                for line in reader.lines().map_while(Result::ok) {
                    buffer.push(line, now_millis());
                }
            });
        }
        if let Some(err) = child.stderr.take() {
            let buffer = Arc::clone(&self.stderr);
            thread::spawn(move || {
                let reader = BufReader::new(err);
                for line in reader.lines().map_while(Result::ok) {
                    buffer.push(line, now_millis());
                }
            });
        }

        let generation = {
            let mut state = self.shared.state.lock()?;
            state.status = LifecycleStatus::Running;
            state.pid = Some(pid);
            state.last_error = None;
            state.stop_requested = false;
            state.generation += 1;
            // Restarts within the same millisecond must still observably
            // advance `last_started`.
            let now = now_millis();
            state.last_started = Some(match state.last_started {
                Some(previous) => now.max(previous + 1),
                None => now,
            });
            state.generation
        };

        let shared = Arc::clone(&self.shared);
        let id = self.id.clone();
        thread::spawn(move || {
            let result = child.wait();

            let mut state = shared
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if state.generation != generation {
                return;
            }

            state.pid = None;
            match result {
                Ok(status) => {
                    if state.stop_requested {
                        info!("Process '{id}' stopped");
                        state.status = LifecycleStatus::Stopped;
                    } else if status.success() {
                        info!("Process '{id}' exited normally");
                        state.status = LifecycleStatus::Failed;
                    } else {
                        warn!("Process '{id}' terminated with {status}");
                        state.status = LifecycleStatus::Failed;
                        state.last_error = Some(format!("process terminated: {status}"));
                    }
                }
                Err(err) => {
                    warn!("Failed to wait on process '{id}': {err}");
                    state.status = LifecycleStatus::Failed;
                    state.last_error = Some(format!("wait failed: {err}"));
                }
            }
            debug!("Process '{id}' is now {}", state.status.as_ref());
            shared.exited.notify_all();
        });

        Ok(())
    }

    fn stop_locked(&self) -> Result<(), SupervisorError> {
        let pid = {
            let mut state = self.shared.state.lock()?;
            if state.status != LifecycleStatus::Running {
                debug!("Process '{}' is not running; stop is a no-op", self.id);
                return Ok(());
            }
            state.stop_requested = true;
            match state.pid {
                Some(pid) => pid,
                None => return Ok(()),
            }
        };

        debug!("Stopping process '{}' (PID {pid})", self.id);
        self.signal_tree(pid, nix::sys::signal::Signal::SIGTERM)?;

        if !self.wait_exited(self.stop_grace) {
            warn!(
                "Process '{}' did not exit within {:?} after SIGTERM; sending SIGKILL",
                self.id, self.stop_grace
            );
            self.signal_tree(pid, nix::sys::signal::Signal::SIGKILL)?;
            if !self.wait_exited(KILL_CONFIRM_TIMEOUT) {
                return Err(SupervisorError::StopError {
                    id: self.id.clone(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        format!("PID {pid} still alive {KILL_CONFIRM_TIMEOUT:?} after SIGKILL"),
                    ),
                });
            }
        }

        Ok(())
    }

    /// Sends `signal` to the child's process group, falling back to the
    /// process itself when group delivery is not possible. A process that
    /// already exited (ESRCH) is not an error.
    fn signal_tree(
        &self,
        pid: u32,
        signal: nix::sys::signal::Signal,
    ) -> Result<(), SupervisorError> {
        let raw = pid as i32;

        // The child is its own group leader (setpgid in pre_exec), so the
        // group id equals its pid.
        let group_result = unsafe { libc::killpg(raw, signal as libc::c_int) };
        if group_result < 0 {
            let err = std::io::Error::last_os_error();
            match err.raw_os_error() {
                Some(code) if code == libc::ESRCH => {}
                Some(code) if code == libc::EPERM => {
                    warn!(
                        "Insufficient permissions to signal process group {raw} for '{}'; falling back to direct signal",
                        self.id
                    );
                }
                _ => {
                    return Err(SupervisorError::StopError {
                        id: self.id.clone(),
                        source: err,
                    });
                }
            }
        }

        match nix::sys::signal::kill(nix::unistd::Pid::from_raw(raw), Some(signal)) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(errno) => Err(SupervisorError::StopError {
                id: self.id.clone(),
                source: std::io::Error::from_raw_os_error(errno as i32),
            }),
        }
    }

    /// Waits up to `timeout` for the waiter thread to record the exit.
    /// Returns `true` once the process is no longer `Running`.
    fn wait_exited(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        while state.status == LifecycleStatus::Running {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let step = STOP_CHECK_INTERVAL.min(deadline - now);
            let (guard, _) = self
                .shared
                .exited
                .wait_timeout(state, step)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = guard;
        }

        true
    }
}
