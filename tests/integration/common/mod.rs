#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use warden::{process::ProcessSnapshot, registry::Registry};

/// Polls `pred` every 50ms until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if pred() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(50));
    }
}

/// Writes a shell script into `dir` and returns its path. Scripts are run
/// as `sh <name>` so no executable bit is needed.
pub fn write_script(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("failed to write script");
    path
}

/// Returns the snapshot for `id`, panicking when it is absent.
pub fn snapshot_of(registry: &Registry, id: &str) -> ProcessSnapshot {
    registry
        .list_processes()
        .expect("list processes")
        .into_iter()
        .find(|snapshot| snapshot.id == id)
        .unwrap_or_else(|| panic!("process '{id}' not listed"))
}

/// Waits until the registry reports `id` with the given running state.
pub fn wait_for_running(registry: &Registry, id: &str, running: bool) -> bool {
    wait_until(Duration::from_secs(5), || {
        snapshot_of(registry, id).is_running == running
    })
}
