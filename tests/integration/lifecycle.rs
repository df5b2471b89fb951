#[path = "common/mod.rs"]
mod common;

use std::time::Duration;

use tempfile::tempdir;
use warden::{config::RegistryConfig, registry::Registry};

#[test]
fn stop_confirms_termination_within_the_grace_period() {
    let temp = tempdir().unwrap();
    let registry = Registry::new();

    registry
        .add_process("sleeper", "sleep 30", temp.path(), "", None)
        .unwrap();
    assert!(common::snapshot_of(&registry, "sleeper").is_running);

    registry.stop_process("sleeper").unwrap();

    let snapshot = common::snapshot_of(&registry, "sleeper");
    assert!(!snapshot.is_running);
    assert!(snapshot.pid.is_none());
    // A requested stop is not a failure.
    assert!(snapshot.error.is_none());
}

#[test]
fn stop_is_idempotent() {
    let temp = tempdir().unwrap();
    let registry = Registry::new();

    registry
        .add_process("sleeper", "sleep 30", temp.path(), "", None)
        .unwrap();
    registry.stop_process("sleeper").unwrap();
    registry.stop_process("sleeper").unwrap();

    assert!(!common::snapshot_of(&registry, "sleeper").is_running);
}

#[test]
fn restart_advances_last_started() {
    let temp = tempdir().unwrap();
    let registry = Registry::new();

    registry
        .add_process("sleeper", "sleep 30", temp.path(), "", None)
        .unwrap();
    let first = common::snapshot_of(&registry, "sleeper")
        .last_started
        .unwrap();
    let first_pid = common::snapshot_of(&registry, "sleeper").pid.unwrap();

    registry.restart_process("sleeper").unwrap();

    let snapshot = common::snapshot_of(&registry, "sleeper");
    assert!(snapshot.is_running);
    assert!(snapshot.last_started.unwrap() > first);
    assert_ne!(snapshot.pid.unwrap(), first_pid);

    registry.stop_process("sleeper").unwrap();
}

#[test]
fn restart_starts_a_stopped_process() {
    let temp = tempdir().unwrap();
    let registry = Registry::new();

    registry
        .add_process("sleeper", "sleep 30", temp.path(), "", None)
        .unwrap();
    registry.stop_process("sleeper").unwrap();

    registry.restart_process("sleeper").unwrap();
    assert!(common::snapshot_of(&registry, "sleeper").is_running);

    registry.stop_process("sleeper").unwrap();
}

#[test]
fn abnormal_exit_is_observed_and_recorded() {
    let temp = tempdir().unwrap();
    common::write_script(temp.path(), "crash.sh", "exit 3\n");
    let registry = Registry::new();

    registry
        .add_process("crasher", "sh crash.sh", temp.path(), "", None)
        .unwrap();

    assert!(common::wait_for_running(&registry, "crasher", false));

    let snapshot = common::snapshot_of(&registry, "crasher");
    assert!(snapshot.pid.is_none());
    assert!(snapshot.error.is_some());
}

#[test]
fn clean_exit_is_observed_without_an_error() {
    let temp = tempdir().unwrap();
    let registry = Registry::new();

    registry
        .add_process("oneshot", "true", temp.path(), "", None)
        .unwrap();

    assert!(common::wait_for_running(&registry, "oneshot", false));

    let snapshot = common::snapshot_of(&registry, "oneshot");
    assert!(snapshot.error.is_none());
}

#[test]
fn restart_recovers_a_crashed_process() {
    let temp = tempdir().unwrap();
    common::write_script(temp.path(), "crash.sh", "exit 3\n");
    let registry = Registry::new();

    registry
        .add_process("crasher", "sh crash.sh", temp.path(), "", None)
        .unwrap();
    assert!(common::wait_for_running(&registry, "crasher", false));
    assert!(common::snapshot_of(&registry, "crasher").error.is_some());

    // The script exits again immediately, but the restart itself must
    // succeed and clear the previous error while it briefly runs.
    registry.restart_process("crasher").unwrap();
    assert!(common::wait_for_running(&registry, "crasher", false));
}

#[test]
fn command_line_is_split_on_whitespace() {
    let temp = tempdir().unwrap();
    let registry = Registry::new();

    // No shell is involved: each whitespace-separated token becomes one
    // argument of the exec'd program.
    registry
        .add_process("echoer", "echo one two three", temp.path(), "", None)
        .unwrap();

    assert!(common::wait_until(Duration::from_secs(5), || {
        !registry.process_logs("echoer").unwrap().is_empty()
    }));

    let logs = registry.process_logs("echoer").unwrap();
    assert_eq!(logs[0].message, "one two three");
}

#[test]
fn stdout_and_stderr_are_captured_separately() {
    let temp = tempdir().unwrap();
    common::write_script(
        temp.path(),
        "talker.sh",
        "echo out-one\necho out-two\necho err-one >&2\nsleep 30\n",
    );
    let registry = Registry::new();

    registry
        .add_process("talker", "sh talker.sh", temp.path(), "", None)
        .unwrap();

    assert!(common::wait_until(Duration::from_secs(5), || {
        registry.process_logs("talker").unwrap().len() >= 2
            && registry.process_errors("talker").unwrap().len() >= 1
    }));

    // Snapshots are newest-first.
    let logs = registry.process_logs("talker").unwrap();
    let messages: Vec<_> = logs.iter().map(|item| item.message.as_str()).collect();
    assert_eq!(messages, ["out-two", "out-one"]);
    assert!(logs[0].time > logs[1].time);

    let errors = registry.process_errors("talker").unwrap();
    assert_eq!(errors[0].message, "err-one");

    registry.stop_process("talker").unwrap();
}

#[test]
fn stubborn_process_is_killed_after_the_grace_period() {
    let temp = tempdir().unwrap();
    common::write_script(
        temp.path(),
        "stubborn.sh",
        "trap '' TERM\necho ready\nwhile true; do sleep 1; done\n",
    );

    let registry = Registry::with_config(RegistryConfig {
        stop_grace: Duration::from_millis(300),
        ..RegistryConfig::default()
    });

    registry
        .add_process("stubborn", "sh stubborn.sh", temp.path(), "", None)
        .unwrap();

    // Wait for the trap to be installed before asking it to stop.
    assert!(common::wait_until(Duration::from_secs(5), || {
        !registry.process_logs("stubborn").unwrap().is_empty()
    }));

    registry.stop_process("stubborn").unwrap();
    assert!(common::wait_for_running(&registry, "stubborn", false));
}
