use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn help_lists_the_tail_command() {
    Command::cargo_bin("warden")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("tail"));
}

#[test]
fn tail_requires_an_id() {
    Command::cargo_bin("warden")
        .unwrap()
        .arg("tail")
        .assert()
        .failure()
        .stderr(contains("--id"));
}

#[test]
fn invalid_interval_is_rejected() {
    Command::cargo_bin("warden")
        .unwrap()
        .args(["tail", "--id", "web", "--interval", "soon"])
        .assert()
        .failure();
}

#[test]
fn unreachable_endpoint_terminates_the_client() {
    // Nothing listens on port 9; the first failed fetch must end the loop.
    Command::cargo_bin("warden")
        .unwrap()
        .args([
            "tail",
            "--id",
            "web",
            "--url",
            "http://127.0.0.1:9",
            "--interval",
            "10ms",
        ])
        .assert()
        .failure();
}
