//! CLI behavior tests.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_describes_the_tool() {
    Command::cargo_bin("agentcert")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("self-signed"));
}

#[test]
fn inverted_validity_window_fails_without_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let key = dir.path().join("key.pem");
    let cert = dir.path().join("cert.pem");

    Command::cargo_bin("agentcert")
        .expect("binary")
        .args([
            "--key",
            key.to_str().expect("utf8 path"),
            "--cert",
            cert.to_str().expect("utf8 path"),
            "--start-days",
            "10",
            "--end-days",
            "5",
            "--hostname",
            "agentbox",
            "--domain",
            "example.com",
            "--seed-file",
            dir.path().join("seed.rnd").to_str().expect("utf8 path"),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("validity window"));

    assert!(!key.exists());
    assert!(!cert.exists());
}

#[test]
fn zero_bits_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");

    Command::cargo_bin("agentcert")
        .expect("binary")
        .args([
            "--key",
            dir.path().join("key.pem").to_str().expect("utf8 path"),
            "--cert",
            dir.path().join("cert.pem").to_str().expect("utf8 path"),
            "--hostname",
            "agentbox",
            "--domain",
            "example.com",
            "--bits",
            "0",
            "--seed-file",
            dir.path().join("seed.rnd").to_str().expect("utf8 path"),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("key length"));
}
