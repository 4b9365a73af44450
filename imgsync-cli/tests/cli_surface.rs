use std::fs;
use std::net::TcpListener;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

const SETTING_VARS: &[&str] = &[
    "IMGSYNC_CONFIG",
    "GOOGLE_APPLICATION_CREDENTIALS",
    "TARGET_SHEETS",
    "SHEETS_RANGE",
    "RELEASE_SHEETS",
    "REGISTRY_URL",
    "ARCHIVE_PATH",
    "SCP_DEST",
    "SCP_PASS",
    "DOCKER_CRED",
    "QUAY_CRED",
    "GCR_CRED",
    "IMGSYNC_LISTEN",
    "IMGSYNC_REGISTRY_SCHEME",
    "IMGSYNC_CALL_TIMEOUT_SECS",
    "IMGSYNC_CONCURRENCY",
    "IMGSYNC_RETRIES",
];

fn imgsync_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("imgsync"));
    for var in SETTING_VARS {
        cmd.env_remove(var);
    }
    cmd
}

fn write_config(dir: &Path, credentials: &Path) -> std::path::PathBuf {
    let path = dir.join("imgsync.yaml");
    fs::write(
        &path,
        format!(
            concat!(
                "google_credentials: {}\n",
                "target_sheets: sheet-1\n",
                "release_sheets: sheet-2\n",
                "registry_url: 127.0.0.1:1\n",
                "archive_path: /var/lib/registry\n",
                "scp_dest: nas:/exports\n",
                "scp_pass: hunter2\n",
            ),
            credentials.display()
        ),
    )
    .expect("write config");
    path
}

// ---------------------------------------------------------------------------
// 1. Help
// ---------------------------------------------------------------------------

#[test]
fn help_lists_every_subcommand() {
    let assert = imgsync_cmd().arg("--help").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("stdout utf8");
    for sub in ["serve", "sync", "diff", "export", "trigger"] {
        assert!(stdout.contains(sub), "help output is missing '{sub}'");
    }
}

#[test]
fn secret_env_values_are_hidden_from_help() {
    imgsync_cmd()
        .env("SCP_PASS", "super-secret-value")
        .args(["sync", "--help"])
        .assert()
        .success()
        .stdout(contains("super-secret-value").not());
}

// ---------------------------------------------------------------------------
// 2. Configuration errors
// ---------------------------------------------------------------------------

#[test]
fn missing_settings_fail_and_name_every_key() {
    imgsync_cmd()
        .args(["sync", "--dry-run"])
        .env("REGISTRY_URL", "registry.local:5000")
        .assert()
        .failure()
        .stderr(contains("TARGET_SHEETS"))
        .stderr(contains("RELEASE_SHEETS"))
        .stderr(contains("SCP_PASS"));
}

#[test]
fn unreadable_config_file_fails() {
    let dir = TempDir::new().expect("tempdir");
    imgsync_cmd()
        .arg("--config")
        .arg(dir.path().join("absent.yaml"))
        .arg("diff")
        .assert()
        .failure()
        .stderr(contains("failed to load config"));
}

#[test]
fn missing_service_account_key_fails_setup() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(dir.path(), &dir.path().join("no-such-key.json"));
    imgsync_cmd()
        .arg("--config")
        .arg(&config)
        .args(["sync", "--dry-run"])
        .assert()
        .failure()
        .stderr(contains("failed to set up collaborators"));
}

#[test]
fn flags_override_config_file() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_config(dir.path(), &dir.path().join("no-such-key.json"));
    imgsync_cmd()
        .arg("--config")
        .arg(&config)
        .args(["--concurrency", "0", "diff"])
        .assert()
        .failure()
        .stderr(contains("IMGSYNC_CONCURRENCY"));
}

// ---------------------------------------------------------------------------
// 3. Trigger
// ---------------------------------------------------------------------------

#[test]
fn trigger_reports_unreachable_daemon() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    imgsync_cmd()
        .args(["trigger", "--url", &format!("http://127.0.0.1:{port}")])
        .assert()
        .failure()
        .stderr(contains("failed to reach daemon"));
}
