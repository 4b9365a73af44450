use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use imgsync_core::{ImageRef, ImageTransport, Secret, TransportError, Uploader, VendorCredentials};
use imgsync_sources::{CredentialProfiles, DockerPushTransport, ScpUploader, SkopeoTransport};
use tempfile::TempDir;

/// Write an executable shell script that appends its argv to `calls.log`.
fn stub(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    let log = dir.path().join("calls.log");
    let script = format!(
        "#!/bin/sh\nprintf '%s\\n' \"$*\" >> '{}'\n{body}\n",
        log.display()
    );
    std::fs::write(&path, script).expect("write stub");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod stub");
    path
}

fn calls(dir: &TempDir) -> Vec<String> {
    std::fs::read_to_string(dir.path().join("calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn profiles(docker: Option<&str>) -> CredentialProfiles {
    CredentialProfiles::new(&VendorCredentials {
        docker: docker.map(Secret::new),
        ..Default::default()
    })
    .expect("profiles")
}

// ---------------------------------------------------------------------------
// 1. skopeo
// ---------------------------------------------------------------------------

#[tokio::test]
async fn skopeo_copy_and_delete_invoke_the_tool() {
    let dir = TempDir::new().expect("tmp");
    let program = stub(&dir, "skopeo", "echo done");
    let transport = SkopeoTransport::new("reg:5000", profiles(None)).with_program(&program);

    let out = transport.copy(&ImageRef::parse("nginx:1.25")).await.expect("copy");
    assert!(out.contains("done"));
    transport.delete(&ImageRef::parse("nginx:1.24")).await.expect("delete");

    assert_eq!(
        calls(&dir),
        vec![
            "copy --dest-tls-verify=false docker://nginx:1.25 docker://reg:5000/nginx:1.25",
            "delete --tls-verify=false docker://reg:5000/nginx:1.24",
        ]
    );
}

#[tokio::test]
async fn skopeo_missing_manifest_is_not_found() {
    let dir = TempDir::new().expect("tmp");
    let program = stub(
        &dir,
        "skopeo",
        "echo 'Error: Image may not exist or is not stored with a v2 Schema in a v2 registry' >&2; exit 1",
    );
    let transport = SkopeoTransport::new("reg:5000", profiles(None)).with_program(&program);

    let err = transport
        .delete(&ImageRef::parse("gone:1"))
        .await
        .expect_err("delete fails");
    assert!(matches!(err, TransportError::NotFound { .. }));
}

#[tokio::test]
async fn skopeo_other_failure_keeps_output() {
    let dir = TempDir::new().expect("tmp");
    let program = stub(&dir, "skopeo", "echo 'connection refused' >&2; exit 2");
    let transport = SkopeoTransport::new("reg:5000", profiles(None)).with_program(&program);

    match transport.copy(&ImageRef::parse("app:1")).await {
        Err(TransportError::Failed { output, reason }) => {
            assert!(output.contains("connection refused"));
            assert_eq!(reason, "skopeo exit status 2");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn missing_binary_is_a_failure_not_a_panic() {
    let transport = SkopeoTransport::new("reg:5000", profiles(None))
        .with_program("/nonexistent/skopeo");
    let err = transport.copy(&ImageRef::parse("app:1")).await.expect_err("spawn fails");
    assert!(matches!(err, TransportError::Failed { .. }));
}

// ---------------------------------------------------------------------------
// 2. docker push
// ---------------------------------------------------------------------------

#[tokio::test]
async fn docker_push_logs_in_then_pulls_tags_and_pushes() {
    let dir = TempDir::new().expect("tmp");
    let stdin_log = dir.path().join("stdin.log");
    let program = stub(
        &dir,
        "docker",
        &format!("if [ \"$1\" = login ]; then cat > '{}'; fi", stdin_log.display()),
    );
    let transport =
        DockerPushTransport::new("reg:5000", profiles(Some("hub:pw"))).with_program(&program);

    transport.copy(&ImageRef::parse("nginx:1.25")).await.expect("push");

    assert_eq!(
        calls(&dir),
        vec![
            "login --username hub --password-stdin docker.io",
            "pull nginx:1.25",
            "tag nginx:1.25 reg:5000/nginx:1.25",
            "push reg:5000/nginx:1.25",
        ]
    );
    assert_eq!(std::fs::read_to_string(stdin_log).expect("stdin"), "pw");
}

#[tokio::test]
async fn docker_push_stops_at_the_first_failing_step() {
    let dir = TempDir::new().expect("tmp");
    let program = stub(&dir, "docker", "if [ \"$1\" = tag ]; then exit 1; fi");
    let transport = DockerPushTransport::new("reg:5000", profiles(None)).with_program(&program);

    let err = transport.copy(&ImageRef::parse("app:1")).await.expect_err("tag fails");
    assert!(matches!(
        err,
        TransportError::Failed { ref reason, .. } if reason.starts_with("docker tag")
    ));
    assert_eq!(calls(&dir).len(), 2);

    let err = transport.delete(&ImageRef::parse("app:1")).await.expect_err("unsupported");
    assert!(matches!(err, TransportError::Failed { .. }));
}

// ---------------------------------------------------------------------------
// 3. scp
// ---------------------------------------------------------------------------

fn archive(dir: &TempDir) -> PathBuf {
    let file = dir.path().join("20261014-120000.tar.gz");
    std::fs::write(&file, b"gz").expect("write archive");
    file
}

#[tokio::test]
async fn scp_passes_password_through_env_only() {
    let dir = TempDir::new().expect("tmp");
    let env_log = dir.path().join("env.log");
    let program = stub(&dir, "sshpass", &format!("echo \"$SSHPASS\" > '{}'", env_log.display()));
    let file = archive(&dir);

    let uploader =
        ScpUploader::new("backup@nas:/exports", Secret::new("hunter2")).with_program(&program);
    let location = uploader.upload(&file).await.expect("upload");

    assert_eq!(location, "backup@nas:/exports/20261014-120000.tar.gz");
    let argv = calls(&dir).join("\n");
    assert!(argv.starts_with("-e scp"));
    assert!(argv.contains(&file.display().to_string()));
    assert!(!argv.contains("hunter2"));
    assert_eq!(std::fs::read_to_string(env_log).expect("env").trim(), "hunter2");
}

#[tokio::test]
async fn scp_failure_is_reported() {
    let dir = TempDir::new().expect("tmp");
    let program = stub(&dir, "sshpass", "echo 'Permission denied' >&2; exit 5");
    let file = archive(&dir);

    let uploader =
        ScpUploader::new("backup@nas:/exports", Secret::new("pw")).with_program(&program);
    let err = uploader.upload(&file).await.expect_err("upload fails");
    assert!(err.to_string().contains("Permission denied"));
}
