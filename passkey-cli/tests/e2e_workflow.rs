//! End-to-end workflow tests for passkey-cli.
//!
//! Each test starts an in-process passkey server on an ephemeral port and
//! drives it with the real binary.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use passkey_server::{create_router, AppState, WebAuthnConfig};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Client data must carry an origin the default relying party accepts.
const ORIGIN: &str = "http://localhost:8080";

/// Get a Command for the passkey binary.
fn passkey() -> Command {
    cargo_bin_cmd!("passkey").into()
}

/// Serve the default configuration (demo user "test") and return its URL.
async fn spawn_server() -> String {
    let state = AppState::from_config(&WebAuthnConfig::default()).unwrap();
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// Run the binary off the async runtime, returning (exit code, stdout, stderr).
async fn run(args: Vec<String>) -> (i32, String, String) {
    tokio::task::spawn_blocking(move || {
        let output = passkey().arg("--color").arg("never").args(&args).output().unwrap();
        (
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stdout).into_owned(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        )
    })
    .await
    .unwrap()
}

fn ceremony_args(command: &str, server: &str, user: &str, key: &Path) -> Vec<String> {
    vec![
        command.to_string(),
        "--server".to_string(),
        server.to_string(),
        "--origin".to_string(),
        ORIGIN.to_string(),
        "--user".to_string(),
        user.to_string(),
        "--key".to_string(),
        key.display().to_string(),
    ]
}

// ============================================================================
// Complete Workflow Tests: Register → Login
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn test_e2e_register_then_login_twice() {
    let server = spawn_server().await;
    let temp = TempDir::new().unwrap();
    let key = temp.path().join("test.key.json");

    let (code, stdout, stderr) = run(ceremony_args("register", &server, "test", &key)).await;
    assert_eq!(code, 0, "{stderr}");
    assert!(stdout.contains("Passkey registered"));
    assert!(key.exists(), "Key file should exist after registering");

    for expected in ["Counter: 1", "Counter: 2"] {
        let (code, stdout, stderr) = run(ceremony_args("login", &server, "test", &key)).await;
        assert_eq!(code, 0, "{stderr}");
        assert!(stdout.contains("Login verified"));
        assert!(stdout.contains(expected), "{stdout}");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_e2e_eddsa_packed_registration() {
    let server = spawn_server().await;
    let temp = TempDir::new().unwrap();
    let key = temp.path().join("test.key.json");

    let mut args = ceremony_args("register", &server, "test", &key);
    args.extend(["--alg", "eddsa", "--attestation", "packed"].map(String::from));
    let (code, stdout, stderr) = run(args).await;
    assert_eq!(code, 0, "{stderr}");
    assert!(stdout.contains("EdDSA"));

    let (code, _, stderr) = run(ceremony_args("login", &server, "test", &key)).await;
    assert_eq!(code, 0, "{stderr}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_e2e_cloned_key_detected() {
    let server = spawn_server().await;
    let temp = TempDir::new().unwrap();
    let key = temp.path().join("test.key.json");
    let clone = temp.path().join("clone.key.json");

    let (code, _, stderr) = run(ceremony_args("register", &server, "test", &key)).await;
    assert_eq!(code, 0, "{stderr}");
    fs::copy(&key, &clone).unwrap();

    let (code, _, stderr) = run(ceremony_args("login", &server, "test", &key)).await;
    assert_eq!(code, 0, "{stderr}");

    // The copy still holds the old counter
    let (code, _, stderr) = run(ceremony_args("login", &server, "test", &clone)).await;
    assert_eq!(code, 65);
    assert!(stderr.contains("COUNTER_REGRESSION"), "{stderr}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_e2e_rejections_exit_65() {
    let server = spawn_server().await;
    let temp = TempDir::new().unwrap();
    let key = temp.path().join("test.key.json");

    // Unknown user
    let (code, _, stderr) = run(ceremony_args("register", &server, "nobody", &key)).await;
    assert_eq!(code, 65);
    assert!(stderr.contains("USER_NOT_FOUND"), "{stderr}");
    assert!(!key.exists());

    // Origin the relying party does not accept
    let mut args = ceremony_args("register", &server, "test", &key);
    args[4] = "http://evil.localhost.example".to_string();
    let (code, _, stderr) = run(args).await;
    assert_eq!(code, 65);
    assert!(stderr.contains("ORIGIN_MISMATCH"), "{stderr}");
    assert!(!key.exists());
}
