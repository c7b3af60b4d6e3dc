//! Integration tests for login/logout/whoami.

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::tempdir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn success_body() -> Value {
    json!({
        "message": "Login successful",
        "firstName": "Ada",
        "lastName": "Obi",
        "email": "ada@example.com",
        "phoneNumber": "08030000000",
        "role": "agent",
        "access_token": "eyJhbGciOiJIUzI1NiJ9.payload.sig",
        "state": "Lagos",
        "community": "north",
    })
}

/// Short redirect delay so the command exits quickly.
fn write_fast_config(home: &Path) {
    fs::write(
        home.join("config.toml"),
        "dashboard_url = \"http://dashboard.test\"\n\n[auth]\nnavigate_delay_ms = 50\n",
    )
    .unwrap();
}

fn write_session(home: &Path) {
    let doc = json!({
        "user": {
            "firstName": "Ada",
            "lastName": "Obi",
            "email": "ada@example.com",
            "phoneNumber": "08030000000",
            "role": "agent",
            "accessToken": "eyJhbGciOiJIUzI1NiJ9.payload.sig",
            "state": "Lagos",
            "community": "north",
        }
    });
    fs::write(home.join("session.json"), doc.to_string()).unwrap();
}

async fn mount_signin(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/api/signin"))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_stores_session_and_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/signin"))
        .and(body_json(json!({ "username": "ada@example.com", "password": "s3cret" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    write_fast_config(home.path());

    cargo_bin_cmd!("mamatrak")
        .env("MAMATRAK_HOME", home.path())
        .env("MAMATRAK_API_BASE_URL", format!("{}/api", server.uri()))
        .env("MAMATRAK_NO_BROWSER", "1")
        .args(["login", "--identifier", "ada@example.com"])
        .write_stdin("s3cret\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Login successful"))
        .stdout(predicate::str::contains("Signed in as Ada Obi (agent)"))
        .stdout(predicate::str::contains("Opening http://dashboard.test/dashboard"))
        .stdout(predicate::str::contains("s3cret").not());

    let stored: Value =
        serde_json::from_str(&fs::read_to_string(home.path().join("session.json")).unwrap())
            .unwrap();
    assert_eq!(
        stored["user"],
        json!({
            "firstName": "Ada",
            "lastName": "Obi",
            "email": "ada@example.com",
            "phoneNumber": "08030000000",
            "role": "agent",
            "accessToken": "eyJhbGciOiJIUzI1NiJ9.payload.sig",
            "state": "Lagos",
            "community": "north",
        })
    );
}

#[tokio::test]
async fn test_login_prompts_identifier_from_stdin() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/signin"))
        .and(body_json(json!({ "username": "08030000000", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    write_fast_config(home.path());

    cargo_bin_cmd!("mamatrak")
        .env("MAMATRAK_HOME", home.path())
        .env("MAMATRAK_API_BASE_URL", format!("{}/api", server.uri()))
        .env("MAMATRAK_NO_BROWSER", "1")
        .arg("login")
        .write_stdin(" 08030000000 \npw\n")
        .assert()
        .success();
}

#[tokio::test]
async fn test_login_over_corrupt_session_file() {
    let server = MockServer::start().await;
    mount_signin(
        &server,
        ResponseTemplate::new(200).set_body_json(success_body()),
    )
    .await;

    let home = tempdir().unwrap();
    write_fast_config(home.path());
    fs::write(home.path().join("session.json"), r#"{"user": {"firstName": "A""#).unwrap();

    cargo_bin_cmd!("mamatrak")
        .env("MAMATRAK_HOME", home.path())
        .env("MAMATRAK_API_BASE_URL", format!("{}/api", server.uri()))
        .env("MAMATRAK_NO_BROWSER", "1")
        .args(["login", "--identifier", "ada@example.com"])
        .write_stdin("s3cret\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Login successful"));

    let stored: Value =
        serde_json::from_str(&fs::read_to_string(home.path().join("session.json")).unwrap())
            .unwrap();
    assert_eq!(stored["user"]["accessToken"], "eyJhbGciOiJIUzI1NiJ9.payload.sig");
}

/// Ctrl+C during the redirect wait cancels the redirect and exits 130.
#[cfg(unix)]
#[tokio::test]
async fn test_interrupt_during_redirect_wait_exits_130() {
    let server = MockServer::start().await;
    mount_signin(
        &server,
        ResponseTemplate::new(200).set_body_json(success_body()),
    )
    .await;

    let home = tempdir().unwrap();
    fs::write(
        home.path().join("config.toml"),
        "dashboard_url = \"http://dashboard.test\"\n\n[auth]\nnavigate_delay_ms = 60000\n",
    )
    .unwrap();

    let mut child = Command::new(env!("CARGO_BIN_EXE_mamatrak"))
        .env("MAMATRAK_HOME", home.path())
        .env("MAMATRAK_API_BASE_URL", format!("{}/api", server.uri()))
        .env("MAMATRAK_NO_BROWSER", "1")
        .args(["login", "--identifier", "ada@example.com"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn command");

    child
        .stdin
        .take()
        .expect("Failed to open stdin")
        .write_all(b"s3cret\n")
        .expect("Failed to write to stdin");

    let mut stdout = BufReader::new(child.stdout.take().expect("Failed to open stdout"));
    let mut seen = String::new();
    loop {
        let mut line = String::new();
        let read = stdout.read_line(&mut line).expect("Failed to read stdout");
        assert!(read > 0, "exited before the redirect wait: {seen}");
        seen.push_str(&line);
        if line.starts_with("Redirecting to") {
            break;
        }
    }

    // Let the signal listener install before interrupting.
    thread::sleep(Duration::from_millis(300));
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("Failed to run kill");
    assert!(status.success());

    stdout.read_to_string(&mut seen).expect("Failed to read stdout");
    let status = child.wait().expect("Failed to wait for command");

    assert_eq!(status.code(), Some(130), "stdout: {seen}");
    assert!(!seen.contains("Opening"));
    assert!(home.path().join("session.json").exists());
}

#[tokio::test]
async fn test_login_rejected_shows_server_message() {
    let server = MockServer::start().await;
    mount_signin(
        &server,
        ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid username or password" })),
    )
    .await;

    let home = tempdir().unwrap();
    write_fast_config(home.path());

    cargo_bin_cmd!("mamatrak")
        .env("MAMATRAK_HOME", home.path())
        .env("MAMATRAK_API_BASE_URL", format!("{}/api", server.uri()))
        .env("MAMATRAK_NO_BROWSER", "1")
        .args(["login", "--identifier", "ada@example.com"])
        .write_stdin("wrong\n")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid username or password"))
        .stdout(predicate::str::contains("Opening").not());

    assert!(!home.path().join("session.json").exists());
}

#[tokio::test]
async fn test_login_server_error_shows_fallback() {
    let server = MockServer::start().await;
    mount_signin(&server, ResponseTemplate::new(500)).await;

    let home = tempdir().unwrap();
    write_fast_config(home.path());

    cargo_bin_cmd!("mamatrak")
        .env("MAMATRAK_HOME", home.path())
        .env("MAMATRAK_API_BASE_URL", format!("{}/api", server.uri()))
        .args(["login", "--identifier", "ada@example.com"])
        .write_stdin("pw\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid credentials"));

    assert!(!home.path().join("session.json").exists());
}

#[test]
fn test_login_empty_password_sends_nothing() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("mamatrak")
        .env("MAMATRAK_HOME", home.path())
        .env("MAMATRAK_API_BASE_URL", "http://127.0.0.1:9/api")
        .args(["login", "--identifier", "ada@example.com"])
        .write_stdin("\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Password is required"));
}

#[test]
fn test_logout_removes_session() {
    let home = tempdir().unwrap();
    write_session(home.path());

    cargo_bin_cmd!("mamatrak")
        .env("MAMATRAK_HOME", home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Signed out"));

    let stored: Value =
        serde_json::from_str(&fs::read_to_string(home.path().join("session.json")).unwrap())
            .unwrap();
    assert!(stored.get("user").is_none());
}

#[test]
fn test_logout_when_not_signed_in() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("mamatrak")
        .env("MAMATRAK_HOME", home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));
}

#[test]
fn test_whoami_masks_token() {
    let home = tempdir().unwrap();
    write_session(home.path());

    cargo_bin_cmd!("mamatrak")
        .env("MAMATRAK_HOME", home.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ada Obi (agent)"))
        .stdout(predicate::str::contains("Community: north, Lagos"))
        .stdout(predicate::str::contains("eyJhbGciOiJI..."))
        .stdout(predicate::str::contains("payload.sig").not());
}

#[test]
fn test_whoami_when_not_signed_in() {
    let home = tempdir().unwrap();

    cargo_bin_cmd!("mamatrak")
        .env("MAMATRAK_HOME", home.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in."));
}
