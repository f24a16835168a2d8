//! Tests for the `relsync` binary.
//!
//! Every command runs with `RELSYNC_CONFIG` pointing at a path inside the
//! test's temp dir and with token variables removed, so the developer's own
//! configuration never leaks in.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use relsync_cli::constants::STATE_FILE_NAME;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{AssetSpec, REPO, ReleaseServer, site_zip};

fn relsync(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("relsync").unwrap();
    cmd.env("RELSYNC_CONFIG", config_dir.join("config.toml"))
        .env_remove("GITHUB_TOKEN")
        .env_remove("GH_TOKEN")
        .env_remove("RUST_LOG")
        .arg("--no-progress");
    cmd
}

fn sync_args(server: &str, dest: &Path) -> Vec<String> {
    vec![
        "sync".to_string(),
        "--repo".to_string(),
        REPO.to_string(),
        "--api-base".to_string(),
        server.to_string(),
        "--dest".to_string(),
        dest.display().to_string(),
        "--timeout-seconds".to_string(),
        "5".to_string(),
        "--once".to_string(),
    ]
}

#[test]
fn test_help_lists_commands() {
    let temp = TempDir::new().unwrap();
    relsync(temp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_status_of_empty_directory() {
    let temp = TempDir::new().unwrap();
    relsync(temp.path())
        .args(["status", "--dest"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No release applied yet"));
}

#[test]
fn test_sync_without_repository_fails() {
    let temp = TempDir::new().unwrap();
    relsync(temp.path())
        .args(["sync", "--once", "--dest"])
        .arg(temp.path().join("site"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("repository"));
}

#[test]
fn test_sync_with_malformed_repository_fails() {
    let temp = TempDir::new().unwrap();
    relsync(temp.path())
        .args(["sync", "--once", "--repo", "not-a-repo", "--dest"])
        .arg(temp.path().join("site"))
        .assert()
        .failure()
        .code(1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sync_once_applies_release() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.publish("v1.2.3", &[AssetSpec::new("web-app.zip", site_zip("v1.2.3"))]).await;
    let temp = TempDir::new()?;
    let dest = temp.path().join("site");

    relsync(temp.path()).args(sync_args(&server.uri(), &dest)).assert().success();

    assert_eq!(std::fs::read_to_string(dest.join("index.html"))?, "<html>v1.2.3</html>");
    assert!(dest.join(STATE_FILE_NAME).is_file());

    relsync(temp.path())
        .args(["status", "--format", "json", "--dest"])
        .arg(&dest)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tag\": \"v1.2.3\""))
        .stdout(predicate::str::contains("\"deployed_files\": 3"));
    Ok(())
}

/// A failed cycle in single-run mode still exits 0.
#[tokio::test(flavor = "multi_thread")]
async fn test_sync_once_failure_exits_zero() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.respond_latest(ResponseTemplate::new(500).set_body_string("boom")).await;
    let temp = TempDir::new()?;
    let dest = temp.path().join("site");

    relsync(temp.path())
        .args(sync_args(&server.uri(), &dest))
        .assert()
        .success()
        .stderr(predicate::str::contains("checking"));

    assert!(dest.is_dir(), "destination is created before the first cycle");
    assert!(!dest.join(STATE_FILE_NAME).exists());
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_check_reports_update_and_writes_nothing() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.publish("v1.2.3", &[AssetSpec::new("web-app.zip", site_zip("v1.2.3"))]).await;
    let temp = TempDir::new()?;
    let dest = temp.path().join("site");

    relsync(temp.path())
        .args(["check", "--repo", REPO, "--api-base", &server.uri(), "--dest"])
        .arg(&dest)
        .assert()
        .success()
        .stdout(predicate::str::contains("Update available"))
        .stdout(predicate::str::contains("v1.2.3"));

    assert!(!dest.exists());
    assert_eq!(server.download_count().await, 0);
    Ok(())
}

/// Repository and destination can come from the config file.
#[tokio::test(flavor = "multi_thread")]
async fn test_config_file_supplies_settings() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.publish("v3.0.0", &[AssetSpec::new("site-bundle.zip", site_zip("v3.0.0"))]).await;
    let temp = TempDir::new()?;
    let dest = temp.path().join("from-config");
    std::fs::write(
        temp.path().join("config.toml"),
        format!(
            "repo = \"{REPO}\"\napi_base = \"{}\"\ndestination = '{}'\nasset_pattern = '^site-.*\\.zip$'\n",
            server.uri(),
            dest.display()
        ),
    )?;

    relsync(temp.path()).args(["sync", "--once"]).assert().success();

    assert_eq!(std::fs::read_to_string(dest.join("index.html"))?, "<html>v3.0.0</html>");
    Ok(())
}

/// `GH_TOKEN` is used when `GITHUB_TOKEN` is absent.
#[tokio::test(flavor = "multi_thread")]
async fn test_gh_token_is_sent_as_bearer() -> Result<()> {
    let server = ReleaseServer::start().await;
    Mock::given(method("GET"))
        .and(path(ReleaseServer::latest_path(REPO)))
        .and(header("authorization", "Bearer from-gh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "tag_name": "v1.0.0",
            "assets": [],
        })))
        .expect(1)
        .mount(&server.server)
        .await;
    let temp = TempDir::new()?;

    relsync(temp.path())
        .env("GH_TOKEN", "from-gh")
        .args(["check", "--repo", REPO, "--api-base", &server.uri(), "--dest"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("v1.0.0"));
    Ok(())
}
