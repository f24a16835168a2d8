use anyhow::Result;
use relsync_cli::constants::STATE_FILE_NAME;
use relsync_cli::pipeline::Scheduler;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::ResponseTemplate;

use crate::common::{AssetSpec, ReleaseServer, pipeline, site_zip, zip_bytes};

/// Resolves once `path` exists.
async fn appears(path: PathBuf) {
    while !path.exists() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Single-run mode runs exactly one cycle, even when it fails.
#[tokio::test]
async fn test_once_runs_a_single_failing_cycle() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.respond_latest(ResponseTemplate::new(502)).await;
    let dest = TempDir::new()?;

    let summary = Scheduler::new(Duration::from_secs(3600), true)
        .run(&pipeline(&server, dest.path()), std::future::pending())
        .await;

    assert_eq!(summary.cycles, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.applied, 0);
    assert_eq!(server.lookup_count().await, 1);
    Ok(())
}

/// Shutdown during the wait between cycles ends the loop without another cycle.
#[tokio::test]
async fn test_shutdown_while_waiting_stops_the_loop() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.publish("v1.2.3", &[AssetSpec::new("web-app.zip", site_zip("v1.2.3"))]).await;
    let dest = TempDir::new()?;

    let summary = Scheduler::new(Duration::from_secs(3600), false)
        .run(&pipeline(&server, dest.path()), appears(dest.path().join(STATE_FILE_NAME)))
        .await;

    assert_eq!(summary.cycles, 1);
    assert_eq!(summary.applied, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(server.lookup_count().await, 1);
    Ok(())
}

/// A shutdown that is already pending lets the running cycle finish first.
#[tokio::test]
async fn test_shutdown_does_not_interrupt_a_running_cycle() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.publish("v1.2.3", &[AssetSpec::new("web-app.zip", site_zip("v1.2.3"))]).await;
    let dest = TempDir::new()?;

    let summary = Scheduler::new(Duration::from_secs(3600), false)
        .run(&pipeline(&server, dest.path()), std::future::ready(()))
        .await;

    assert_eq!(summary.cycles, 1);
    assert_eq!(summary.applied, 1);
    assert!(dest.path().join(STATE_FILE_NAME).is_file());
    assert!(dest.path().join("index.html").is_file());
    Ok(())
}

/// Failed cycles do not stop the loop; the next one runs after the interval.
#[tokio::test]
async fn test_failed_cycle_is_followed_by_another() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.respond_latest(ResponseTemplate::new(500)).await;
    let dest = TempDir::new()?;
    let pipeline = pipeline(&server, dest.path());

    let summary = Scheduler::new(Duration::ZERO, false)
        .run(&pipeline, tokio::time::sleep(Duration::from_millis(2500)))
        .await;

    assert!(summary.cycles >= 2, "expected a retry, got {summary:?}");
    assert!(summary.failed >= 2);
    Ok(())
}

/// An archive problem recurs every cycle, but the loop keeps polling anyway.
#[tokio::test]
async fn test_archive_failure_keeps_the_loop_running() -> Result<()> {
    let server = ReleaseServer::start().await;
    let archive = zip_bytes(&[("readme.txt", b"no marker")]);
    server.publish("v1.2.3", &[AssetSpec::new("web-app.zip", archive)]).await;
    let dest = TempDir::new()?;

    let summary = Scheduler::new(Duration::ZERO, false)
        .run(&pipeline(&server, dest.path()), tokio::time::sleep(Duration::from_millis(1500)))
        .await;

    assert!(summary.cycles >= 2, "expected a second cycle, got {summary:?}");
    assert_eq!(summary.failed, summary.cycles);
    assert!(!dest.path().join(STATE_FILE_NAME).exists());
    Ok(())
}
