use anyhow::Result;
use relsync_cli::constants::{STAGING_DIR_NAME, STATE_FILE_NAME};
use relsync_cli::pipeline::{CheckOutcome, CycleOutcome};
use relsync_cli::state::StateStore;
use sha2::{Digest, Sha256};
use std::fs;
use tempfile::TempDir;

use crate::common::{
    AssetSpec, REPO, ReleaseServer, UPDATED_T1, UPDATED_T2, deployed_tree, pipeline,
    seed_destination, site_zip,
};

/// A fresh destination receives the release and a matching state record.
#[tokio::test]
async fn test_first_run_applies_release() -> Result<()> {
    let server = ReleaseServer::start().await;
    let archive = site_zip("v1.2.3");
    server.publish("v1.2.3", &[AssetSpec::new("web-app.zip", archive.clone())]).await;
    let dest = TempDir::new()?;

    let outcome = pipeline(&server, dest.path()).run_one_cycle().await?;

    let CycleOutcome::Applied {
        state,
        files_copied,
    } = outcome
    else {
        panic!("expected Applied");
    };
    assert_eq!(files_copied, 3);
    assert_eq!(state.repo, REPO);
    assert_eq!(state.tag, "v1.2.3");
    assert_eq!(state.asset_name, "web-app.zip");
    assert_eq!(state.asset_updated_at.as_deref(), Some(UPDATED_T1));
    assert_eq!(state.asset_size, Some(archive.len() as u64));
    assert_eq!(state.zip_sha256, hex::encode(Sha256::digest(&archive)));

    assert_eq!(fs::read_to_string(dest.path().join("index.html"))?, "<html>v1.2.3</html>");
    assert!(dest.path().join("assets/img/logo.svg").is_file());

    let stored = StateStore::new(dest.path().join(STATE_FILE_NAME)).load();
    assert_eq!(stored, Some(state));
    Ok(())
}

/// Running twice with no upstream change downloads once and keeps the record.
#[tokio::test]
async fn test_second_run_downloads_nothing() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.publish("v1.2.3", &[AssetSpec::new("web-app.zip", site_zip("v1.2.3"))]).await;
    let dest = TempDir::new()?;
    let pipeline = pipeline(&server, dest.path());

    pipeline.run_one_cycle().await?;
    let state_after_first = fs::read(dest.path().join(STATE_FILE_NAME))?;
    assert_eq!(server.download_count().await, 1);

    let second = pipeline.run_one_cycle().await?;
    assert!(matches!(second, CycleOutcome::UpToDate { .. }));
    assert_eq!(server.download_count().await, 1, "second run must not download");
    assert_eq!(fs::read(dest.path().join(STATE_FILE_NAME))?, state_after_first);
    Ok(())
}

/// A matching prior record means no download and no extraction at all.
#[tokio::test]
async fn test_prior_state_matching_release_is_up_to_date() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.publish("v1.2.3", &[AssetSpec::new("web-app.zip", site_zip("v1.2.3"))]).await;
    let dest = TempDir::new()?;
    fs::write(
        dest.path().join(STATE_FILE_NAME),
        format!(
            r#"{{"repo":"{REPO}","tag":"v1.2.3","asset_name":"web-app.zip",
                "asset_updated_at":"{UPDATED_T1}","asset_size":1,
                "downloaded_at":"2024-05-01T12:00:00Z","zip_sha256":"00"}}"#
        ),
    )?;

    let outcome = pipeline(&server, dest.path()).run_one_cycle().await?;

    let CycleOutcome::UpToDate {
        release,
    } = outcome
    else {
        panic!("expected UpToDate");
    };
    assert_eq!(release.tag, "v1.2.3");
    assert_eq!(server.download_count().await, 0);
    assert!(!dest.path().join(STAGING_DIR_NAME).exists());
    assert!(!dest.path().join("index.html").exists());
    Ok(())
}

/// Re-uploading an asset under the same tag is a new release.
#[tokio::test]
async fn test_reuploaded_asset_is_applied_again() -> Result<()> {
    let server = ReleaseServer::start().await;
    let dest = TempDir::new()?;
    let pipeline = pipeline(&server, dest.path());

    server.publish("v1.2.3", &[AssetSpec::new("web-app.zip", site_zip("first"))]).await;
    pipeline.run_one_cycle().await?;

    server
        .publish("v1.2.3", &[AssetSpec::new("web-app.zip", site_zip("second")).updated_at(UPDATED_T2)])
        .await;
    let outcome = pipeline.run_one_cycle().await?;

    assert!(matches!(outcome, CycleOutcome::Applied { .. }));
    assert_eq!(fs::read_to_string(dest.path().join("index.html"))?, "<html>second</html>");
    Ok(())
}

/// Files absent from the new release stay in the destination.
#[tokio::test]
async fn test_overlay_keeps_files_missing_from_release() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.publish("v2.0.0", &[AssetSpec::new("web-app.zip", site_zip("v2.0.0"))]).await;
    let dest = TempDir::new()?;
    seed_destination(dest.path());

    pipeline(&server, dest.path()).run_one_cycle().await?;

    assert_eq!(fs::read_to_string(dest.path().join("robots.txt"))?, "User-agent: *");
    assert_eq!(fs::read_to_string(dest.path().join("index.html"))?, "<html>v2.0.0</html>");
    assert_eq!(fs::read_to_string(dest.path().join("assets/app.js"))?, "console.log('app');");
    Ok(())
}

/// A staging directory left by an interrupted run does not leak into the result.
#[tokio::test]
async fn test_rerun_after_interrupted_extraction() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.publish("v1.2.3", &[AssetSpec::new("web-app.zip", site_zip("v1.2.3"))]).await;

    let clean = TempDir::new()?;
    pipeline(&server, clean.path()).run_one_cycle().await?;

    let interrupted = TempDir::new()?;
    let staging = interrupted.path().join(STAGING_DIR_NAME);
    fs::create_dir_all(staging.join("half"))?;
    fs::write(staging.join("half/written.bin"), b"partial")?;
    fs::write(staging.join("index.html"), b"<html>stale</html>")?;

    pipeline(&server, interrupted.path()).run_one_cycle().await?;

    assert_eq!(deployed_tree(interrupted.path()), deployed_tree(clean.path()));
    assert!(!staging.join("half").exists());
    Ok(())
}

/// A body shorter than the advertised size fails verification and records nothing.
#[tokio::test]
async fn test_size_mismatch_fails_verification() -> Result<()> {
    let server = ReleaseServer::start().await;
    let archive = site_zip("v1.2.3");
    let advertised = archive.len() as u64 + 10;
    server
        .publish("v1.2.3", &[AssetSpec::new("web-app.zip", archive).advertised_size(advertised)])
        .await;
    let dest = TempDir::new()?;

    let failure = pipeline(&server, dest.path()).run_one_cycle().await.unwrap_err();

    assert_eq!(failure.phase, relsync_cli::pipeline::CyclePhase::Verifying);
    assert!(matches!(failure.error, relsync_cli::core::SyncError::Protocol { .. }));
    assert!(!dest.path().join(STATE_FILE_NAME).exists());
    assert!(!dest.path().join("index.html").exists());
    Ok(())
}

/// `check` looks but never downloads or writes.
#[tokio::test]
async fn test_check_reports_without_side_effects() -> Result<()> {
    let server = ReleaseServer::start().await;
    server.publish("v1.2.3", &[AssetSpec::new("web-app.zip", site_zip("v1.2.3"))]).await;
    let dest = TempDir::new()?;
    let pipeline = pipeline(&server, dest.path());

    let outcome = pipeline.check().await?;
    let CheckOutcome::UpdateAvailable {
        release,
        previous,
    } = outcome
    else {
        panic!("expected UpdateAvailable");
    };
    assert_eq!(release.asset.name, "web-app.zip");
    assert!(previous.is_none());
    assert_eq!(server.download_count().await, 0);
    assert_eq!(fs::read_dir(dest.path())?.count(), 0);

    pipeline.run_one_cycle().await?;
    assert!(matches!(pipeline.check().await?, CheckOutcome::UpToDate { .. }));
    Ok(())
}
