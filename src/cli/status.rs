//! `relsync status`: show what is applied in a destination.

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

use crate::archive::list_files;
use crate::config::SyncConfig;
use crate::constants::{DEFAULT_MARKER_FILE, DOWNLOAD_FILE_NAME, STAGING_DIR_NAME, STATE_FILE_NAME};
use crate::state::{AppliedState, StateStore};

/// Output format for `relsync status`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// A single JSON object
    Json,
}

/// Show the applied release and a summary of the destination.
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Directory to inspect [default: from config, else current directory]
    #[arg(long, value_name = "DIR")]
    pub dest: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    destination: PathBuf,
    applied: Option<AppliedState>,
    deployed_files: usize,
    marker_present: bool,
}

impl StatusCommand {
    pub async fn execute(self, file: &SyncConfig) -> Result<()> {
        let destination = file.resolve_destination(self.dest.as_deref())?;
        let marker = file.marker_file.as_deref().unwrap_or(DEFAULT_MARKER_FILE);
        let report = build_report(&destination, Path::new(marker))?;

        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&report)
                    .context("Failed to serialize status report")?;
                println!("{json}");
            }
            OutputFormat::Text => print_text(&report),
        }
        Ok(())
    }
}

fn build_report(destination: &Path, marker: &Path) -> Result<StatusReport> {
    let applied = StateStore::new(destination.join(STATE_FILE_NAME)).load();

    let deployed_files = if destination.is_dir() {
        list_files(destination)?.iter().filter(|rel| !is_working_file(rel)).count()
    } else {
        0
    };

    Ok(StatusReport {
        destination: destination.to_path_buf(),
        applied,
        deployed_files,
        marker_present: destination.join(marker).is_file(),
    })
}

/// Whether `relative` is one of relsync's own files rather than deployed content.
fn is_working_file(relative: &Path) -> bool {
    match relative.components().next() {
        Some(Component::Normal(first)) => {
            first == STATE_FILE_NAME
                || first == STAGING_DIR_NAME
                || first == DOWNLOAD_FILE_NAME
                || Path::new(first) == Path::new(STATE_FILE_NAME).with_extension("tmp")
        }
        _ => false,
    }
}

fn print_text(report: &StatusReport) {
    println!("Destination: {}", report.destination.display());
    match &report.applied {
        Some(state) => {
            println!("Repository:  {}", state.repo);
            println!("Release:     {}", state.tag.green());
            println!("Asset:       {}", state.asset_name);
            if let Some(updated_at) = &state.asset_updated_at {
                println!("Uploaded:    {updated_at}");
            }
            println!("Applied at:  {}", state.downloaded_at.to_rfc3339());
            println!("SHA-256:     {}", state.zip_sha256);
        }
        None => println!("{}", "No release applied yet".yellow()),
    }
    println!("Files:       {}", report.deployed_files);
    if !report.marker_present {
        println!("{}", "Marker file missing from destination".yellow());
    }
}
