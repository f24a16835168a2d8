//! `relsync check`: report whether a newer release exists.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{TargetArgs, build_pipeline};
use crate::config::SyncConfig;
use crate::pipeline::CheckOutcome;

/// Compare the latest release with the applied state.
///
/// Makes one request to the release index; downloads nothing and writes
/// nothing.
#[derive(Args, Debug)]
pub struct CheckCommand {
    #[command(flatten)]
    pub target: TargetArgs,
}

impl CheckCommand {
    pub async fn execute(self, file: &SyncConfig) -> Result<()> {
        let settings = file.resolve(&self.target.overrides())?;
        let token = self.target.token();
        let pipeline = build_pipeline(&settings, token.as_deref(), false)?;

        match pipeline.check().await? {
            CheckOutcome::UpToDate {
                release,
            } => {
                println!(
                    "{} {} ({})",
                    "Up to date:".green(),
                    release.tag,
                    release.asset.name
                );
            }
            CheckOutcome::UpdateAvailable {
                release,
                previous,
            } => {
                println!(
                    "{} {} ({})",
                    "Update available:".yellow(),
                    release.tag,
                    release.asset.name
                );
                match previous {
                    Some(state) => println!("Applied: {} ({})", state.tag, state.asset_name),
                    None => println!("Applied: nothing yet"),
                }
                println!("Run `relsync sync --once` to apply it");
            }
        }
        Ok(())
    }
}
