//! relsync CLI entry point
//!
//! Parses arguments, runs the command, and renders any failure with
//! context and a suggestion. Failed sync cycles are not failures of the
//! command: they are logged and the process still exits 0.

use anyhow::Result;
use clap::Parser;
use relsync_cli::cli;
use relsync_cli::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
