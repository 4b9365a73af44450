//! `imgsync export`: archive, upload and record the manifest once.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use imgsync_daemon::Services;

use super::{block_on, GlobalArgs};

/// Arguments for `imgsync export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Emit the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl ExportArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let settings = global.load_settings()?;
        imgsync_daemon::init_tracing(global.log_json);
        let services =
            Services::from_settings(&settings).context("failed to set up collaborators")?;

        let summary = block_on(services.reporter.export(Utc::now()))?.context("export failed")?;
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("failed to serialize summary")?
            );
            return Ok(());
        }

        println!("{} exported {} images to {}", "✓".green(), summary.images, summary.uploaded_to);
        println!("  tab      {}", summary.tab);
        println!("  archive  {} ({} bytes)", summary.archive_path.display(), summary.size_bytes);
        println!("  sha256   {}", summary.sha256);
        if summary.unreadable > 0 {
            println!(
                "  {} {} repositories could not be read",
                "!".yellow(),
                summary.unreadable
            );
        }
        Ok(())
    }
}
