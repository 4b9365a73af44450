//! `imgsync serve`: run the HTTP daemon in the foreground.

use anyhow::{Context, Result};
use clap::Args;

use super::GlobalArgs;

/// Arguments for `imgsync serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {}

impl ServeArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let settings = global.load_settings()?;
        imgsync_daemon::start_blocking(settings, global.log_json)
            .context("daemon exited with an error")
    }
}
