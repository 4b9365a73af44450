//! `imgsync diff`: show what a pass would copy and delete.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{sync::run_pass, GlobalArgs};

/// Arguments for `imgsync diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Comma-separated ranges to read instead of the configured ones.
    #[arg(long)]
    pub range: Option<String>,
}

impl DiffArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let report = run_pass(global, self.range, true)?;

        if report.to_copy.is_empty() && report.to_delete.is_empty() && report.malformed.is_empty() {
            println!("No differences between inventory and registry.");
            return Ok(());
        }

        for image in &report.to_copy {
            println!("{}", format!("+ {image}").green());
        }
        for image in &report.to_delete {
            println!("{}", format!("- {image}").red());
        }
        for raw in &report.malformed {
            println!("{}", format!("? {raw} (no tag)").yellow());
        }
        println!(
            "{} to copy, {} to delete, {} already present",
            report.to_copy.len(),
            report.to_delete.len(),
            report.present.len()
        );
        Ok(())
    }
}
