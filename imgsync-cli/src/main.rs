//! imgsync: reconcile a spreadsheet image inventory against a private registry.
//!
//! # Usage
//!
//! ```text
//! imgsync serve
//! imgsync sync [--range <ranges>] [--dry-run] [--json]
//! imgsync diff [--range <ranges>]
//! imgsync export
//! imgsync trigger --url <base> [--range <ranges>]
//! ```
//!
//! Every setting can come from `--config <file.yaml>`, the environment, or a
//! flag; flags win over the environment, which wins over the file.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    diff::DiffArgs, export::ExportArgs, serve::ServeArgs, sync::SyncArgs, trigger::TriggerArgs,
    GlobalArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "imgsync",
    version,
    about = "Mirror and prune registry images from a spreadsheet inventory",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP daemon in the foreground.
    Serve(ServeArgs),

    /// Run one reconciliation pass locally.
    Sync(SyncArgs),

    /// Print the copy/delete plan without executing it.
    Diff(DiffArgs),

    /// Archive the registry, upload it, and record the manifest.
    Export(ExportArgs),

    /// Ask a running daemon to reconcile.
    Trigger(TriggerArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => args.run(&cli.global),
        Commands::Sync(args) => args.run(&cli.global),
        Commands::Diff(args) => args.run(&cli.global),
        Commands::Export(args) => args.run(&cli.global),
        Commands::Trigger(args) => args.run(),
    }
}
