pub mod diff;
pub mod export;
pub mod serve;
pub mod sync;
pub mod trigger;

use std::future::Future;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use imgsync_core::{PartialSettings, Secret, Settings};

/// Options shared by every subcommand.
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// YAML file with settings; environment and flags override it.
    #[arg(long, global = true, env = "IMGSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Every setting as a flag bound to its environment variable.
#[derive(Args, Debug, Default)]
pub struct SettingsArgs {
    /// Service-account JSON key for the Sheets API.
    #[arg(long = "google-app-creds", global = true, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    pub google_credentials: Option<PathBuf>,

    /// Spreadsheet id holding the declared inventory.
    #[arg(long, global = true, env = "TARGET_SHEETS")]
    pub target_sheets: Option<String>,

    /// Comma-separated A1 ranges to read.
    #[arg(long, global = true, env = "SHEETS_RANGE")]
    pub sheets_range: Option<String>,

    /// Spreadsheet id that receives export manifests and reports.
    #[arg(long, global = true, env = "RELEASE_SHEETS")]
    pub release_sheets: Option<String>,

    /// Registry host (and port).
    #[arg(long, global = true, env = "REGISTRY_URL")]
    pub registry_url: Option<String>,

    /// Registry storage directory to archive.
    #[arg(long, global = true, env = "ARCHIVE_PATH")]
    pub archive_path: Option<PathBuf>,

    /// scp destination for archives.
    #[arg(long, global = true, env = "SCP_DEST")]
    pub scp_dest: Option<String>,

    /// Password for the scp destination.
    #[arg(long, global = true, env = "SCP_PASS", hide_env_values = true)]
    pub scp_pass: Option<String>,

    #[arg(long, global = true, env = "DOCKER_CRED", hide_env_values = true)]
    pub docker_cred: Option<String>,

    #[arg(long, global = true, env = "QUAY_CRED", hide_env_values = true)]
    pub quay_cred: Option<String>,

    #[arg(long, global = true, env = "GCR_CRED", hide_env_values = true)]
    pub gcr_cred: Option<String>,

    /// Daemon listen address.
    #[arg(long, global = true, env = "IMGSYNC_LISTEN")]
    pub listen: Option<String>,

    /// `http` or `https` for registry API calls.
    #[arg(long, global = true, env = "IMGSYNC_REGISTRY_SCHEME")]
    pub registry_scheme: Option<String>,

    /// Deadline for each external call, in seconds.
    #[arg(long, global = true, env = "IMGSYNC_CALL_TIMEOUT_SECS")]
    pub call_timeout_secs: Option<u64>,

    /// Transport calls in flight per phase.
    #[arg(long, global = true, env = "IMGSYNC_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Extra attempts for failed or timed-out calls.
    #[arg(long, global = true, env = "IMGSYNC_RETRIES")]
    pub retries: Option<u32>,
}

impl SettingsArgs {
    fn to_partial(&self) -> PartialSettings {
        PartialSettings {
            google_credentials: self.google_credentials.clone(),
            target_sheets: self.target_sheets.clone(),
            sheets_range: self.sheets_range.clone(),
            release_sheets: self.release_sheets.clone(),
            registry_url: self.registry_url.clone(),
            archive_path: self.archive_path.clone(),
            scp_dest: self.scp_dest.clone(),
            scp_pass: self.scp_pass.clone().map(Secret::new),
            docker_cred: self.docker_cred.clone().map(Secret::new),
            quay_cred: self.quay_cred.clone().map(Secret::new),
            gcr_cred: self.gcr_cred.clone().map(Secret::new),
            listen: self.listen.clone(),
            registry_scheme: self.registry_scheme.clone(),
            call_timeout_secs: self.call_timeout_secs,
            concurrency: self.concurrency,
            retries: self.retries,
        }
    }
}

impl GlobalArgs {
    /// File layer under environment and flag layer, then validate.
    pub fn load_settings(&self) -> Result<Settings> {
        let file = match &self.config {
            Some(path) => PartialSettings::from_yaml_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => PartialSettings::default(),
        };
        let settings = file
            .overlay(self.settings.to_partial())
            .resolve()
            .context("invalid configuration")?;
        Ok(settings)
    }
}

/// Run `future` to completion on a fresh multi-threaded runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    Ok(runtime.block_on(future))
}
