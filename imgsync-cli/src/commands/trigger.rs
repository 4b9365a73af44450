//! `imgsync trigger`: call `/sync` on a running daemon.

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::Value;

/// Arguments for `imgsync trigger`.
#[derive(Args, Debug)]
pub struct TriggerArgs {
    /// Daemon base URL, e.g. `http://localhost:8080`.
    #[arg(long)]
    pub url: String,

    /// Comma-separated ranges to read instead of the daemon's configured ones.
    #[arg(long)]
    pub range: Option<String>,

    /// Ask the daemon to plan only.
    #[arg(long)]
    pub dry_run: bool,
}

impl TriggerArgs {
    pub fn run(self) -> Result<()> {
        let endpoint = format!("{}/sync", self.url.trim_end_matches('/'));
        let mut request = ureq::get(&endpoint);
        if let Some(range) = &self.range {
            request = request.query("range", range);
        }
        if self.dry_run {
            request = request.query("dry_run", "true");
        }

        let body: Value = match request.call() {
            Ok(response) => response
                .into_json()
                .context("daemon returned a non-JSON response")?,
            Err(ureq::Error::Status(code, response)) => {
                let detail = response
                    .into_json::<Value>()
                    .ok()
                    .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                    .unwrap_or_default();
                bail!("daemon answered {code}: {detail}");
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to reach daemon at {endpoint}"))
            }
        };

        println!(
            "{}",
            serde_json::to_string_pretty(&body).context("failed to serialize response")?
        );
        Ok(())
    }
}
