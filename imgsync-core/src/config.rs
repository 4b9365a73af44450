//! Layered settings.
//!
//! Sources, lowest precedence first: YAML file → environment → flags. Each
//! layer is a [`PartialSettings`]; [`PartialSettings::overlay`] stacks them and
//! [`PartialSettings::resolve`] applies defaults and validates.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_GOOGLE_CREDENTIALS: &str = "./credentials.json";
pub const DEFAULT_SHEETS_RANGE: &str = "CK1!C2:D,CK2!C2:D";
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
pub const DEFAULT_REGISTRY_SCHEME: &str = "http";
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 600;

/// A string that never appears in `Debug` output or logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Optional per-vendor source credentials (`user:password`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VendorCredentials {
    pub docker: Option<Secret>,
    pub quay: Option<Secret>,
    pub gcr: Option<Secret>,
}

/// One configuration layer. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialSettings {
    pub google_credentials: Option<PathBuf>,
    pub target_sheets: Option<String>,
    pub sheets_range: Option<String>,
    pub release_sheets: Option<String>,
    pub registry_url: Option<String>,
    pub archive_path: Option<PathBuf>,
    pub scp_dest: Option<String>,
    pub scp_pass: Option<Secret>,
    pub docker_cred: Option<Secret>,
    pub quay_cred: Option<Secret>,
    pub gcr_cred: Option<Secret>,
    pub listen: Option<String>,
    pub registry_scheme: Option<String>,
    pub call_timeout_secs: Option<u64>,
    pub concurrency: Option<usize>,
    pub retries: Option<u32>,
}

impl PartialSettings {
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Stack `higher` on top of `self`; any value set in `higher` wins.
    pub fn overlay(self, higher: PartialSettings) -> Self {
        Self {
            google_credentials: higher.google_credentials.or(self.google_credentials),
            target_sheets: higher.target_sheets.or(self.target_sheets),
            sheets_range: higher.sheets_range.or(self.sheets_range),
            release_sheets: higher.release_sheets.or(self.release_sheets),
            registry_url: higher.registry_url.or(self.registry_url),
            archive_path: higher.archive_path.or(self.archive_path),
            scp_dest: higher.scp_dest.or(self.scp_dest),
            scp_pass: higher.scp_pass.or(self.scp_pass),
            docker_cred: higher.docker_cred.or(self.docker_cred),
            quay_cred: higher.quay_cred.or(self.quay_cred),
            gcr_cred: higher.gcr_cred.or(self.gcr_cred),
            listen: higher.listen.or(self.listen),
            registry_scheme: higher.registry_scheme.or(self.registry_scheme),
            call_timeout_secs: higher.call_timeout_secs.or(self.call_timeout_secs),
            concurrency: higher.concurrency.or(self.concurrency),
            retries: higher.retries.or(self.retries),
        }
    }

    /// Apply defaults and check required keys.
    ///
    /// Empty strings count as absent. All missing keys are reported together.
    pub fn resolve(self) -> Result<Settings, ConfigError> {
        let mut missing = Vec::new();

        let target_sheets = require(self.target_sheets, "TARGET_SHEETS", &mut missing);
        let release_sheets = require(self.release_sheets, "RELEASE_SHEETS", &mut missing);
        let registry_url = require(self.registry_url, "REGISTRY_URL", &mut missing);
        let archive_path = require(self.archive_path, "ARCHIVE_PATH", &mut missing);
        let scp_dest = require(self.scp_dest, "SCP_DEST", &mut missing);
        let scp_pass = require(self.scp_pass, "SCP_PASS", &mut missing);

        let sheets_range = split_ranges(
            self.sheets_range
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(DEFAULT_SHEETS_RANGE),
        );
        if sheets_range.is_empty() {
            missing.push("SHEETS_RANGE");
        }

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let concurrency = self.concurrency.unwrap_or(1);
        if concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "IMGSYNC_CONCURRENCY",
                reason: "must be at least 1".to_string(),
            });
        }

        let (scheme, registry_url) = split_scheme(
            registry_url.unwrap_or_default().trim_end_matches('/'),
            self.registry_scheme.as_deref(),
        );
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::Invalid {
                key: "IMGSYNC_REGISTRY_SCHEME",
                reason: format!("unsupported scheme '{scheme}'"),
            });
        }

        Ok(Settings {
            google_credentials: self
                .google_credentials
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_GOOGLE_CREDENTIALS)),
            target_sheets: target_sheets.unwrap_or_default(),
            sheets_range,
            release_sheets: release_sheets.unwrap_or_default(),
            registry_url,
            registry_scheme: scheme,
            archive_path: archive_path.unwrap_or_default(),
            scp_dest: scp_dest.unwrap_or_default(),
            scp_pass: scp_pass.unwrap_or_default(),
            credentials: VendorCredentials {
                docker: self.docker_cred.filter(|s| !s.is_empty()),
                quay: self.quay_cred.filter(|s| !s.is_empty()),
                gcr: self.gcr_cred.filter(|s| !s.is_empty()),
            },
            listen: self.listen.unwrap_or_else(|| DEFAULT_LISTEN.to_string()),
            call_timeout: Duration::from_secs(
                self.call_timeout_secs.unwrap_or(DEFAULT_CALL_TIMEOUT_SECS),
            ),
            concurrency,
            retries: self.retries.unwrap_or(0),
        })
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub google_credentials: PathBuf,
    pub target_sheets: String,
    pub sheets_range: Vec<String>,
    pub release_sheets: String,
    /// Registry host (and port), without scheme.
    pub registry_url: String,
    pub registry_scheme: String,
    pub archive_path: PathBuf,
    pub scp_dest: String,
    pub scp_pass: Secret,
    pub credentials: VendorCredentials,
    pub listen: String,
    pub call_timeout: Duration,
    pub concurrency: usize,
    pub retries: u32,
}

impl Settings {
    /// Base URL for registry v2 API calls.
    pub fn registry_base(&self) -> String {
        format!("{}://{}", self.registry_scheme, self.registry_url)
    }

    /// Non-secret settings as `(key, value)` pairs, for health output.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "GOOGLE_APPLICATION_CREDENTIALS",
                self.google_credentials.display().to_string(),
            ),
            ("TARGET_SHEETS", self.target_sheets.clone()),
            ("SHEETS_RANGE", self.sheets_range.join(",")),
            ("RELEASE_SHEETS", self.release_sheets.clone()),
            ("REGISTRY_URL", self.registry_url.clone()),
            ("ARCHIVE_PATH", self.archive_path.display().to_string()),
            ("SCP_DEST", self.scp_dest.clone()),
        ]
    }
}

/// Split a comma-separated range list, dropping empty entries.
pub fn split_ranges(ranges: &str) -> Vec<String> {
    ranges
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

fn require<T>(value: Option<T>, key: &'static str, missing: &mut Vec<&'static str>) -> Option<T>
where
    T: IsBlank,
{
    match value {
        Some(v) if !v.is_blank() => Some(v),
        _ => {
            missing.push(key);
            None
        }
    }
}

trait IsBlank {
    fn is_blank(&self) -> bool;
}

impl IsBlank for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl IsBlank for PathBuf {
    fn is_blank(&self) -> bool {
        self.as_os_str().is_empty()
    }
}

impl IsBlank for Secret {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

/// An explicit `scheme://` prefix on the URL wins over the configured scheme.
fn split_scheme(url: &str, configured: Option<&str>) -> (String, String) {
    match url.split_once("://") {
        Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest.to_string()),
        None => (
            configured
                .unwrap_or(DEFAULT_REGISTRY_SCHEME)
                .to_ascii_lowercase(),
            url.to_string(),
        ),
    }
}
