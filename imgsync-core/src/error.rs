//! Error taxonomy shared by the engine and its collaborators.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures reading declared or observed state, or writing to a report sink.
#[derive(Debug, Error)]
pub enum SourceError {
    /// A declared-state range could not be read. Fatal for the pass.
    #[error("declared state unavailable (range {range}): {reason}")]
    Unavailable { range: String, reason: String },

    /// The registry catalog itself could not be listed.
    #[error("registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("external command failed: {0}")]
    Command(String),

    #[error("invalid setting: {0}")]
    Invalid(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome classification for a single copy or delete call.
///
/// Decided once at the transport boundary; callers match on the variant and
/// never inspect tool output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The target image does not exist.
    #[error("image not found")]
    NotFound { output: String },

    #[error("{reason}")]
    Failed { output: String, reason: String },

    #[error("timeout after {}s", after.as_secs())]
    Timeout { after: Duration },
}

impl TransportError {
    pub fn failed(output: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            output: output.into(),
            reason: reason.into(),
        }
    }

    /// Whether a retry could plausibly change the result.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotFound { .. })
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Every required setting that was not provided.
    #[error("missing required settings: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SourceError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SourceError {
    SourceError::Io {
        path: path.into(),
        source,
    }
}
