//! `skopeo`-backed [`ImageTransport`].

use std::ffi::OsString;

use async_trait::async_trait;
use tokio::process::Command;

use imgsync_core::{ImageRef, ImageTransport, TransportError};

use crate::command::{self, CommandOutput};
use crate::credentials::CredentialProfiles;

/// Output fragments skopeo prints when the referenced manifest is absent.
pub const NOT_FOUND_MARKERS: &[&str] = &[
    "Image may not exist or is not stored with a v2 Schema in a v2 registry",
    "manifest unknown",
];

/// Copies images from their public source into the registry and deletes
/// them from it.
///
/// The destination repository path is the full source reference, so
/// `quay.io/org/app:1` lands at `<registry>/quay.io/org/app:1`.
#[derive(Debug, Clone)]
pub struct SkopeoTransport {
    program: OsString,
    registry: String,
    profiles: CredentialProfiles,
}

impl SkopeoTransport {
    /// `registry` is the destination host (and port) without scheme.
    pub fn new(registry: impl Into<String>, profiles: CredentialProfiles) -> Self {
        Self {
            program: "skopeo".into(),
            registry: registry.into(),
            profiles,
        }
    }

    /// Use a different executable in place of `skopeo`.
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    fn destination(&self, image: &ImageRef) -> String {
        format!("docker://{}/{image}", self.registry)
    }

    /// Arguments for `skopeo copy`; the credential, when present, comes first.
    pub fn copy_args(&self, image: &ImageRef) -> Vec<String> {
        let mut args = vec!["copy".to_string()];
        if let Some(cred) = self.profiles.credential_for(image) {
            args.push(format!("--src-creds={}", cred.expose()));
        }
        args.push("--dest-tls-verify=false".into());
        args.push(format!("docker://{image}"));
        args.push(self.destination(image));
        args
    }

    pub fn delete_args(&self, image: &ImageRef) -> Vec<String> {
        vec![
            "delete".into(),
            "--tls-verify=false".into(),
            self.destination(image),
        ]
    }

    async fn invoke(&self, args: Vec<String>) -> Result<String, TransportError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&args);
        let out = command::run(cmd, None).await.map_err(|e| {
            TransportError::failed("", format!("failed to run {:?}: {e}", self.program))
        })?;
        classify(out)
    }
}

/// Map a finished skopeo invocation to the transport contract.
pub(crate) fn classify(out: CommandOutput) -> Result<String, TransportError> {
    if out.success {
        return Ok(out.output);
    }
    if out.contains_any(NOT_FOUND_MARKERS) {
        return Err(TransportError::NotFound { output: out.output });
    }
    let reason = format!("skopeo {out}");
    Err(TransportError::failed(out.output, reason))
}

#[async_trait]
impl ImageTransport for SkopeoTransport {
    async fn copy(&self, image: &ImageRef) -> Result<String, TransportError> {
        tracing::info!(
            image = %image,
            dest = %self.destination(image),
            credentialed = self.profiles.credential_for(image).is_some(),
            "skopeo copy",
        );
        self.invoke(self.copy_args(image)).await
    }

    async fn delete(&self, image: &ImageRef) -> Result<String, TransportError> {
        tracing::info!(image = %image, dest = %self.destination(image), "skopeo delete");
        self.invoke(self.delete_args(image)).await
    }
}
