//! Legacy pull/tag/push transport for registries without skopeo support.

use std::ffi::OsString;

use async_trait::async_trait;
use tokio::process::Command;

use imgsync_core::{ImageRef, ImageTransport, Secret, TransportError};

use crate::command::{self, CommandOutput};
use crate::credentials::CredentialProfiles;

const PULL_NOT_FOUND: &[&str] = &["manifest unknown", "not found", "does not exist"];

#[derive(Debug, Clone)]
pub struct DockerPushTransport {
    program: OsString,
    registry: String,
    profiles: CredentialProfiles,
}

impl DockerPushTransport {
    pub fn new(registry: impl Into<String>, profiles: CredentialProfiles) -> Self {
        Self {
            program: "docker".into(),
            registry: registry.into(),
            profiles,
        }
    }

    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    fn target(&self, image: &ImageRef) -> String {
        format!("{}/{image}", self.registry)
    }

    async fn docker(
        &self,
        step: &str,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<CommandOutput, TransportError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        let out = command::run(cmd, stdin)
            .await
            .map_err(|e| TransportError::failed("", format!("failed to run docker {step}: {e}")))?;
        if !out.success {
            tracing::error!(step, status = %out, "docker step failed");
        }
        Ok(out)
    }

    async fn login(&self, host: &str, credential: &Secret) -> Result<(), TransportError> {
        let (user, password) = credential
            .expose()
            .split_once(':')
            .ok_or_else(|| TransportError::failed("", "credential is not in user:password form"))?;
        let args = vec![
            "login".to_string(),
            "--username".into(),
            user.into(),
            "--password-stdin".into(),
            host.into(),
        ];
        let out = self.docker("login", &args, Some(password.as_bytes())).await?;
        if out.success {
            Ok(())
        } else {
            let reason = format!("docker login {out}");
            Err(TransportError::failed(out.output, reason))
        }
    }
}

#[async_trait]
impl ImageTransport for DockerPushTransport {
    async fn copy(&self, image: &ImageRef) -> Result<String, TransportError> {
        let source = image.to_string();
        let target = self.target(image);
        tracing::info!(image = %source, target = %target, "docker pull/tag/push");

        if let Some(profile) = self.profiles.profile_for(image) {
            if let Some(credential) = profile.credential() {
                let host = image.registry_host().unwrap_or(profile.login_host);
                self.login(host, credential).await?;
            }
        }

        let mut log = String::new();
        let steps: [(&str, Vec<String>); 3] = [
            ("pull", vec!["pull".into(), source.clone()]),
            ("tag", vec!["tag".into(), source.clone(), target.clone()]),
            ("push", vec!["push".into(), target.clone()]),
        ];
        for (step, args) in steps {
            let out = self.docker(step, &args, None).await?;
            log.push_str(&out.output);
            if !out.success {
                if step == "pull" && out.contains_any(PULL_NOT_FOUND) {
                    return Err(TransportError::NotFound { output: log });
                }
                let reason = format!("docker {step} {out}");
                return Err(TransportError::failed(log, reason));
            }
        }
        Ok(log)
    }

    async fn delete(&self, _image: &ImageRef) -> Result<String, TransportError> {
        Err(TransportError::failed(
            "",
            "delete is not supported by the docker push path",
        ))
    }
}
