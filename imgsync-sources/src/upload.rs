//! Remote copy of export archives over scp.

use std::ffi::OsString;
use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use imgsync_core::error::io_err;
use imgsync_core::{Secret, SourceError, Uploader};

use crate::command;

/// Uploads with `sshpass -e scp <file> <dest>`.
///
/// The password travels in the `SSHPASS` environment variable of the child
/// only; it never appears on the command line or in logs.
#[derive(Debug, Clone)]
pub struct ScpUploader {
    program: OsString,
    dest: String,
    password: Secret,
}

impl ScpUploader {
    pub fn new(dest: impl Into<String>, password: Secret) -> Self {
        Self {
            program: "sshpass".into(),
            dest: dest.into(),
            password,
        }
    }

    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Where `file_name` ends up on the remote side.
    pub fn remote_location(&self, file_name: &str) -> String {
        if self.dest.ends_with('/') || self.dest.ends_with(':') {
            format!("{}{file_name}", self.dest)
        } else {
            format!("{}/{file_name}", self.dest)
        }
    }
}

#[async_trait]
impl Uploader for ScpUploader {
    async fn upload(&self, file: &Path) -> Result<String, SourceError> {
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io_err(
                    file,
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "upload path has no file name",
                    ),
                )
            })?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("-e")
            .arg("scp")
            .args(["-o", "StrictHostKeyChecking=no"])
            .arg(file)
            .arg(&self.dest)
            .env("SSHPASS", self.password.expose());

        tracing::info!(file = %file.display(), dest = %self.dest, "uploading archive");
        let out = command::run(cmd, None).await.map_err(|e| io_err(file, e))?;
        if !out.success {
            tracing::error!(dest = %self.dest, status = %out, "scp failed");
            return Err(SourceError::Command(format!(
                "scp to {} failed ({out}): {}",
                self.dest,
                out.output.trim()
            )));
        }

        let location = self.remote_location(&file_name);
        tracing::info!(%location, "archive uploaded");
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_location_joins_dest_and_name() {
        let up = ScpUploader::new("backup@nas:/exports", Secret::new("pw"));
        assert_eq!(up.remote_location("a.tar.gz"), "backup@nas:/exports/a.tar.gz");
        let up = ScpUploader::new("backup@nas:", Secret::new("pw"));
        assert_eq!(up.remote_location("a.tar.gz"), "backup@nas:a.tar.gz");
    }
}
