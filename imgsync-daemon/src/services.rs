//! Collaborators built once at startup and shared by every request.
//!
//! Each request assembles its own [`PassContext`] from these handles; nothing
//! is reachable through a global.

use std::sync::Arc;

use imgsync_core::{DeclaredStateSource, ImageTransport, ObservedStateSource, Settings};
use imgsync_report::ArchivalReporter;
use imgsync_sources::{
    CredentialProfiles, DockerPushTransport, RegistryClient, ScpUploader, ServiceAccountKey,
    ServiceAccountTokens, SheetsClient, SkopeoTransport, TarGzArchiver,
};
use imgsync_sync::pipeline::PassContext;
use imgsync_sync::ExecuteOptions;

use crate::error::DaemonError;

#[derive(Clone)]
pub struct Services {
    pub declared: Arc<dyn DeclaredStateSource>,
    pub observed: Arc<dyn ObservedStateSource>,
    /// Default copy/delete path (skopeo).
    pub transport: Arc<dyn ImageTransport>,
    /// Legacy pull/tag/push path used by `/push/v1`.
    pub push_transport: Arc<dyn ImageTransport>,
    pub reporter: ArchivalReporter,
    pub ranges: Vec<String>,
    pub execute: ExecuteOptions,
    /// Registry host as configured, for health output.
    pub registry_url: String,
    /// Non-secret settings, for health output.
    pub describe: Vec<(&'static str, String)>,
}

impl Services {
    /// Build the production collaborators.
    ///
    /// Fails when the service-account key cannot be read or a URL is invalid.
    pub fn from_settings(settings: &Settings) -> Result<Self, DaemonError> {
        let http = reqwest::Client::builder()
            .timeout(settings.call_timeout)
            .build()
            .map_err(|e| imgsync_core::SourceError::Http(e.to_string()))?;

        let key = ServiceAccountKey::from_file(&settings.google_credentials)?;
        let tokens = Arc::new(ServiceAccountTokens::new(key, http.clone()));
        let declared = SheetsClient::new(http.clone(), &settings.target_sheets, tokens.clone())?;
        let release = SheetsClient::new(http, &settings.release_sheets, tokens)?;

        let observed: Arc<dyn ObservedStateSource> = Arc::new(RegistryClient::new(
            &settings.registry_base(),
            settings.call_timeout,
        )?);

        let profiles = CredentialProfiles::new(&settings.credentials)?;
        let transport = SkopeoTransport::new(&settings.registry_url, profiles.clone());
        let push_transport = DockerPushTransport::new(&settings.registry_url, profiles);

        let reporter = ArchivalReporter {
            observed: observed.clone(),
            archiver: Arc::new(TarGzArchiver::new(
                &settings.archive_path,
                std::env::temp_dir().join("imgsync"),
            )),
            uploader: Arc::new(ScpUploader::new(&settings.scp_dest, settings.scp_pass.clone())),
            sink: Arc::new(release),
        };

        Ok(Self {
            declared: Arc::new(declared),
            observed,
            transport: Arc::new(transport),
            push_transport: Arc::new(push_transport),
            reporter,
            ranges: settings.sheets_range.clone(),
            execute: ExecuteOptions::from_settings(settings),
            registry_url: settings.registry_url.clone(),
            describe: settings.describe(),
        })
    }

    /// Collaborators for one reconciliation pass.
    pub fn pass_context(&self) -> PassContext {
        PassContext {
            declared: self.declared.clone(),
            observed: self.observed.clone(),
            transport: self.transport.clone(),
            ranges: self.ranges.clone(),
            execute: self.execute.clone(),
        }
    }
}
