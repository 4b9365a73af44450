//! Concrete collaborators for `imgsync`.
//!
//! Each type implements one of the traits in [`imgsync_core::traits`]:
//!
//! - [`SheetsClient`] reads declared state and writes report tabs
//! - [`RegistryClient`] enumerates a registry v2 catalog
//! - [`SkopeoTransport`] and [`DockerPushTransport`] move images
//! - [`TarGzArchiver`] and [`ScpUploader`] back the export flow
//!
//! None of them hold global state; callers construct them from
//! [`Settings`](imgsync_core::Settings) and share them behind an `Arc`.

pub mod archive;
pub mod command;
pub mod credentials;
pub mod docker;
pub mod google_auth;
pub mod registry;
pub mod sheets;
pub mod skopeo;
pub mod upload;

pub use archive::TarGzArchiver;
pub use credentials::{CredentialProfile, CredentialProfiles};
pub use docker::DockerPushTransport;
pub use google_auth::{ServiceAccountKey, ServiceAccountTokens, StaticToken, TokenProvider};
pub use registry::RegistryClient;
pub use sheets::SheetsClient;
pub use skopeo::SkopeoTransport;
pub use upload::ScpUploader;
