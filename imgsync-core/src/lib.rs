//! imgsync core library: domain types, collaborator traits, errors and settings.
//!
//! - [`types`]: image references, declared and observed state
//! - [`traits`]: the collaborator boundaries used by the engine
//! - [`error`]: [`SourceError`], [`TransportError`], [`ConfigError`]
//! - [`config`]: [`Settings`] and its layered loader

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{PartialSettings, Secret, Settings, VendorCredentials};
pub use error::{ConfigError, SourceError, TransportError};
pub use traits::{
    ArchiveInfo, Archiver, DeclaredStateSource, ImageTransport, ObservedStateSource, ReportSink,
    Uploader,
};
pub use types::{
    DeclaredImage, DeclaredState, ImageRef, ObservedRepository, ObservedState,
    UnreadableRepository,
};
