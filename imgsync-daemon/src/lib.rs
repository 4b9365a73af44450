//! HTTP daemon: `/health`, `/sync`, `/export` and `/push/v1` over one shared
//! set of collaborators, with at most one reconciliation pass at a time.

mod error;
pub mod routes;
mod runtime;
pub mod services;

pub use error::DaemonError;
pub use routes::{router, ApiError, AppState};
pub use runtime::{init_tracing, run, serve, start_blocking};
pub use services::Services;
