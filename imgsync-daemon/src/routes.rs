use std::fmt::Write as _;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, MutexGuard};

use imgsync_core::ImageRef;
use imgsync_report::{ExportSummary, ReportError};
use imgsync_sync::{
    execute,
    pipeline::{self, PassOptions},
    ImageOutcome, ReconciliationReport, SyncError,
};

use crate::services::Services;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
    /// Held for the whole duration of any pass that touches the registry.
    pass_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self {
            services: Arc::new(services),
            pass_lock: Arc::new(Mutex::new(())),
        }
    }

    fn acquire(&self) -> Result<MutexGuard<'_, ()>, ApiError> {
        self.pass_lock.try_lock().map_err(|_| {
            tracing::warn!("rejecting request: a reconciliation pass is already running");
            ApiError::new(StatusCode::CONFLICT, "a reconciliation pass is already running")
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/sync", get(sync))
        .route("/export", post(export))
        .route("/push/v1", post(push_v1))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: u16,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: status.as_u16(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code {
            400 => StatusCode::BAD_REQUEST,
            409 => StatusCode::CONFLICT,
            502 => StatusCode::BAD_GATEWAY,
            504 => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        let status = match e {
            SyncError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            SyncError::SourceUnavailable(_) | SyncError::ObservedUnavailable(_) => {
                StatusCode::BAD_GATEWAY
            }
        };
        ApiError::new(status, e.to_string())
    }
}

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        ApiError::new(StatusCode::BAD_GATEWAY, e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index() -> Json<serde_json::Value> {
    Json(json!({}))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let services = &state.services;
    let mut body = String::new();
    for (key, value) in &services.describe {
        let _ = writeln!(body, "{key}: {value}");
    }
    match services.observed.ping().await {
        Ok(()) => {
            tracing::info!(registry = %services.registry_url, "registry reachable");
            let _ = writeln!(body, "Registry Server [{}] 200 OK!", services.registry_url);
            (StatusCode::OK, body)
        }
        Err(e) => {
            tracing::error!(registry = %services.registry_url, error = %e, "registry unreachable");
            body.push_str("Registry Server Fail!\n");
            (StatusCode::SERVICE_UNAVAILABLE, body)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SyncQuery {
    pub range: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub persist: bool,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    #[serde(flatten)]
    pub report: ReconciliationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_error: Option<String>,
}

async fn sync(
    State(state): State<AppState>,
    Query(query): Query<SyncQuery>,
) -> Result<Json<SyncResponse>, ApiError> {
    let _guard = state.acquire()?;
    tracing::info!(range = ?query.range, dry_run = query.dry_run, "GET /sync");

    let ctx = state.services.pass_context();
    let report = pipeline::run(
        &ctx,
        PassOptions {
            range_override: query.range,
            dry_run: query.dry_run,
        },
    )
    .await?;

    let mut response = SyncResponse {
        report,
        persisted_to: None,
        persist_error: None,
    };
    if query.persist {
        match state
            .services
            .reporter
            .persist_report(&response.report, Utc::now())
            .await
        {
            Ok(tab) => response.persisted_to = Some(tab),
            Err(e) => {
                tracing::error!(error = %e, "persisting sync report failed");
                response.persist_error = Some(e.to_string());
            }
        }
    }
    Ok(Json(response))
}

async fn export(State(state): State<AppState>) -> Result<Json<ExportSummary>, ApiError> {
    let _guard = state.acquire()?;
    tracing::info!("POST /export");
    let summary = state.services.reporter.export(Utc::now()).await?;
    Ok(Json(summary))
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushRequest {
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PushResponse {
    pub results: Vec<ImageOutcome>,
}

/// Legacy path: pull, tag and push each image through the docker CLI.
///
/// Without an explicit `images` list, the declared include list is pushed.
async fn push_v1(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PushResponse>, ApiError> {
    let request: PushRequest = if body.iter().all(u8::is_ascii_whitespace) {
        PushRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            ApiError::new(StatusCode::BAD_REQUEST, format!("invalid request body: {e}"))
        })?
    };

    let _guard = state.acquire()?;
    let services = &state.services;
    let images = if request.images.is_empty() {
        services
            .declared
            .fetch_declared(&services.ranges)
            .await
            .map_err(SyncError::SourceUnavailable)?
            .include
    } else {
        request.images
    };
    tracing::info!(count = images.len(), "POST /push/v1");

    let plan = ReconciliationReport {
        to_copy: images.iter().map(|raw| ImageRef::parse(raw)).collect(),
        ..Default::default()
    };
    let report = execute(plan, services.push_transport.as_ref(), &services.execute).await;
    Ok(Json(PushResponse {
        results: report.copy_results,
    }))
}
