// crates/storefront-migrate-server/src/handlers.rs
// ============================================================================
// Module: Migration Handlers
// Description: Request parsing, page dispatch, and JSON error mapping.
// Purpose: Translate HTTP requests into driver calls on the blocking pool.
// Dependencies: storefront-migrate-core, axum, serde, url
// ============================================================================

//! ## Overview
//! Every handler hands its driver call to `spawn_blocking` and maps
//! [`ExecutorError`] onto an HTTP status with a `{error: {kind, message}}`
//! body. The upgrade handler answers `303 See Other` back to itself until the
//! step completes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::IntoResponse;
use axum::response::Response;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use storefront_migrate_core::ExecutorError;
use storefront_migrate_core::MigrationRunState;
use storefront_migrate_core::PageReport;
use storefront_migrate_core::RedirectStep;
use storefront_migrate_core::RegistryError;
use storefront_migrate_core::StepKey;
use storefront_migrate_core::redirect_query_params;
use url::form_urlencoded;

use crate::runtime::MigrationRuntime;
use crate::server::ServerState;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Path of the redirect-driven endpoint.
const UPGRADE_PATH: &str = "/migrations/upgrade";
/// Query parameters owned by the redirect driver.
const RESERVED_PARAMS: [&str; 3] = ["step", "cursor", "total"];

// ============================================================================
// SECTION: Request and Response Types
// ============================================================================

/// Body of `POST /migrations/step`.
#[derive(Debug, Deserialize)]
pub struct StepRequest {
    /// Step to advance.
    pub step_key: StepKey,
    /// Cursor the client believes is current.
    #[serde(default)]
    pub cursor: Option<u64>,
}

/// Body of `POST /migrations/legacy-removal`.
#[derive(Debug, Deserialize)]
pub struct LegacyRemovalRequest {
    /// Must name the gated step.
    pub step_key: StepKey,
    /// Explicit operator confirmation.
    #[serde(default)]
    pub confirmation: bool,
}

/// Body returned by the upgrade endpoint.
#[derive(Debug, Serialize)]
pub struct UpgradeResponse {
    /// True once the step (or the whole run) has completed.
    pub done: bool,
    /// Step that ran, if any.
    pub step_key: Option<StepKey>,
    /// Persisted cursor after the page.
    pub cursor: u64,
    /// Completion percentage.
    pub percent: u8,
    /// Next pending migration step once this one is done.
    pub next_step: Option<StepKey>,
}

/// Error payload body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    /// Wrapped error detail.
    error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize)]
struct ErrorDetail {
    /// Stable error label.
    kind: &'static str,
    /// Human-readable message.
    message: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// HTTP-facing error.
#[derive(Debug)]
pub(crate) struct ApiError {
    /// Response status.
    status: StatusCode,
    /// Stable error label.
    kind: &'static str,
    /// Human-readable message.
    message: String,
}

impl ApiError {
    /// Builds an error with an explicit status.
    const fn new(status: StatusCode, kind: &'static str, message: String) -> Self {
        Self {
            status,
            kind,
            message,
        }
    }
}

impl From<ExecutorError> for ApiError {
    fn from(err: ExecutorError) -> Self {
        let status = match &err {
            ExecutorError::Registry(RegistryError::NotFound(_)) => StatusCode::NOT_FOUND,
            ExecutorError::StepBusy(_)
            | ExecutorError::GateClosed(_)
            | ExecutorError::NoLegacyRemovalStep
            | ExecutorError::UpgradeInProgress(_) => StatusCode::CONFLICT,
            ExecutorError::ConfirmationRequired | ExecutorError::NotLegacyRemoval(_) => {
                StatusCode::BAD_REQUEST
            }
            ExecutorError::Registry(_) | ExecutorError::Store(_) | ExecutorError::Transform(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.kind(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                kind: self.kind,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles `POST /migrations/step`.
pub(crate) async fn handle_step(
    State(state): State<Arc<ServerState>>,
    bytes: Bytes,
) -> Result<Response, ApiError> {
    let request: StepRequest = parse_body(&state, &bytes)?;
    let progress = run_blocking(&state, move |runtime| {
        runtime.progress_driver().step(&request.step_key, request.cursor)
    })
    .await?;
    Ok(Json(progress).into_response())
}

/// Handles `POST /migrations/legacy-removal`.
pub(crate) async fn handle_legacy_removal(
    State(state): State<Arc<ServerState>>,
    bytes: Bytes,
) -> Result<Response, ApiError> {
    let request: LegacyRemovalRequest = parse_body(&state, &bytes)?;
    let progress = run_blocking(&state, move |runtime| {
        runtime.progress_driver().legacy_removal_step(&request.step_key, request.confirmation)
    })
    .await?;
    Ok(Json(progress).into_response())
}

/// Handles `GET /migrations/status`.
pub(crate) async fn handle_status(
    State(state): State<Arc<ServerState>>,
) -> Result<Response, ApiError> {
    let status = run_blocking(&state, |runtime| runtime.executor().gate().status()).await?;
    Ok(Json(status).into_response())
}

/// Handles `GET /migrations/upgrade`.
pub(crate) async fn handle_upgrade(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Response, ApiError> {
    let outcome = run_blocking(&state, move |runtime| upgrade_page(runtime, &params)).await?;
    Ok(match outcome {
        UpgradeOutcome::Redirect(location, body) => {
            (StatusCode::SEE_OTHER, [(LOCATION, location)], Json(body)).into_response()
        }
        UpgradeOutcome::Done(body) => Json(body).into_response(),
    })
}

// ============================================================================
// SECTION: Upgrade Flow
// ============================================================================

/// Result of one redirect-driven request.
enum UpgradeOutcome {
    /// Redirect target and progress for the page that ran.
    Redirect(String, UpgradeResponse),
    /// Step or run finished.
    Done(UpgradeResponse),
}

/// Runs one redirect-driven page.
///
/// A named step reuses the persisted marker when it matches, starts a new
/// one when none is live, and is refused while another step's marker is.
/// Without a step the persisted marker resumes, falling back to the next
/// pending migration step.
fn upgrade_page(
    runtime: &MigrationRuntime,
    params: &BTreeMap<String, String>,
) -> Result<UpgradeOutcome, ExecutorError> {
    let driver = runtime.redirect_driver();
    let state = if let Some(step) = params.get("step") {
        driver.resume_or_start(&StepKey::new(step.as_str()), extra_params(params))?
    } else if let Some(state) = driver.resume()? {
        state
    } else if let Some(key) = runtime.progress_driver().next_pending_step()? {
        driver.start(&key, BTreeMap::new())?
    } else {
        return Ok(UpgradeOutcome::Done(UpgradeResponse {
            done: true,
            step_key: None,
            cursor: 0,
            percent: 100,
            next_step: None,
        }));
    };
    match driver.advance(state)? {
        RedirectStep::Continue(next, report) => {
            Ok(UpgradeOutcome::Redirect(upgrade_location(&next), upgrade_body(runtime, &report)))
        }
        RedirectStep::Finished(report) => Ok(UpgradeOutcome::Done(upgrade_body(runtime, &report))),
    }
}

/// Builds the upgrade response for a page report.
fn upgrade_body(runtime: &MigrationRuntime, report: &PageReport) -> UpgradeResponse {
    let next_step = if report.done {
        runtime
            .executor()
            .registry()
            .next_step_after(&report.step_key)
            .filter(|step| !step.is_legacy_removal)
            .map(|step| step.key.clone())
    } else {
        None
    };
    UpgradeResponse {
        done: report.done,
        step_key: Some(report.step_key.clone()),
        cursor: report.cursor,
        percent: report.percent,
        next_step,
    }
}

/// Returns the non-reserved query parameters.
fn extra_params(params: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    params
        .iter()
        .filter(|(name, _)| !RESERVED_PARAMS.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Encodes the self-redirect for `state`.
fn upgrade_location(state: &MigrationRunState) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(redirect_query_params(state))
        .finish();
    format!("{UPGRADE_PATH}?{query}")
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a JSON body after enforcing the size limit.
fn parse_body<T: DeserializeOwned>(state: &ServerState, bytes: &Bytes) -> Result<T, ApiError> {
    if bytes.len() > state.max_body_bytes {
        return Err(ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            "request body too large".to_string(),
        ));
    }
    serde_json::from_slice(bytes).map_err(|err| {
        ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", format!("invalid request: {err}"))
    })
}

/// Runs driver work on the blocking pool.
async fn run_blocking<T, F>(state: &Arc<ServerState>, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&MigrationRuntime) -> Result<T, ExecutorError> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || work(&state.runtime))
        .await
        .map_err(|err| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                format!("migration task failed: {err}"),
            )
        })?
        .map_err(ApiError::from)
}
