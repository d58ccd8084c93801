// crates/storefront-migrate-server/src/server.rs
// ============================================================================
// Module: Migration Server
// Description: HTTP server exposing migration steps, status, and legacy removal.
// Purpose: Serve polling and redirect-driven clients over one executor.
// Dependencies: storefront-migrate-core, axum, tokio
// ============================================================================

//! ## Overview
//! The server mounts four routes under `/migrations` and runs every page on
//! the blocking pool, since transformers perform synchronous `SQLite` work.
//! Bodies above `server.max_body_bytes` are rejected before parsing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::routing::post;
use storefront_migrate_config::StorefrontMigrateConfig;
use tokio::net::TcpListener;

use crate::handlers::handle_legacy_removal;
use crate::handlers::handle_status;
use crate::handlers::handle_step;
use crate::handlers::handle_upgrade;
use crate::runtime::MigrationRuntime;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Lease owner label for server processes.
const SERVER_OWNER_LABEL: &str = "server";

// ============================================================================
// SECTION: Server
// ============================================================================

/// Shared state for request handlers.
pub(crate) struct ServerState {
    /// Migration runtime.
    pub(crate) runtime: MigrationRuntime,
    /// Maximum allowed request body size.
    pub(crate) max_body_bytes: usize,
}

/// Migration HTTP server instance.
pub struct MigrationServer {
    /// Parsed bind address.
    bind: SocketAddr,
    /// Handler state.
    state: Arc<ServerState>,
}

impl MigrationServer {
    /// Builds a server from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when configuration or initialization fails.
    pub fn from_config(config: &StorefrontMigrateConfig) -> Result<Self, ServerError> {
        let bind = config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let runtime = MigrationRuntime::from_config(config, SERVER_OWNER_LABEL)?;
        Ok(Self {
            bind,
            state: Arc::new(ServerState {
                runtime,
                max_body_bytes: config.server.max_body_bytes,
            }),
        })
    }

    /// Returns the configured bind address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Returns the migration runtime.
    #[must_use]
    pub fn runtime(&self) -> &MigrationRuntime {
        &self.state.runtime
    }

    /// Builds the axum router.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/migrations/step", post(handle_step))
            .route("/migrations/legacy-removal", post(handle_legacy_removal))
            .route("/migrations/status", get(handle_status))
            .route("/migrations/upgrade", get(handle_upgrade))
            .layer(DefaultBodyLimit::max(self.state.max_body_bytes.saturating_add(1)))
            .with_state(Arc::clone(&self.state))
    }

    /// Binds the configured address and serves until the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_on(listener).await
    }

    /// Serves requests on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when the server fails.
    pub async fn serve_on(self, listener: TcpListener) -> Result<(), ServerError> {
        let app = self.router();
        axum::serve(listener, app)
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Migration server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
