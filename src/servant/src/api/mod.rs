//! HTTP API Module
//!
//! Administrative API for IIS sites: status, lifecycle and deploys.

pub mod error;
pub mod gate;
pub mod handlers;
pub mod params;
pub mod routes;
pub mod schema;

use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;

pub use error::ApiError;
pub use routes::create_routes;

use crate::config::Config;
use crate::deploy::DeployLocks;
use crate::host::{HostMonitor, RequestMetrics};
use crate::site::SiteManager;

/// Shared state handed to every route
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sites: Arc<dyn SiteManager>,
    pub host: Arc<HostMonitor>,
    pub requests: Arc<RequestMetrics>,
    pub deploys: Arc<DeployLocks>,
}

impl AppState {
    pub fn new(config: Config, sites: Arc<dyn SiteManager>) -> Self {
        Self {
            config: Arc::new(config),
            sites,
            host: Arc::new(HostMonitor::new()),
            requests: Arc::new(RequestMetrics::new()),
            deploys: Arc::new(DeployLocks::new()),
        }
    }
}

/// Build the router for a configuration and site manager
pub fn router(config: Config, sites: Arc<dyn SiteManager>) -> Router {
    create_routes(AppState::new(config, sites))
}

/// API server
pub struct ApiServer {
    state: AppState,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(config: Config, sites: Arc<dyn SiteManager>) -> Self {
        Self {
            state: AppState::new(config, sites),
        }
    }

    /// Serve until Ctrl-C
    pub async fn start(&self) -> Result<()> {
        let addr = self.state.config.listen_addr();
        let app = create_routes(self.state.clone());

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        tracing::info!(
            "API server listening on http://{}{}/",
            addr,
            self.state.config.server.prefix
        );
        if self.state.config.api.enable_api {
            tracing::warn!("API is enabled for every caller; the key is not checked");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("API server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
