//! API Route Definitions

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::gate::access_gate;
use super::handlers::*;
use super::AppState;
use crate::host::track_requests;

/// Create all API routes under the configured prefix
pub fn create_routes(state: AppState) -> Router {
    let prefix = state.config.server.prefix.clone();
    let at = |path: &str| format!("{}{}", prefix, path);
    let upload_limit = state.config.deploy.max_upload_bytes();

    Router::new()
        .route(&at("/"), get(root))
        .route(&at("/info/"), get(get_info))
        .route(&at("/stats/"), get(get_stats))
        // Sites
        .route(&at("/sites/"), get(list_sites))
        // Read as `/sites/{id}/` with a malformed id
        .route(&at("/sites/create/"), post(create_site).get(get_site))
        .route(&at("/sites/update/"), post(update_site).get(get_site))
        .route(&at("/sites/:id/"), get(get_site))
        .route(&at("/sites/:id/stop/"), post(stop_site))
        .route(&at("/sites/:id/start/"), post(start_site))
        .route(&at("/sites/:id/restart/"), post(restart_site))
        .route(&at("/sites/:id/recycle/"), post(recycle_site))
        .route(&at("/sites/:id/delete/"), post(delete_site))
        .route(
            &at("/sites/:id/deploy/"),
            post(deploy_site).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .layer(
            ServiceBuilder::new()
                // The query string carries the API key, so only the path is traced
                .layer(TraceLayer::new_for_http().make_span_with(
                    |request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            id = %Uuid::new_v4(),
                            method = %request.method(),
                            path = %request.uri().path(),
                        )
                    },
                ))
                .layer(middleware::from_fn_with_state(
                    state.requests.clone(),
                    track_requests,
                ))
                .layer(middleware::from_fn_with_state(state.clone(), access_gate)),
        )
        .with_state(state)
}
