//! Access gate run in front of every API route

use axum::{
    extract::{Query, Request, State},
    http::Uri,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{error::ApiError, AppState};

/// Reject the request with a plain 404 unless the API is enabled or the
/// `key` query parameter equals the configured secret.
pub async fn access_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = supplied_key(request.uri());

    if !state.config.api.permits(key.as_deref()) {
        tracing::debug!(path = %request.uri().path(), "Rejected API request");
        return ApiError::Unauthorized.into_response();
    }

    next.run(request).await
}

/// First `key` (or `Key`) query parameter of `uri`
fn supplied_key(uri: &Uri) -> Option<String> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(uri).ok()?;

    pairs
        .into_iter()
        .find(|(name, _)| name == "key" || name == "Key")
        .map(|(_, value)| value)
}
