//! API Request Handlers

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::path::Path;
use tracing::info;

use super::error::ApiError;
use super::params::{SiteIdParam, SiteNameQuery, SitePayload};
use super::schema::{DeleteResponse, StatsResponse};
use super::AppState;
use crate::deploy::{deploy_target, extract_archive};
use crate::site::{ServantServerInfo, Site};

pub const IDENTIFICATION: &str = "Servant API";
pub const MISSING_SITE_ID: &str = "IIS Site ID is missing.";
pub const MISSING_ZIPFILE: &str = "Zipfile is missing.";

impl AppState {
    /// Resolve a route id to an existing site
    fn find_site(&self, id: &SiteIdParam) -> Result<Site, ApiError> {
        let id = id.id().ok_or(ApiError::NotFound)?;
        self.sites.get_site_by_id(id)?.ok_or(ApiError::NotFound)
    }

    /// Re-read a site after the manager acted on it
    fn reload(&self, site: Site) -> Result<Site, ApiError> {
        Ok(self.sites.get_site_by_id(site.iis_id)?.unwrap_or(site))
    }
}

/// Convert a failure on site `iis_id`, logging it when it is internal
fn site_failure<E>(iis_id: i64, action: &'static str) -> impl FnOnce(E) -> ApiError
where
    E: Into<ApiError>,
{
    move |err| {
        let err = err.into();
        if let ApiError::Internal(detail) = &err {
            tracing::error!(iis_id, action, detail = %detail, "Site operation failed");
        }
        err
    }
}

/// Fixed identification string
pub async fn root() -> &'static str {
    IDENTIFICATION
}

/// Application pools and certificates
pub async fn get_info(State(state): State<AppState>) -> Result<Json<ServantServerInfo>, ApiError> {
    Ok(Json(ServantServerInfo::collect(state.sites.as_ref())?))
}

/// Host figures and site counts
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let sites = state.sites.get_sites(true)?;

    let host = std::sync::Arc::clone(&state.host);
    let snapshot = tokio::task::spawn_blocking(move || host.snapshot()).await?;

    Ok(Json(StatsResponse::new(
        snapshot,
        state.requests.average_get_requests_per_second(),
        state.requests.current_connections(),
        &sites,
    )))
}

/// Every site, stopped ones included
pub async fn list_sites(State(state): State<AppState>) -> Result<Json<Vec<Site>>, ApiError> {
    Ok(Json(state.sites.get_sites(true)?))
}

/// A single site by id
pub async fn get_site(
    State(state): State<AppState>,
    id: SiteIdParam,
) -> Result<Json<Site>, ApiError> {
    Ok(Json(state.find_site(&id)?))
}

pub async fn stop_site(
    State(state): State<AppState>,
    id: SiteIdParam,
) -> Result<Json<Site>, ApiError> {
    let site = state.find_site(&id)?;
    state
        .sites
        .stop_site(&site)
        .map_err(site_failure(site.iis_id, "stop"))?;
    Ok(Json(state.reload(site)?))
}

pub async fn start_site(
    State(state): State<AppState>,
    id: SiteIdParam,
) -> Result<Json<Site>, ApiError> {
    let site = state.find_site(&id)?;
    state
        .sites
        .start_site(&site)
        .map_err(site_failure(site.iis_id, "start"))?;
    Ok(Json(state.reload(site)?))
}

pub async fn restart_site(
    State(state): State<AppState>,
    id: SiteIdParam,
) -> Result<Json<Site>, ApiError> {
    let site = state.find_site(&id)?;
    state
        .sites
        .restart_site(site.iis_id)
        .map_err(site_failure(site.iis_id, "restart"))?;
    Ok(Json(state.reload(site)?))
}

pub async fn recycle_site(
    State(state): State<AppState>,
    id: SiteIdParam,
) -> Result<Json<Site>, ApiError> {
    let site = state.find_site(&id)?;
    state
        .sites
        .recycle_application_pool(&site.application_pool)
        .map_err(site_failure(site.iis_id, "recycle"))?;
    Ok(Json(state.reload(site)?))
}

/// Create a site; answers with its id, or the full result when legacy
/// responses are turned off
pub async fn create_site(
    State(state): State<AppState>,
    SitePayload(site): SitePayload,
) -> Result<Response, ApiError> {
    let result = state.sites.create_site(site)?;

    if !result.is_success() {
        tracing::warn!(errors = ?result.errors, "Site creation reported errors");
    }

    if state.config.compat.legacy_create_response {
        return Ok((StatusCode::OK, result.iis_site_id.to_string()).into_response());
    }

    Ok(Json(result).into_response())
}

/// Overwrite every settable field of the site named by `?name=`
pub async fn update_site(
    State(state): State<AppState>,
    Query(query): Query<SiteNameQuery>,
    payload: Result<SitePayload, ApiError>,
) -> Result<Json<Site>, ApiError> {
    let name = query.name.ok_or(ApiError::NotFound)?;
    let mut site = state
        .sites
        .get_site_by_name(&name)?
        .ok_or(ApiError::NotFound)?;
    let SitePayload(posted) = payload?;

    site.application_pool = posted.application_pool;
    site.name = posted.name;
    site.site_state = posted.site_state;
    site.bindings = posted.bindings;
    site.log_file_directory = posted.log_file_directory;
    site.site_path = posted.site_path;

    state
        .sites
        .update_site(&site)
        .map_err(site_failure(site.iis_id, "update"))?;

    Ok(Json(site))
}

pub async fn delete_site(
    State(state): State<AppState>,
    id: SiteIdParam,
) -> Result<Json<DeleteResponse>, ApiError> {
    let site = state.find_site(&id)?;
    state
        .sites
        .delete_site(site.iis_id)
        .map_err(site_failure(site.iis_id, "delete"))?;

    Ok(Json(DeleteResponse { success: true }))
}

/// Unpack an uploaded zip next to the site's content and repoint the site
pub async fn deploy_site(
    State(state): State<AppState>,
    id: SiteIdParam,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Site>, ApiError> {
    let iis_id = id
        .id()
        .ok_or_else(|| ApiError::BadRequest(MISSING_SITE_ID.to_string()))?;

    let (file_name, data) = match multipart {
        Ok(multipart) => first_upload(multipart).await?,
        Err(_) => None,
    }
    .ok_or_else(|| ApiError::BadRequest(MISSING_ZIPFILE.to_string()))?;

    let _deploying = state.deploys.acquire(iis_id).await;

    // Read after locking so a deploy queued behind another sees its path
    let mut site = state
        .sites
        .get_site_by_id(iis_id)?
        .ok_or(ApiError::NotFound)?;

    let current = Path::new(&site.site_path);
    if !current.is_absolute() {
        return Err(site_failure(iis_id, "deploy")(ApiError::Internal(format!(
            "site path '{}' is not an absolute directory",
            site.site_path
        ))));
    }

    let target = deploy_target(current, &file_name);
    let files = extract_archive(data, target.clone())
        .await
        .map_err(site_failure(iis_id, "deploy"))?;

    site.site_path = target.to_string_lossy().to_string();
    state
        .sites
        .update_site(&site)
        .map_err(site_failure(iis_id, "deploy"))?;

    info!(
        iis_id,
        files,
        bundle = %file_name,
        "Deployed site {} to {}",
        site.name,
        site.site_path
    );

    Ok(Json(site))
}

/// Name and content of the first uploaded file in the form
async fn first_upload(mut multipart: Multipart) -> Result<Option<(String, Vec<u8>)>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };

        let data = field.bytes().await?;
        return Ok(Some((file_name, data.to_vec())));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::SiteError;

    #[test]
    fn test_site_failure_keeps_status_mapping() {
        assert!(matches!(
            site_failure(3, "stop")(SiteError::NotFound(3)),
            ApiError::NotFound
        ));
        assert!(matches!(
            site_failure(3, "stop")(SiteError::Poisoned),
            ApiError::Internal(_)
        ));
        assert!(matches!(
            site_failure::<ApiError>(3, "deploy")(ApiError::BadRequest("x".to_string())),
            ApiError::BadRequest(_)
        ));
    }
}
