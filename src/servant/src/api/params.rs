//! Typed request parameters
//!
//! Route parameters are parsed explicitly into tagged values; handlers
//! decide how a missing or malformed value is answered.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header, request::Parts},
    Form, Json,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;

use super::error::ApiError;
use crate::site::Site;

/// The `{id}` segment of a site route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteIdParam {
    Valid(i64),
    Missing,
    Malformed(String),
}

impl SiteIdParam {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => SiteIdParam::Missing,
            Some(value) => match value.parse::<i64>() {
                Ok(id) if id > 0 => SiteIdParam::Valid(id),
                _ => SiteIdParam::Malformed(value.to_string()),
            },
        }
    }

    /// The id when present and well-formed
    pub fn id(&self) -> Option<i64> {
        match self {
            SiteIdParam::Valid(id) => Some(*id),
            _ => None,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SiteIdParam
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let params = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map(|Path(params)| params)
            .unwrap_or_default();

        Ok(SiteIdParam::parse(params.get("id").map(String::as_str)))
    }
}

/// `?name=` of the update route
#[derive(Debug, Default, Deserialize)]
pub struct SiteNameQuery {
    #[serde(alias = "Name")]
    pub name: Option<String>,
}

/// Form body carrying a serialized site in its `data` field
#[derive(Debug, Deserialize)]
struct SiteForm {
    #[serde(alias = "Data")]
    data: String,
}

/// A site posted either as JSON or as form field `data`
#[derive(Debug)]
pub struct SitePayload(pub Site);

#[async_trait]
impl<S> FromRequest<S> for SitePayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.starts_with("application/json"))
            .unwrap_or(false);

        if is_json {
            let Json(site) = Json::<Site>::from_request(req, state)
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            return Ok(SitePayload(site));
        }

        let Form(form) = Form::<SiteForm>::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        serde_json::from_str(&form.data)
            .map(SitePayload)
            .map_err(|e| ApiError::BadRequest(format!("Invalid site data: {}", e)))
    }
}
