use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Uri},
};

use super::service::AdService;
use super::upstream::{self, upstream_url};
use crate::common::error::AppError;
use crate::common::response::Xml;
use crate::state::AppState;

async fn fetch_upstream(state: &AppState, uri: &Uri, headers: &HeaderMap) -> Result<Bytes, AppError> {
    let url = upstream_url(&state.config.ad_server_url, uri.path(), uri.query());
    upstream::fetch(&state.http, url, headers).await
}

/// A document posted by the caller is its problem when it does not parse.
fn reject_body(err: AppError) -> AppError {
    match err {
        AppError::Decode(e) => AppError::BadRequest(format!("invalid ad document: {e}")),
        other => other,
    }
}

/// Normalized VAST from the ad server
#[utoipa::path(
    get,
    path = "/api/v1/vast",
    params(
        ("subdomain" = Option<String>, Query, description = "Replaces the ad server's subdomain; every other query parameter is forwarded")
    ),
    responses(
        (status = 200, description = "VAST with transcoded creatives", content_type = "application/xml", body = String),
        (status = 500, description = "Ad document could not be fetched or decoded")
    ),
    tag = "Ads"
)]
pub async fn get_vast(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Xml, AppError> {
    let body = fetch_upstream(&state, &uri, &headers).await?;
    AdService::normalize_vast(&state, &body).await.map(Xml)
}

/// Normalize a posted VAST document
#[utoipa::path(
    post,
    path = "/api/v1/vast",
    request_body(content = String, content_type = "application/xml"),
    responses(
        (status = 200, description = "VAST with transcoded creatives", content_type = "application/xml", body = String),
        (status = 400, description = "Body is not a VAST document")
    ),
    tag = "Ads"
)]
pub async fn post_vast(State(state): State<AppState>, body: Bytes) -> Result<Xml, AppError> {
    AdService::normalize_vast(&state, &body)
        .await
        .map(Xml)
        .map_err(reject_body)
}

/// Normalized VMAP from the ad server
#[utoipa::path(
    get,
    path = "/api/v1/vmap",
    params(
        ("subdomain" = Option<String>, Query, description = "Replaces the ad server's subdomain; every other query parameter is forwarded")
    ),
    responses(
        (status = 200, description = "VMAP with transcoded creatives in every ad break", content_type = "application/xml", body = String),
        (status = 500, description = "Ad document could not be fetched or decoded")
    ),
    tag = "Ads"
)]
pub async fn get_vmap(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Xml, AppError> {
    let body = fetch_upstream(&state, &uri, &headers).await?;
    AdService::normalize_vmap(&state, &body).await.map(Xml)
}

/// Normalize a posted VMAP document
#[utoipa::path(
    post,
    path = "/api/v1/vmap",
    request_body(content = String, content_type = "application/xml"),
    responses(
        (status = 200, description = "VMAP with transcoded creatives in every ad break", content_type = "application/xml", body = String),
        (status = 400, description = "Body is not a VMAP document")
    ),
    tag = "Ads"
)]
pub async fn post_vmap(State(state): State<AppState>, body: Bytes) -> Result<Xml, AppError> {
    AdService::normalize_vmap(&state, &body)
        .await
        .map(Xml)
        .map_err(reject_body)
}
