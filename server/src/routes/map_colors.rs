use axum::Json;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use lavender_shared::{ColorMapping, ColorRegistry, MapVariant, RegistryError, Rgb, seeds};
use serde::Deserialize;

use crate::auth::require_admin;
use crate::config::MAX_REGION_NAME_LEN;
use crate::state::AppState;
use crate::store::StoreError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<StatusCode> for ApiError {
    fn from(status: StatusCode) -> Self {
        let message = status.canonical_reason().unwrap_or("request failed");
        Self::new(status, message)
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::EmptyRegion => Self::bad_request(e.to_string()),
            RegistryError::UnknownRegion(_) => Self::new(StatusCode::NOT_FOUND, e.to_string()),
            RegistryError::RegionTaken(_) => Self::new(StatusCode::CONFLICT, e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct MappingRequest {
    #[serde(alias = "state")]
    region: String,
    color: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegionQuery {
    region: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    from: String,
    to: String,
}

fn parse_variant(raw: &str) -> Result<MapVariant, ApiError> {
    raw.parse::<MapVariant>()
        .map_err(|e| ApiError::new(StatusCode::NOT_FOUND, e.to_string()))
}

fn validate_region(name: &str) -> Result<&str, ApiError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RegistryError::EmptyRegion.into());
    }
    if trimmed.chars().count() > MAX_REGION_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "region name longer than {MAX_REGION_NAME_LEN} characters"
        )));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(ApiError::bad_request("region name contains control characters"));
    }
    Ok(trimmed)
}

fn store_failure(action: &'static str, variant: MapVariant, e: StoreError) -> ApiError {
    tracing::error!(error = %e, %variant, "failed to {action} map colors");
    ApiError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("failed to {action} {variant} map colors"),
    )
}

/// Load, modify and persist one variant's mappings under the write lock.
/// The cached copy only changes when the store accepted the write.
async fn mutate_registry<T>(
    state: &AppState,
    variant: MapVariant,
    apply: impl FnOnce(&mut ColorRegistry) -> Result<T, ApiError>,
) -> Result<T, ApiError> {
    let _guard = state.write_lock.lock().await;
    let mut registry = state
        .registry(variant)
        .await
        .map_err(|e| store_failure("read", variant, e))?;
    let out = apply(&mut registry)?;
    state
        .commit_registry(variant, registry)
        .await
        .map_err(|e| store_failure("write", variant, e))?;
    Ok(out)
}

fn registry_etag(variant: MapVariant, registry: &ColorRegistry) -> String {
    format!("\"{variant}-{:08x}\"", registry.fingerprint())
}

pub async fn get_map_colors(
    State(state): State<AppState>,
    Path(variant): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let variant = parse_variant(&variant)?;
    state.observability.record_registry_read();
    let registry = state
        .registry(variant)
        .await
        .map_err(|e| store_failure("read", variant, e))?;
    let etag = registry_etag(variant, &registry);
    if if_none_match_matches(&headers, &etag) {
        return Ok(not_modified_response("no-cache", Some(etag.as_str())));
    }
    let body = serde_json::to_vec(&registry).map_err(|e| {
        tracing::error!(error = %e, %variant, "failed to serialize map colors");
        ApiError::from(StatusCode::INTERNAL_SERVER_ERROR)
    })?;
    Ok(json_bytes_response(
        Bytes::from(body),
        "no-cache",
        Some(etag.as_str()),
    ))
}

pub async fn post_map_color(
    State(state): State<AppState>,
    Path(variant): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<MappingRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let variant = parse_variant(&variant)?;
    if let Err(status) = require_admin(&state, &headers) {
        state.observability.record_rejected_write();
        return Err(status.into());
    }
    let Json(request) = payload?;
    let region = validate_region(&request.region)?;
    let color: Rgb = request
        .color
        .parse()
        .map_err(|e| ApiError::bad_request(format!("invalid color: {e}")))?;
    let mapping = ColorMapping::new(region, color)?;

    let stored = mapping.clone();
    mutate_registry(&state, variant, move |registry| {
        registry.upsert(mapping, variant.upsert_mode());
        Ok(())
    })
    .await?;
    tracing::info!(%variant, region = %stored.region, color = %stored.color, "saved map color");

    Ok((StatusCode::CREATED, Json(stored)).into_response())
}

pub async fn delete_map_color(
    State(state): State<AppState>,
    Path(variant): Path<String>,
    Query(query): Query<RegionQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let variant = parse_variant(&variant)?;
    if let Err(status) = require_admin(&state, &headers) {
        state.observability.record_rejected_write();
        return Err(status.into());
    }
    let Some(region) = query
        .region
        .or(query.state)
        .filter(|region| !region.trim().is_empty())
    else {
        return Err(ApiError::bad_request("region name is required"));
    };
    let region = region.trim().to_owned();

    let removed = mutate_registry(&state, variant, |registry| Ok(registry.remove(&region))).await?;
    tracing::info!(%variant, %region, removed, "deleted map colors");

    Ok(Json(serde_json::json!({ "success": true, "removed": removed })).into_response())
}

pub async fn rename_region(
    State(state): State<AppState>,
    Path(variant): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let variant = parse_variant(&variant)?;
    if let Err(status) = require_admin(&state, &headers) {
        state.observability.record_rejected_write();
        return Err(status.into());
    }
    let Json(request) = payload?;
    let to = validate_region(&request.to)?.to_owned();
    let from = request.from.trim().to_owned();

    let renamed = mutate_registry(&state, variant, |registry| {
        Ok(registry.rename(&from, &to, variant.upsert_mode())?)
    })
    .await?;
    tracing::info!(%variant, %from, %to, renamed, "renamed region");

    Ok(Json(serde_json::json!({ "success": true, "renamed": renamed })).into_response())
}

pub async fn get_conflicts(
    State(state): State<AppState>,
    Path(variant): Path<String>,
) -> Result<Response, ApiError> {
    let variant = parse_variant(&variant)?;
    let registry = state
        .registry(variant)
        .await
        .map_err(|e| store_failure("read", variant, e))?;
    let updated_at = state
        .store
        .updated_at(variant.storage_key())
        .await
        .map_err(|e| store_failure("read", variant, e))?;
    Ok(Json(serde_json::json!({
        "variant": variant,
        "updated_at": updated_at,
        "conflicts": registry.shared_colors(),
    }))
    .into_response())
}

/// Replace the presidency mappings with the stock fill/border/stripe set.
pub async fn seed_defaults(
    State(state): State<AppState>,
    Path(variant): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let variant = parse_variant(&variant)?;
    if variant != MapVariant::Presidencies {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!("no default mappings for {variant}"),
        ));
    }
    if let Err(status) = require_admin(&state, &headers) {
        state.observability.record_rejected_write();
        return Err(status.into());
    }

    let count = mutate_registry(&state, variant, |registry| {
        *registry = ColorRegistry::from_mappings(seeds::presidency_defaults());
        Ok(registry.len())
    })
    .await?;
    tracing::info!(%variant, count, "seeded default map colors");

    Ok(Json(serde_json::json!({ "success": true, "count": count })).into_response())
}

fn json_bytes_response(body: Bytes, cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}
