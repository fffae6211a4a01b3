//! HTTP handlers for deck lookups and cache management.
//!
//! Deck lookups go through the fetch-through cache, so repeated requests for
//! the same play code inside the TTL never reach the Cardcast catalog.

use crate::api::state::AppState;
use crate::application::{CacheStats, DeckCache};
use crate::domain::{Deck, DeckError, DeckInfo};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use validator::Validate;

#[allow(unused_imports)]
use serde_json::json; // Used in utoipa::path examples

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Request / Response Types
// ============================================================================

/// Play code path parameter, after normalization
#[derive(Debug, Validate)]
struct DeckCodeParams {
    #[validate(length(min = 1, max = 64))]
    code: String,
}

/// Body for `PUT /v1/cache/ttl`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct TtlUpdate {
    /// New time-to-live in seconds. Zero or negative disables caching.
    #[validate(range(min = -31536000.0, max = 31536000.0))]
    pub ttl_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvalidateResponse {
    /// Normalized play code
    pub code: String,
    /// Whether a cached deck was removed
    pub invalidated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClearResponse {
    /// Number of cached decks removed
    pub cleared: usize,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Base URL of the Cardcast catalog decks are fetched from
    pub catalog: String,
    pub cached_decks: usize,
    pub ttl_seconds: f64,
}

/// Error response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn validate_code(raw: &str) -> Result<String, ApiError> {
    let params = DeckCodeParams {
        code: DeckCache::normalize_code(raw),
    };
    if let Err(validation_errors) = params.validate() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(format!("{:?}", validation_errors)),
            }),
        ));
    }
    Ok(params.code)
}

/// Map a failed lookup to a status: missing decks are 404, everything else
/// is the upstream's fault.
fn deck_error_response(code: &str, e: DeckError) -> ApiError {
    let (status, error) = if e.is_not_found() {
        (StatusCode::NOT_FOUND, format!("Deck not found: {}", code))
    } else if e.is_timeout() {
        (
            StatusCode::GATEWAY_TIMEOUT,
            format!("Timed out fetching deck: {}", code),
        )
    } else {
        tracing::error!("Failed to fetch deck {}: {}", code, e);
        (
            StatusCode::BAD_GATEWAY,
            format!("Failed to fetch deck: {}", code),
        )
    };

    (
        status,
        Json(ErrorResponse {
            error,
            details: Some(e.to_string()),
        }),
    )
}

// ============================================================================
// System Handlers
// ============================================================================

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Health check passed", body = HealthResponse)
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: VERSION.to_string(),
        catalog: state.catalog_url.clone(),
        cached_decks: state.deck_cache.len(),
        ttl_seconds: state.deck_cache.ttl_seconds(),
    })
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "system",
    responses(
        (status = 200, description = "Prometheus metrics", content_type = "text/plain"),
        (status = 503, description = "Metrics recorder not installed")
    )
)]
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

// ============================================================================
// Deck Handlers
// ============================================================================

/// Get a full deck (cards and metadata) by play code
#[utoipa::path(
    get,
    path = "/v1/decks/{code}",
    params(
        ("code" = String, Path, description = "Deck play code (case-insensitive)", example = "ABC12")
    ),
    responses(
        (status = 200, description = "Deck with calls, responses and metadata", body = Deck),
        (status = 400, description = "Invalid play code", body = ErrorResponse),
        (status = 404, description = "Deck not found in the catalog", body = ErrorResponse),
        (status = 502, description = "Catalog call failed", body = ErrorResponse),
        (status = 504, description = "Catalog call timed out", body = ErrorResponse)
    ),
    description = "Serves the deck from cache while it is fresh; otherwise fetches its cards and metadata from Cardcast and caches the merged result.",
    tag = "Decks"
)]
#[instrument(skip(state))]
pub async fn deck_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Arc<Deck>>, ApiError> {
    let code = validate_code(&code)?;
    metrics::counter!("api_requests_total", "endpoint" => "deck").increment(1);

    state
        .deck_cache
        .get_deck(&code)
        .await
        .map(Json)
        .map_err(|e| deck_error_response(&code, e))
}

/// Get only the metadata of a deck
#[utoipa::path(
    get,
    path = "/v1/decks/{code}/info",
    params(
        ("code" = String, Path, description = "Deck play code (case-insensitive)", example = "ABC12")
    ),
    responses(
        (status = 200, description = "Deck metadata", body = DeckInfo,
            example = json!({
                "name": "Example Deck",
                "code": "ABC12",
                "call_count": 40,
                "response_count": 120,
                "rating": 4.5,
                "author": { "id": "a1", "username": "dealer" }
            })
        ),
        (status = 400, description = "Invalid play code", body = ErrorResponse),
        (status = 404, description = "Deck not found in the catalog", body = ErrorResponse),
        (status = 502, description = "Catalog call failed", body = ErrorResponse)
    ),
    tag = "Decks"
)]
#[instrument(skip(state))]
pub async fn deck_info_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DeckInfo>, ApiError> {
    let code = validate_code(&code)?;
    metrics::counter!("api_requests_total", "endpoint" => "deck_info").increment(1);

    state
        .deck_cache
        .get_deck(&code)
        .await
        .map(|deck| Json(deck.info.clone()))
        .map_err(|e| deck_error_response(&code, e))
}

/// Drop a deck from the cache
#[utoipa::path(
    delete,
    path = "/v1/decks/{code}",
    params(
        ("code" = String, Path, description = "Deck play code (case-insensitive)")
    ),
    responses(
        (status = 200, description = "Invalidation result", body = InvalidateResponse,
            example = json!({ "code": "abc12", "invalidated": true })
        ),
        (status = 400, description = "Invalid play code", body = ErrorResponse)
    ),
    tag = "Cache"
)]
#[instrument(skip(state))]
pub async fn invalidate_deck_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    let code = validate_code(&code)?;
    let invalidated = state.deck_cache.invalidate(&code);
    Ok(Json(InvalidateResponse { code, invalidated }))
}

// ============================================================================
// Cache Handlers
// ============================================================================

/// Cache statistics
#[utoipa::path(
    get,
    path = "/v1/cache/stats",
    responses(
        (status = 200, description = "Cache statistics", body = CacheStats)
    ),
    tag = "Cache"
)]
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.deck_cache.stats())
}

/// Drop every cached deck
#[utoipa::path(
    delete,
    path = "/v1/cache",
    responses(
        (status = 200, description = "Number of decks removed", body = ClearResponse,
            example = json!({ "cleared": 3 })
        )
    ),
    tag = "Cache"
)]
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    Json(ClearResponse {
        cleared: state.deck_cache.clear(),
    })
}

/// Change the cache TTL
#[utoipa::path(
    put,
    path = "/v1/cache/ttl",
    request_body = TtlUpdate,
    responses(
        (status = 200, description = "TTL updated", body = TtlUpdate),
        (status = 400, description = "Invalid TTL", body = ErrorResponse)
    ),
    tag = "Cache"
)]
pub async fn update_ttl_handler(
    State(state): State<AppState>,
    Json(update): Json<TtlUpdate>,
) -> Result<Json<TtlUpdate>, ApiError> {
    if let Err(validation_errors) = update.validate() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Validation failed".to_string(),
                details: Some(format!("{:?}", validation_errors)),
            }),
        ));
    }
    state.deck_cache.set_ttl_seconds(update.ttl_seconds);
    Ok(Json(update))
}
