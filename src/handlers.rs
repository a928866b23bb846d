use crate::config::Config;
use crate::errors::{AppError, FieldViolation, ResultExt};
use crate::intent;
use crate::llm_client::OllamaClient;
use crate::maps_client::MapsService;
use crate::models::{
    ApiResponse, ChatRequest, LlmResponse, MapResponse, PlaceResult, SearchRequest,
};
use crate::validation;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Map data is only attached to a chat response when extraction
/// confidence strictly exceeds this threshold.
pub const CHAT_MAP_CONFIDENCE_THRESHOLD: f64 = 0.5;

const DEFAULT_PHOTO_WIDTH: u32 = 400;
const MAX_PHOTO_WIDTH: u32 = 1600;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Place-search provider client (owns the outbound pacing state).
    pub maps: MapsService,
    /// Local language-model client.
    pub llm: OllamaClient,
}

/// The API route table (everything except the health endpoints, which
/// are mounted separately so they bypass rate limiting).
pub fn routes() -> axum::Router<Arc<AppState>> {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/search", post(search))
        .route("/chat", post(chat))
        .route("/place", get(missing_place_id))
        .route("/place/:place_id", get(place_details))
        .route("/photo", get(missing_photo_reference))
        .route("/photo/:photo_reference", get(photo))
}

/// Health check endpoint.
///
/// Probes both upstream services concurrently. `healthy` only when both
/// respond; one down degrades, both down is unhealthy. The probes never
/// error, so this endpoint always returns 200 with a status body.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let (maps_up, llm_up) = tokio::join!(state.maps.health_check(), state.llm.health_check());

    let status = match (maps_up, llm_up) {
        (true, true) => "healthy",
        (false, false) => "unhealthy",
        _ => "degraded",
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": status,
            "timestamp": Utc::now().to_rfc3339(),
            "services": {
                "maps": if maps_up { "up" } else { "down" },
                "llm": if llm_up { "up" } else { "down" },
            }
        })),
    )
}

/// POST /search
///
/// Validates the body into a `LocationQuery` and runs the place search.
/// Place-search failure here fails the request: the search result is the
/// primary deliverable, there is no fallback.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<ApiResponse<MapResponse>>, AppError> {
    tracing::info!("POST /search");

    let query = validation::validate_search(req).map_err(|v| reject("POST", "/search", v))?;

    let map = state
        .maps
        .text_search(&query)
        .await
        .code("SEARCH_FAILED")?;

    Ok(Json(ApiResponse::ok(map)))
}

/// POST /chat
///
/// Extracts intent from the message and, when confidence clears the
/// threshold and a location was extracted, attaches place-search results
/// as `map_data`. A place-search failure here degrades to a text-only
/// response instead of failing the chat.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ApiResponse<LlmResponse>>, AppError> {
    tracing::info!("POST /chat");

    let chat = validation::validate_chat(req).map_err(|v| reject("POST", "/chat", v))?;

    let mut response = intent::extract_intent(&state.llm, &chat).await;

    if response.confidence > CHAT_MAP_CONFIDENCE_THRESHOLD {
        if let Some(mut query) = intent::generate_location_query(&response) {
            // Caller-supplied context location overrides the extracted one.
            if chat.location.is_some() {
                query.location = chat.location;
            }
            match state.maps.text_search(&query).await {
                Ok(map) => response.map_data = Some(map),
                Err(e) => {
                    tracing::warn!(
                        "Place search during chat failed ({}), returning text-only response",
                        e
                    );
                }
            }
        }
    }

    Ok(Json(ApiResponse::ok(response)))
}

/// GET /place/:place_id
pub async fn place_details(
    State(state): State<Arc<AppState>>,
    Path(place_id): Path<String>,
) -> Result<Json<ApiResponse<PlaceResult>>, AppError> {
    tracing::info!("GET /place/{}", place_id);

    let place_id = validation::validate_resource_id("placeId", &place_id)
        .map_err(|v| reject("GET", "/place/:placeId", v))?;

    let place = state
        .maps
        .place_details(&place_id)
        .await
        .code("PLACE_DETAILS_ERROR")?;

    Ok(Json(ApiResponse::ok(place)))
}

/// GET /place with no id: the path parameter is required.
pub async fn missing_place_id() -> AppError {
    AppError::BadRequest {
        code: "MISSING_PLACE_ID",
        message: "Place id path parameter is required".to_string(),
    }
}

/// Query parameters for the photo URL endpoint.
#[derive(Debug, Deserialize)]
pub struct PhotoParams {
    maxwidth: Option<u32>,
}

/// GET /photo/:photo_reference
///
/// Pure URL templating; no provider call is made.
pub async fn photo(
    State(state): State<Arc<AppState>>,
    Path(photo_reference): Path<String>,
    Query(params): Query<PhotoParams>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    tracing::info!("GET /photo/{}", photo_reference);

    let mut violations = validation::validate_resource_id("photoReference", &photo_reference)
        .err()
        .unwrap_or_default();

    let width = params.maxwidth.unwrap_or(DEFAULT_PHOTO_WIDTH);
    if width == 0 || width > MAX_PHOTO_WIDTH {
        violations.push(FieldViolation::new(
            "maxwidth",
            format!("maxwidth must be between 1 and {}", MAX_PHOTO_WIDTH),
        ));
    }
    if !violations.is_empty() {
        return Err(reject("GET", "/photo/:photoReference", violations));
    }

    let photo_url = state
        .maps
        .photo_url(photo_reference.trim(), width)
        .code("PHOTO_URL_ERROR")?;

    Ok(Json(ApiResponse::ok(json!({ "photoUrl": photo_url }))))
}

/// GET /photo with no reference: the path parameter is required.
pub async fn missing_photo_reference() -> AppError {
    AppError::BadRequest {
        code: "MISSING_PHOTO_REFERENCE",
        message: "Photo reference path parameter is required".to_string(),
    }
}

/// Logs a validation rejection (method, path, violation list, never the
/// payload itself) and wraps it for the response.
fn reject(method: &str, path: &str, violations: Vec<FieldViolation>) -> AppError {
    tracing::warn!(
        "{} {} validation failed: {:?}",
        method,
        path,
        violations
            .iter()
            .map(|v| format!("{}: {}", v.field, v.message))
            .collect::<Vec<_>>()
    );
    AppError::Validation(violations)
}
