use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============ Domain Model ============

/// Place categories recognized by the service.
///
/// This is a closed set: anything the language model or the fallback
/// heuristics produce is mapped into one of these six values, with
/// `General` as the catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceType {
    Restaurant,
    TouristAttraction,
    GasStation,
    Hospital,
    Store,
    General,
}

impl PlaceType {
    /// Parses a loosely-typed category string; unrecognized input maps to `General`.
    pub fn from_loose(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "restaurant" => PlaceType::Restaurant,
            "tourist_attraction" => PlaceType::TouristAttraction,
            "gas_station" => PlaceType::GasStation,
            "hospital" => PlaceType::Hospital,
            "store" => PlaceType::Store,
            _ => PlaceType::General,
        }
    }

    /// Strict parse used by the validator; `None` for anything outside the set.
    pub fn from_strict(value: &str) -> Option<Self> {
        match value {
            "restaurant" => Some(PlaceType::Restaurant),
            "tourist_attraction" => Some(PlaceType::TouristAttraction),
            "gas_station" => Some(PlaceType::GasStation),
            "hospital" => Some(PlaceType::Hospital),
            "store" => Some(PlaceType::Store),
            "general" => Some(PlaceType::General),
            _ => None,
        }
    }

    /// Wire value, matching the provider's type taxonomy.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceType::Restaurant => "restaurant",
            PlaceType::TouristAttraction => "tourist_attraction",
            PlaceType::GasStation => "gas_station",
            PlaceType::Hospital => "hospital",
            PlaceType::Store => "store",
            PlaceType::General => "general",
        }
    }

    /// Human search term used when composing a free-text provider query.
    pub fn query_term(&self) -> &'static str {
        match self {
            PlaceType::Restaurant => "restaurant",
            PlaceType::TouristAttraction => "tourist attraction",
            PlaceType::GasStation => "gas station",
            PlaceType::Hospital => "hospital",
            PlaceType::Store => "store",
            PlaceType::General => "place",
        }
    }
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// A validated, immutable place-search query.
///
/// Built by the validator (or `intent::generate_location_query`) and
/// consumed once by the place-search client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationQuery {
    /// Free-text query, 1-200 chars, constrained character set.
    pub query: String,
    /// Optional place category filter.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub place_type: Option<PlaceType>,
    /// Optional location bias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<LatLng>,
    /// Optional search radius in metres, 100-50000.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<u32>,
}

/// A single photo attached to a place result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacePhoto {
    pub photo_reference: String,
    pub height: i64,
    pub width: i64,
}

/// Opening-hours summary for a place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_now: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekday_text: Option<Vec<String>>,
}

/// Geometry wrapper, matching the provider's nesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

/// A normalized place result.
///
/// Produced from provider responses; read-only downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceResult {
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub formatted_address: String,
    pub geometry: Geometry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_level: Option<u8>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<PlacePhoto>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<OpeningHours>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_phone_number: Option<String>,
}

/// A place-search result set plus the map links derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapResponse {
    pub places: Vec<PlaceResult>,
    pub map_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directions_url: Option<String>,
    /// First result's coordinates, or {0,0} when `places` is empty.
    pub center: LatLng,
    pub zoom: u8,
}

/// Structured output of the intent extractor, optionally enriched with
/// map data by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Natural-language reply shown to the user.
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_type: Option<PlaceType>,
    /// Extraction confidence, always clamped into [0, 1].
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map_data: Option<MapResponse>,
}

// ============ Inbound Request Types ============

// Raw, loosely-typed bodies. Unknown fields are stripped by serde; the
// validator coerces these into the typed model above.

/// Body of `POST /search` before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    pub query: Option<String>,
    #[serde(rename = "type")]
    pub place_type: Option<String>,
    pub location: Option<RawLatLng>,
    pub radius: Option<i64>,
}

/// Body of `POST /chat` before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    pub context: Option<ChatContext>,
}

/// Caller-supplied chat context.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatContext {
    pub location: Option<RawLatLng>,
    pub history: Option<Vec<String>>,
}

/// Unvalidated coordinate pair from a request body.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawLatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Validated chat input.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub message: String,
    pub location: Option<LatLng>,
    pub history: Vec<String>,
}

// ============ Response Envelope ============

/// Success envelope wrapping every endpoint payload.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now(),
        }
    }
}

// ============ Provider Wire Types ============

/// Raw response of the place-search provider's text-search endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacesSearchResponse {
    #[serde(default)]
    pub results: Vec<PlaceResult>,
    pub status: String,
    pub error_message: Option<String>,
}

/// Raw response of the place-details endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceDetailsResponse {
    pub result: Option<PlaceResult>,
    pub status: String,
    pub error_message: Option<String>,
}

/// Body sent to the language model's generate endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
    pub options: GenerateOptions,
}

/// Sampling options; kept near-deterministic for intent extraction.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub num_predict: u32,
    pub stop: Vec<String>,
}

/// Body returned by the language model's generate endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
    #[serde(default)]
    pub done: bool,
}
