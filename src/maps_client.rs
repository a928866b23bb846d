use crate::config::Config;
use crate::errors::AppError;
use crate::models::{
    LatLng, LocationQuery, MapResponse, PlaceDetailsResponse, PlaceResult, PlaceType,
    PlacesSearchResponse,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Place lookups carry no documented upstream bound; this is the
/// conservative client-side one.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

/// Minimum spacing between consecutive outbound provider calls.
pub const MIN_CALL_INTERVAL: Duration = Duration::from_millis(100);

pub const DEFAULT_ZOOM: u8 = 13;
const SANITIZED_MAX_LEN: usize = 200;

const EMBED_URL: &str = "https://www.google.com/maps/embed/v1/search";
const DIRECTIONS_URL: &str = "https://www.google.com/maps/dir/?api=1";

/// Strips markup-significant characters (`< > " ' &`) and truncates to
/// 200 characters. Applied to any free text before it reaches an
/// outbound request or URL. No-op on clean short input.
pub fn sanitize_query(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\'' | '&'))
        .take(SANITIZED_MAX_LEN)
        .collect()
}

/// Leaky-bucket-of-one throttle: a call arriving sooner than
/// `min_interval` after the previous one suspends until the interval has
/// elapsed. Not a token bucket: there is no burst credit.
///
/// The mutex is held across the check-sleep-stamp sequence so two
/// concurrent calls can never both observe a stale timestamp and bypass
/// the delay.
struct Pacer {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
    requests: AtomicU64,
}

impl Pacer {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
            requests: AtomicU64::new(0),
        }
    }

    async fn pace(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

/// Client for the place-search provider (Google Maps Places-compatible).
#[derive(Clone)]
pub struct MapsService {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    pacer: Arc<Pacer>,
}

impl MapsService {
    /// Creates a new `MapsService` from configuration.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create maps client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.maps_base_url.clone(),
            api_key: config.maps_api_key.clone(),
            pacer: Arc::new(Pacer::new(MIN_CALL_INTERVAL)),
        })
    }

    /// Number of paced provider calls made by this instance.
    #[allow(dead_code)]
    pub fn request_count(&self) -> u64 {
        self.pacer.request_count()
    }

    /// Runs a text search against the provider and composes the map
    /// response. `ZERO_RESULTS` is a valid empty result; any other
    /// non-`OK` provider status is an error carrying the provider's
    /// status and message.
    pub async fn text_search(&self, query: &LocationQuery) -> Result<MapResponse, AppError> {
        self.pacer.pace().await;

        let sanitized = sanitize_query(&query.query);
        let mut params: Vec<(&str, String)> = vec![
            ("query", sanitized.clone()),
            ("key", self.api_key.clone()),
        ];
        if let Some(radius) = query.radius {
            params.push(("radius", radius.to_string()));
        }
        if let Some(place_type) = query.place_type.filter(|t| *t != PlaceType::General) {
            params.push(("type", place_type.as_str().to_string()));
        }
        if let Some(location) = query.location {
            params.push(("location", format!("{},{}", location.lat, location.lng)));
        }

        let url = reqwest::Url::parse_with_params(
            &format!("{}/place/textsearch/json", self.base_url),
            &params,
        )
        .map_err(|e| AppError::internal(format!("Failed to build search URL: {}", e)))?;

        tracing::info!("Places text search: \"{}\"", sanitized);
        // Redact key from logs to prevent credential exposure
        tracing::debug!(
            "Places URL: {}/place/textsearch/json?key=[REDACTED]&query={}",
            self.base_url,
            sanitized
        );

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("Places request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::upstream(format!(
                "Places API returned HTTP {}: {}",
                status, error_text
            )));
        }

        let body: PlacesSearchResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("Failed to parse Places response: {}", e)))?;

        match body.status.as_str() {
            "OK" | "ZERO_RESULTS" => {}
            status => {
                return Err(AppError::upstream(format!(
                    "Places API status {}: {}",
                    status,
                    body.error_message.unwrap_or_default()
                )));
            }
        }

        tracing::info!("Places search returned {} result(s)", body.results.len());
        self.compose_map(body.results, &sanitized)
    }

    /// Fetches detail for a single place id.
    pub async fn place_details(&self, place_id: &str) -> Result<PlaceResult, AppError> {
        self.pacer.pace().await;

        let url = reqwest::Url::parse_with_params(
            &format!("{}/place/details/json", self.base_url),
            &[
                ("place_id", place_id),
                (
                    "fields",
                    "place_id,name,formatted_address,geometry,rating,price_level,types,photos,\
                     opening_hours,website,formatted_phone_number",
                ),
                ("key", self.api_key.as_str()),
            ],
        )
        .map_err(|e| AppError::internal(format!("Failed to build details URL: {}", e)))?;

        tracing::info!("Fetching place details: {}", place_id);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("Place details request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::upstream(format!(
                "Places API returned HTTP {}: {}",
                status, error_text
            )));
        }

        let body: PlaceDetailsResponse = response
            .json()
            .await
            .map_err(|e| AppError::upstream(format!("Failed to parse details response: {}", e)))?;

        if body.status != "OK" {
            return Err(AppError::upstream(format!(
                "Places API status {}: {}",
                body.status,
                body.error_message.unwrap_or_default()
            )));
        }

        body.result
            .ok_or_else(|| AppError::upstream("Places API returned OK without a result"))
    }

    /// Builds a provider photo-fetch URL. Pure templating, no network call.
    pub fn photo_url(&self, photo_reference: &str, max_width: u32) -> Result<String, AppError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/place/photo", self.base_url),
            &[
                ("maxwidth", max_width.to_string()),
                ("photo_reference", photo_reference.to_string()),
                ("key", self.api_key.clone()),
            ],
        )
        .map_err(|e| AppError::internal(format!("Failed to build photo URL: {}", e)))?;
        Ok(url.to_string())
    }

    /// Liveness probe against the provider. Never errors, bypasses pacing.
    pub async fn health_check(&self) -> bool {
        let url = match reqwest::Url::parse_with_params(
            &format!("{}/place/textsearch/json", self.base_url),
            &[("query", "health"), ("key", self.api_key.as_str())],
        ) {
            Ok(url) => url,
            Err(_) => return false,
        };

        match self.client.get(url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::warn!("Maps health check failed: {}", e);
                false
            }
        }
    }

    fn compose_map(
        &self,
        places: Vec<PlaceResult>,
        sanitized_query: &str,
    ) -> Result<MapResponse, AppError> {
        let center = places
            .first()
            .map(|p| p.geometry.location)
            .unwrap_or(LatLng { lat: 0.0, lng: 0.0 });

        let map_url = reqwest::Url::parse_with_params(
            EMBED_URL,
            &[("key", self.api_key.as_str()), ("q", sanitized_query)],
        )
        .map_err(|e| AppError::internal(format!("Failed to build map URL: {}", e)))?
        .to_string();

        let directions_url = places.first().map(|p| {
            format!(
                "{}&destination={},{}&destination_place_id={}",
                DIRECTIONS_URL, p.geometry.location.lat, p.geometry.location.lng, p.place_id
            )
        });

        Ok(MapResponse {
            places,
            map_url,
            directions_url,
            center,
            zoom: DEFAULT_ZOOM,
        })
    }
}
