/// Request validation schemas.
///
/// Each schema takes the loosely-typed request body and returns either a
/// sanitized, typed value or the full list of field violations. Unknown
/// body fields never reach this layer: serde strips them during
/// deserialization. Validation failures never reach business logic.
use crate::errors::FieldViolation;
use crate::models::{
    ChatMessage, ChatRequest, LatLng, LocationQuery, PlaceType, RawLatLng, SearchRequest,
};
use regex::Regex;

pub const QUERY_MAX_LEN: usize = 200;
pub const MESSAGE_MAX_LEN: usize = 1000;
const HISTORY_MAX_ENTRIES: usize = 10;
const HISTORY_ENTRY_MAX_LEN: usize = 500;
const ID_MAX_LEN: usize = 512;
const RADIUS_MIN: i64 = 100;
const RADIUS_MAX: i64 = 50_000;

/// Allowlist for free-text search queries: letters, digits, whitespace
/// and a small set of punctuation that place names legitimately use.
fn is_valid_query_text(text: &str) -> bool {
    let allowed = Regex::new(r"^[\p{L}\p{N}\s,.'\-&()/]+$").unwrap();
    allowed.is_match(text)
}

/// Place identifiers and photo references share the provider's format.
pub fn is_valid_resource_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= ID_MAX_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Validates the search-query schema into a `LocationQuery`.
pub fn validate_search(req: SearchRequest) -> Result<LocationQuery, Vec<FieldViolation>> {
    let mut violations = Vec::new();

    let query = req.query.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        violations.push(FieldViolation::new(
            "query",
            "query is required and must be at least 1 character",
        ));
    } else if query.chars().count() > QUERY_MAX_LEN {
        violations.push(FieldViolation::new(
            "query",
            format!("query must be at most {} characters", QUERY_MAX_LEN),
        ));
    } else if !is_valid_query_text(query) {
        violations.push(FieldViolation::new(
            "query",
            "query contains disallowed characters",
        ));
    }

    let place_type = match req.place_type.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match PlaceType::from_strict(raw) {
            Some(t) => Some(t),
            None => {
                violations.push(FieldViolation::new(
                    "type",
                    "type must be one of restaurant, tourist_attraction, gas_station, \
                     hospital, store, general",
                ));
                None
            }
        },
    };

    let location = req
        .location
        .and_then(|raw| check_lat_lng("location", raw, &mut violations));

    let radius = match req.radius {
        None => None,
        Some(r) if (RADIUS_MIN..=RADIUS_MAX).contains(&r) => Some(r as u32),
        Some(_) => {
            violations.push(FieldViolation::new(
                "radius",
                format!("radius must be between {} and {} metres", RADIUS_MIN, RADIUS_MAX),
            ));
            None
        }
    };

    if !violations.is_empty() {
        return Err(violations);
    }

    Ok(LocationQuery {
        query: query.to_string(),
        place_type,
        location,
        radius,
    })
}

/// Validates the chat-message schema into a `ChatMessage`.
pub fn validate_chat(req: ChatRequest) -> Result<ChatMessage, Vec<FieldViolation>> {
    let mut violations = Vec::new();

    let message = req.message.as_deref().map(str::trim).unwrap_or_default();
    if message.is_empty() {
        violations.push(FieldViolation::new(
            "message",
            "message is required and must be at least 1 character",
        ));
    } else if message.chars().count() > MESSAGE_MAX_LEN {
        violations.push(FieldViolation::new(
            "message",
            format!("message must be at most {} characters", MESSAGE_MAX_LEN),
        ));
    } else if message.chars().any(|c| c.is_control() && c != '\n') {
        violations.push(FieldViolation::new(
            "message",
            "message must not contain control characters",
        ));
    }

    let context = req.context.unwrap_or_default();

    let location = context
        .location
        .and_then(|raw| check_lat_lng("context.location", raw, &mut violations));

    let history = context.history.unwrap_or_default();
    if history.len() > HISTORY_MAX_ENTRIES {
        violations.push(FieldViolation::new(
            "context.history",
            format!("history is capped at {} entries", HISTORY_MAX_ENTRIES),
        ));
    } else {
        for (i, entry) in history.iter().enumerate() {
            if entry.chars().count() > HISTORY_ENTRY_MAX_LEN {
                violations.push(FieldViolation::new(
                    format!("context.history[{}]", i),
                    format!("history entries must be at most {} characters", HISTORY_ENTRY_MAX_LEN),
                ));
            }
        }
    }

    if !violations.is_empty() {
        return Err(violations);
    }

    Ok(ChatMessage {
        message: message.to_string(),
        location,
        history,
    })
}

/// Validates the place-id schema (also used for photo references).
pub fn validate_resource_id(field: &str, id: &str) -> Result<String, Vec<FieldViolation>> {
    let id = id.trim();
    if is_valid_resource_id(id) {
        Ok(id.to_string())
    } else {
        Err(vec![FieldViolation::new(
            field,
            "must match ^[a-zA-Z0-9_-]+$",
        )])
    }
}

fn check_lat_lng(
    field: &str,
    raw: RawLatLng,
    violations: &mut Vec<FieldViolation>,
) -> Option<LatLng> {
    let mut ok = true;
    if !raw.lat.is_finite() || !(-90.0..=90.0).contains(&raw.lat) {
        violations.push(FieldViolation::new(
            format!("{}.lat", field),
            "lat must be between -90 and 90",
        ));
        ok = false;
    }
    if !raw.lng.is_finite() || !(-180.0..=180.0).contains(&raw.lng) {
        violations.push(FieldViolation::new(
            format!("{}.lng", field),
            "lng must be between -180 and 180",
        ));
        ok = false;
    }
    ok.then_some(LatLng {
        lat: raw.lat,
        lng: raw.lng,
    })
}
