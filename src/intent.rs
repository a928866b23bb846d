/// Intent extraction: turn free-form text into a place-type/location pair.
///
/// Primary path asks the local language model for a JSON object; the
/// deterministic keyword fallback takes over whenever the model is
/// unreachable, times out, or returns something unparseable. A failed
/// model call never fails the chat request.
use crate::errors::AppError;
use crate::llm_client::OllamaClient;
use crate::models::{ChatMessage, LlmResponse, LocationQuery, PlaceType};
use serde::Deserialize;

/// Confidence assigned to heuristic extractions. Deliberately lower than
/// the model-path default so downstream consumers can tell them apart,
/// but above the 0.5 map-attachment threshold.
pub const FALLBACK_CONFIDENCE: f64 = 0.6;
/// Confidence assumed when the model returns a parseable object without
/// a confidence field.
pub const MODEL_DEFAULT_CONFIDENCE: f64 = 0.75;
/// Default search radius in metres for queries built from extracted intent.
pub const DEFAULT_RADIUS: u32 = 5000;

const INTENT_PROMPT: &str = "You are a location intent parser for a maps assistant. \
Reply with exactly one JSON object and nothing else, shaped as: \
{\"response\": \"<short helpful reply>\", \"location\": \"<place or area, or null>\", \
\"type\": \"<restaurant|tourist_attraction|gas_station|hospital|store|general>\", \
\"confidence\": <number between 0 and 1>}";

/// Preposition markers that introduce a location phrase. English first,
/// then Indonesian equivalents used by the original deployment.
const LOCATION_MARKERS: &[&str] = &[
    "near ", "around ", "at ", "in ", "dekat ", "sekitar ", "di ",
];

/// Fixed gazetteer scanned when no marker matches.
const GAZETTEER: &[&str] = &[
    "jakarta",
    "yogyakarta",
    "malioboro",
    "bandung",
    "surabaya",
    "semarang",
    "medan",
    "bali",
    "denpasar",
    "singapore",
    "kuala lumpur",
    "tokyo",
    "rome",
    "paris",
    "london",
    "berlin",
    "amsterdam",
    "barcelona",
    "new york",
    "san francisco",
    "sydney",
];

/// Phrases that look like locations after a marker but are not.
const STOP_WORDS: &[&str] = &[
    "there", "here", "me", "you", "it", "the", "a", "an", "this", "that", "general", "hello",
    "hi", "please", "sini", "situ", "sana", "saya", "kamu",
];

/// Category classification table; first category with a keyword hit wins.
const CATEGORY_KEYWORDS: &[(PlaceType, &[&str])] = &[
    (
        PlaceType::Restaurant,
        &[
            "restaurant",
            "food",
            "eat",
            "dinner",
            "lunch",
            "breakfast",
            "cafe",
            "coffee",
            "restoran",
            "rumah makan",
            "warung",
            "kafe",
            "makan",
        ],
    ),
    (
        PlaceType::TouristAttraction,
        &[
            "tourist",
            "attraction",
            "museum",
            "monument",
            "temple",
            "beach",
            "sightseeing",
            "wisata",
            "candi",
            "pantai",
            "taman",
        ],
    ),
    (
        PlaceType::GasStation,
        &["gas station", "gas", "fuel", "petrol", "spbu", "bensin"],
    ),
    (
        PlaceType::Hospital,
        &[
            "hospital",
            "clinic",
            "doctor",
            "emergency",
            "rumah sakit",
            "klinik",
            "dokter",
            "apotek",
            "pharmacy",
        ],
    ),
    (
        PlaceType::Store,
        &[
            "store", "shop", "mall", "market", "supermarket", "buy", "toko", "pasar", "belanja",
        ],
    ),
];

/// What the model is asked to return; decoded strictly, never partially
/// trusted. Any decode failure falls through to the heuristic path.
#[derive(Debug, Deserialize)]
struct ParsedIntent {
    response: Option<String>,
    location: Option<String>,
    #[serde(rename = "type")]
    place_type: Option<String>,
    confidence: Option<f64>,
}

/// Clamps a confidence value into [0, 1]; NaN maps to 0.
pub fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Extracts structured intent from a chat message, degrading to the
/// deterministic fallback on any model failure.
pub async fn extract_intent(llm: &OllamaClient, chat: &ChatMessage) -> LlmResponse {
    match model_intent(llm, chat).await {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!("Intent extraction via LLM failed ({}), using fallback", e);
            fallback_intent(&chat.message)
        }
    }
}

async fn model_intent(llm: &OllamaClient, chat: &ChatMessage) -> Result<LlmResponse, AppError> {
    let raw = llm.generate(&build_prompt(chat)).await?;
    let object = extract_json_object(&raw)
        .ok_or_else(|| AppError::upstream("no JSON object in model output"))?;
    let parsed: ParsedIntent = serde_json::from_str(object)
        .map_err(|e| AppError::upstream(format!("model output did not decode: {}", e)))?;

    let extracted_location = parsed
        .location
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());
    let extracted_type = PlaceType::from_loose(parsed.place_type.as_deref().unwrap_or(""));
    let confidence = clamp_confidence(parsed.confidence.unwrap_or(MODEL_DEFAULT_CONFIDENCE));
    let response = parsed
        .response
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| default_response(extracted_location.as_deref(), extracted_type));

    Ok(LlmResponse {
        response,
        extracted_location,
        extracted_type: Some(extracted_type),
        confidence,
        map_data: None,
    })
}

/// Deterministic heuristic extraction. Idempotent: identical text always
/// yields an identical result.
pub fn fallback_intent(message: &str) -> LlmResponse {
    let extracted_location = extract_location_fallback(message);
    let extracted_type = classify_place_type(message);

    LlmResponse {
        response: default_response(extracted_location.as_deref(), extracted_type),
        extracted_location,
        extracted_type: Some(extracted_type),
        confidence: FALLBACK_CONFIDENCE,
        map_data: None,
    }
}

/// Builds a `LocationQuery` from an extracted intent, or `None` when no
/// location was extracted. Pure function; fixed default radius.
pub fn generate_location_query(intent: &LlmResponse) -> Option<LocationQuery> {
    let location = intent.extracted_location.as_deref()?.trim();
    if location.is_empty() {
        return None;
    }

    let place_type = intent.extracted_type.unwrap_or(PlaceType::General);
    let query = match place_type {
        PlaceType::General => location.to_string(),
        t => format!("{} in {}", t.query_term(), location),
    };

    Some(LocationQuery {
        query,
        place_type: (place_type != PlaceType::General).then_some(place_type),
        location: None,
        radius: Some(DEFAULT_RADIUS),
    })
}

fn build_prompt(chat: &ChatMessage) -> String {
    let mut prompt = String::from(INTENT_PROMPT);
    if !chat.history.is_empty() {
        prompt.push_str("\n\nRecent conversation:");
        for turn in &chat.history {
            prompt.push_str("\n- ");
            prompt.push_str(turn);
        }
    }
    prompt.push_str("\n\nUser message: ");
    prompt.push_str(&chat.message);
    prompt.push_str("\nJSON: ");
    prompt
}

/// Returns the first balanced `{...}` span in `raw`, tracking string
/// literals so braces inside JSON strings don't skew the depth count.
fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Heuristic location extraction: preposition markers first, then the
/// gazetteer. Returns `None` when neither matches.
pub fn extract_location_fallback(text: &str) -> Option<String> {
    if let Some(phrase) = marker_phrase(text) {
        return Some(phrase);
    }

    let lower = text.to_ascii_lowercase();
    GAZETTEER
        .iter()
        .find(|place| contains_word(&lower, place))
        .map(|place| title_case(place))
}

fn marker_phrase(text: &str) -> Option<String> {
    // ASCII lowering preserves byte offsets, so indices found in `lower`
    // can slice `text`; the markers themselves are all ASCII.
    let lower = text.to_ascii_lowercase();

    // Earliest word-boundary marker match wins.
    let (idx, marker) = LOCATION_MARKERS
        .iter()
        .filter_map(|m| find_at_word_start(&lower, m).map(|i| (i, *m)))
        .min_by_key(|(i, _)| *i)?;

    let mut phrase = text[idx + marker.len()..]
        .split(['.', ',', '!', '?', ';', ':', '\n'])
        .next()
        .unwrap_or("")
        .trim();

    // A marker can directly follow another ("di dekat Malioboro").
    loop {
        let lower_phrase = phrase.to_ascii_lowercase();
        match LOCATION_MARKERS
            .iter()
            .find(|m| lower_phrase.starts_with(*m))
        {
            Some(m) => phrase = phrase[m.len()..].trim_start(),
            None => break,
        }
    }

    if phrase.is_empty() || STOP_WORDS.contains(&phrase.to_ascii_lowercase().as_str()) {
        return None;
    }
    Some(phrase.to_string())
}

/// Classifies a message into a place category; first category with a
/// keyword hit wins, default `General`. Keywords match as substrings
/// ("eat" also hits "eats").
pub fn classify_place_type(text: &str) -> PlaceType {
    let lower = text.to_lowercase();
    for (place_type, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return *place_type;
        }
    }
    PlaceType::General
}

fn default_response(location: Option<&str>, place_type: PlaceType) -> String {
    match location {
        Some(loc) => format!(
            "Let me look up {} options around {}.",
            place_type.query_term(),
            loc
        ),
        None => "I can help you find places. Tell me a location to search around.".to_string(),
    }
}

fn find_at_word_start(haystack: &str, needle: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = haystack[from..].find(needle) {
        let idx = from + rel;
        let at_boundary = idx == 0
            || haystack[..idx]
                .chars()
                .next_back()
                .is_some_and(|c| !c.is_alphanumeric());
        if at_boundary {
            return Some(idx);
        }
        from = idx + needle.len();
    }
    None
}

fn contains_word(haystack: &str, needle: &str) -> bool {
    let mut from = 0;
    while let Some(rel) = haystack[from..].find(needle) {
        let idx = from + rel;
        let boundary_before = idx == 0
            || haystack[..idx]
                .chars()
                .next_back()
                .is_some_and(|c| !c.is_alphanumeric());
        let boundary_after = haystack[idx + needle.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if boundary_before && boundary_after {
            return true;
        }
        from = idx + needle.len();
    }
    false
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
