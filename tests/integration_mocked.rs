/// Integration tests with mocked external APIs
/// Tests the upstream clients without hitting real external services
use maps_assistant_api::config::Config;
use maps_assistant_api::intent::{self, FALLBACK_CONFIDENCE};
use maps_assistant_api::llm_client::OllamaClient;
use maps_assistant_api::maps_client::{MapsService, MIN_CALL_INTERVAL};
use maps_assistant_api::models::{ChatMessage, LatLng, LocationQuery, PlaceType};
use std::time::Instant;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create test config
fn create_test_config(maps_base_url: String, llm_base_url: String) -> Config {
    Config {
        port: 3000,
        maps_base_url,
        maps_api_key: "test_key".to_string(),
        llm_base_url,
        llm_model: "test-model".to_string(),
    }
}

fn place_json(id: &str, name: &str, lat: f64, lng: f64) -> serde_json::Value {
    serde_json::json!({
        "place_id": id,
        "name": name,
        "formatted_address": format!("{} street 1", name),
        "geometry": {"location": {"lat": lat, "lng": lng}},
        "rating": 4.4,
        "types": ["restaurant"],
        "photos": [{"photo_reference": "photoRef1", "height": 400, "width": 600}]
    })
}

fn plain_query(text: &str) -> LocationQuery {
    LocationQuery {
        query: text.to_string(),
        place_type: None,
        location: None,
        radius: None,
    }
}

#[tokio::test]
async fn test_text_search_success() {
    let mock_server = MockServer::start().await;

    let mock_response = serde_json::json!({
        "results": [
            place_json("place-1", "Trattoria Uno", 41.9028, 12.4964),
            place_json("place-2", "Trattoria Due", 41.9010, 12.4900),
        ],
        "status": "OK"
    });

    Mock::given(method("GET"))
        .and(path("/place/textsearch/json"))
        .and(query_param("query", "Italian restaurants in Rome"))
        .and(query_param("key", "test_key"))
        .and(query_param("radius", "5000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&mock_response))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), "http://localhost:11434".to_string());
    let service = MapsService::new(&config).unwrap();

    let query = LocationQuery {
        query: "Italian restaurants in Rome".to_string(),
        place_type: None,
        location: None,
        radius: Some(5000),
    };
    let map = service.text_search(&query).await.unwrap();

    assert_eq!(map.places.len(), 2);
    assert_eq!(
        map.center,
        LatLng {
            lat: 41.9028,
            lng: 12.4964
        }
    );
    assert_eq!(map.zoom, 13);
    assert!(map.map_url.contains("maps/embed/v1/search"));
    assert!(map.directions_url.unwrap().contains("destination_place_id=place-1"));
}

#[tokio::test]
async fn test_text_search_zero_results_is_valid_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/place/textsearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [],
            "status": "ZERO_RESULTS"
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), "http://localhost:11434".to_string());
    let service = MapsService::new(&config).unwrap();

    let map = service.text_search(&plain_query("nothing here")).await.unwrap();

    assert!(map.places.is_empty());
    assert_eq!(map.center, LatLng { lat: 0.0, lng: 0.0 });
    assert!(map.directions_url.is_none());
}

#[tokio::test]
async fn test_text_search_provider_status_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/place/textsearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [],
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid."
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), "http://localhost:11434".to_string());
    let service = MapsService::new(&config).unwrap();

    let err = service.text_search(&plain_query("pizza")).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("REQUEST_DENIED"));
    assert!(msg.contains("API key is invalid"));
}

#[tokio::test]
async fn test_text_search_http_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/place/textsearch/json"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), "http://localhost:11434".to_string());
    let service = MapsService::new(&config).unwrap();

    let err = service.text_search(&plain_query("pizza")).await.unwrap_err();
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn test_text_search_sanitizes_query_before_request() {
    let mock_server = MockServer::start().await;

    // The matcher only accepts the sanitized form; the raw query would 404
    Mock::given(method("GET"))
        .and(path("/place/textsearch/json"))
        .and(query_param("query", "pizza scriptalert(1)/script"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [],
            "status": "ZERO_RESULTS"
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), "http://localhost:11434".to_string());
    let service = MapsService::new(&config).unwrap();

    let result = service
        .text_search(&plain_query("pizza <script>alert('1')</script>"))
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_place_details_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/place/details/json"))
        .and(query_param("place_id", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": place_json("abc123", "Museo Nazionale", -7.801, 110.364),
            "status": "OK"
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), "http://localhost:11434".to_string());
    let service = MapsService::new(&config).unwrap();

    let place = service.place_details("abc123").await.unwrap();
    assert_eq!(place.place_id, "abc123");
    assert_eq!(place.name, "Museo Nazionale");
}

#[tokio::test]
async fn test_place_details_not_found_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/place/details/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "NOT_FOUND"
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), "http://localhost:11434".to_string());
    let service = MapsService::new(&config).unwrap();

    let err = service.place_details("missing").await.unwrap_err();
    assert!(err.to_string().contains("NOT_FOUND"));
}

#[tokio::test]
async fn test_pacing_lower_bound_for_consecutive_calls() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/place/textsearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [],
            "status": "ZERO_RESULTS"
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), "http://localhost:11434".to_string());
    let service = MapsService::new(&config).unwrap();

    let calls = 3u32;
    let started = Instant::now();
    for _ in 0..calls {
        service.text_search(&plain_query("pizza")).await.unwrap();
    }
    let elapsed = started.elapsed();

    // N back-to-back calls must take at least (N-1) x interval
    assert!(
        elapsed >= MIN_CALL_INTERVAL * (calls - 1),
        "3 calls finished in {:?}",
        elapsed
    );
    assert_eq!(service.request_count(), calls as u64);
}

#[tokio::test]
async fn test_extract_intent_model_path_clamps_confidence() {
    let mock_server = MockServer::start().await;

    // Model wraps its JSON in prose; confidence is out of range
    let llm_text = "Sure thing! {\"response\": \"Here are restaurants in Rome.\", \
                    \"location\": \"Rome\", \"type\": \"restaurant\", \"confidence\": 2.5}";
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": llm_text,
            "done": true
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config("http://localhost:1".to_string(), mock_server.uri());
    let llm = OllamaClient::new(&config).unwrap();

    let chat = ChatMessage {
        message: "find me restaurants in Rome".to_string(),
        location: None,
        history: Vec::new(),
    };
    let resp = intent::extract_intent(&llm, &chat).await;

    assert_eq!(resp.extracted_location.as_deref(), Some("Rome"));
    assert_eq!(resp.extracted_type, Some(PlaceType::Restaurant));
    assert_eq!(resp.confidence, 1.0);
    assert_eq!(resp.response, "Here are restaurants in Rome.");
}

#[tokio::test]
async fn test_extract_intent_unknown_type_maps_to_general() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": "{\"location\": \"Kyoto\", \"type\": \"shrine\", \"confidence\": 0.9}",
            "done": true
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config("http://localhost:1".to_string(), mock_server.uri());
    let llm = OllamaClient::new(&config).unwrap();

    let chat = ChatMessage {
        message: "shrines in Kyoto".to_string(),
        location: None,
        history: Vec::new(),
    };
    let resp = intent::extract_intent(&llm, &chat).await;

    assert_eq!(resp.extracted_type, Some(PlaceType::General));
    assert_eq!(resp.extracted_location.as_deref(), Some("Kyoto"));
}

#[tokio::test]
async fn test_extract_intent_falls_back_when_model_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config("http://localhost:1".to_string(), mock_server.uri());
    let llm = OllamaClient::new(&config).unwrap();

    let chat = ChatMessage {
        message: "Hotel murah di dekat Malioboro Yogyakarta".to_string(),
        location: None,
        history: Vec::new(),
    };
    let resp = intent::extract_intent(&llm, &chat).await;

    assert_eq!(
        resp.extracted_location.as_deref(),
        Some("Malioboro Yogyakarta")
    );
    assert_eq!(resp.extracted_type, Some(PlaceType::General));
    assert_eq!(resp.confidence, FALLBACK_CONFIDENCE);
    assert!(!resp.response.is_empty());
}

#[tokio::test]
async fn test_extract_intent_falls_back_on_unparseable_output() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "response": "I could not determine a location, sorry!",
            "done": true
        })))
        .mount(&mock_server)
        .await;

    let config = create_test_config("http://localhost:1".to_string(), mock_server.uri());
    let llm = OllamaClient::new(&config).unwrap();

    let chat = ChatMessage {
        message: "cheap eats near Malioboro".to_string(),
        location: None,
        history: Vec::new(),
    };
    let resp = intent::extract_intent(&llm, &chat).await;

    assert_eq!(resp.confidence, FALLBACK_CONFIDENCE);
    assert_eq!(resp.extracted_location.as_deref(), Some("Malioboro"));
    assert_eq!(resp.extracted_type, Some(PlaceType::Restaurant));
}

#[tokio::test]
async fn test_health_checks() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/place/textsearch/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [],
            "status": "OK"
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
        .mount(&mock_server)
        .await;

    let config = create_test_config(mock_server.uri(), mock_server.uri());
    let maps = MapsService::new(&config).unwrap();
    let llm = OllamaClient::new(&config).unwrap();

    assert!(maps.health_check().await);
    assert!(llm.health_check().await);

    // An unreachable endpoint reports unhealthy instead of erroring
    let dead = create_test_config(
        "http://127.0.0.1:1".to_string(),
        "http://127.0.0.1:1".to_string(),
    );
    let dead_maps = MapsService::new(&dead).unwrap();
    let dead_llm = OllamaClient::new(&dead).unwrap();
    assert!(!dead_maps.health_check().await);
    assert!(!dead_llm.health_check().await);
}
