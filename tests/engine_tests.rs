//! Query engine end-to-end tests
//!
//! Run the engine against a mock Gemini server

use httpmock::prelude::*;
use serde::Deserialize;
use serde_json::json;
use tradejournal_ai::utils::error::RATE_LIMIT_MESSAGE;
use tradejournal_ai::{ErrorKind, FieldSpec, ModelTier, QueryEngine, QueryRequest, Schema, Settings};

const FLASH_PATH: &str = "/models/gemini-1.5-flash:generateContent";
const PRO_PATH: &str = "/models/gemini-1.5-pro:generateContent";

#[derive(Debug, Deserialize, PartialEq)]
struct Cmyk {
    c: f64,
    m: f64,
    y: f64,
    k: f64,
}

/// Create test settings pointing at the mock server
fn settings_for(server: &MockServer, api_key: Option<&str>) -> Settings {
    let mut settings = Settings::default();
    settings.gemini.base_url = server.base_url();
    settings.gemini.api_key = api_key.map(str::to_string);
    settings.gemini.timeout = 5;
    settings
}

fn engine_for(server: &MockServer) -> QueryEngine {
    QueryEngine::new(settings_for(server, Some("test-key"))).expect("Failed to create engine")
}

fn cmyk_schema() -> Schema {
    Schema::new()
        .field("c", FieldSpec::number().range(0.0, 100.0))
        .field("m", FieldSpec::number().range(0.0, 100.0))
        .field("y", FieldSpec::number().range(0.0, 100.0))
        .field("k", FieldSpec::number().range(0.0, 100.0))
}

fn blue_request() -> QueryRequest {
    QueryRequest::new("CMYK for blue, JSON only", cmyk_schema()).with_temperature(0.0)
}

/// Gemini envelope with the text in `candidates[0].content.parts`
fn candidate_body(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 9, "totalTokenCount": 21}
    })
}

#[tokio::test]
async fn test_cmyk_for_blue_end_to_end() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(FLASH_PATH)
                .header("x-goog-api-key", "test-key")
                .body_contains("CMYK for blue, JSON only")
                .body_contains("\"responseMimeType\":\"application/json\"")
                .body_contains("You are a helpful AI assistant.");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(candidate_body(r#"{"c":100,"m":100,"y":0,"k":0}"#));
        })
        .await;

    let engine = engine_for(&server);
    let data = engine.query_value(&blue_request()).await.unwrap();

    assert_eq!(data, json!({"c": 100, "m": 100, "y": 0, "k": 0}));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_typed_query() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(FLASH_PATH);
            then.status(200)
                .json_body(candidate_body(r#"{"c":100,"m":100,"y":0,"k":0,"note":"blue"}"#));
        })
        .await;

    let engine = engine_for(&server);
    let cmyk: Cmyk = engine.query(&blue_request()).await.unwrap();

    assert_eq!(cmyk, Cmyk { c: 100.0, m: 100.0, y: 0.0, k: 0.0 });
}

#[tokio::test]
async fn test_missing_api_key_makes_no_network_call() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.any_request();
            then.status(200).json_body(candidate_body("{}"));
        })
        .await;

    let engine = QueryEngine::new(settings_for(&server, None)).unwrap();
    let err = engine.query_value(&blue_request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(err.to_string().contains("API Key is missing"));
    assert!(!err.is_rate_limit());
    assert_eq!(mock.hits_async().await, 0);
}

#[tokio::test]
async fn test_http_429_is_rate_limit() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(FLASH_PATH);
            then.status(429).json_body(json!({
                "error": {
                    "code": 429,
                    "message": "Quota exceeded for this project.",
                    "status": "RESOURCE_EXHAUSTED"
                }
            }));
        })
        .await;

    let engine = engine_for(&server);
    let err = engine.query_value(&blue_request()).await.unwrap_err();

    assert!(err.is_rate_limit());
    assert_eq!(err.kind(), ErrorKind::RateLimited);
    assert_eq!(err.to_string(), RATE_LIMIT_MESSAGE);
}

#[tokio::test]
async fn test_resource_exhausted_phrase_is_rate_limit() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(FLASH_PATH);
            then.status(503).body("Resource has been exhausted (e.g. check quota).");
        })
        .await;

    let engine = engine_for(&server);
    let err = engine.query_value(&blue_request()).await.unwrap_err();

    assert!(err.is_rate_limit());
}

#[tokio::test]
async fn test_provider_error_message_is_surfaced() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(FLASH_PATH);
            then.status(400).json_body(json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid. Please pass a valid API key.",
                    "status": "INVALID_ARGUMENT"
                }
            }));
        })
        .await;

    let engine = engine_for(&server);
    let err = engine.query_value(&blue_request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!err.is_rate_limit());
    assert!(err.to_string().contains("API key not valid"));
}

#[tokio::test]
async fn test_unreachable_provider_is_transport_error() {
    let mut settings = Settings::default();
    settings.gemini.api_key = Some("test-key".to_string());
    settings.gemini.base_url = "http://127.0.0.1:1".to_string();
    settings.gemini.timeout = 2;

    let engine = QueryEngine::new(settings).unwrap();
    let err = engine.query_value(&blue_request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!err.is_rate_limit());
    assert!(err.to_string().contains("Failed to send request to Gemini"));
}

#[tokio::test]
async fn test_unreachable_provider_with_429_in_url_is_not_rate_limit() {
    let mut settings = Settings::default();
    settings.gemini.api_key = Some("k".to_string());
    settings.gemini.base_url = "http://127.0.0.1:42901/v1beta".to_string();
    settings.models.flash = "gemini-429-flash".to_string();
    settings.gemini.timeout = 2;

    let engine = QueryEngine::new(settings).unwrap();
    let err = engine.query_value(&blue_request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(!err.is_rate_limit());
    assert!(err.to_string().contains("Failed to send request to Gemini"));
}

#[tokio::test]
async fn test_not_found_model_with_429_in_name_is_not_rate_limit() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/models/gemini-429:generateContent");
            then.status(404).json_body(json!({
                "error": {
                    "code": 404,
                    "message": "models/gemini-429 is not found for API version v1beta",
                    "status": "NOT_FOUND"
                }
            }));
        })
        .await;

    let mut settings = settings_for(&server, Some("test-key"));
    settings.models.flash = "gemini-429".to_string();
    let engine = QueryEngine::new(settings).unwrap();
    let err = engine.query_value(&blue_request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("404"));
    assert!(err.to_string().contains("NOT_FOUND"));
}

#[tokio::test]
async fn test_non_json_output_mentions_json() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(FLASH_PATH);
            then.status(200)
                .json_body(candidate_body("Sure! Here's the answer: {c:1}"));
        })
        .await;

    let engine = engine_for(&server);
    let err = engine.query_value(&blue_request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedOutput);
    assert!(err.is_json_related());
    assert!(err.to_string().contains("JSON"));
}

#[tokio::test]
async fn test_schema_violation_names_field() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(FLASH_PATH);
            then.status(200)
                .json_body(candidate_body(r#"{"c":150,"m":0,"y":0,"k":0}"#));
        })
        .await;

    let engine = engine_for(&server);
    let err = engine.query_value(&blue_request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
    assert_eq!(err.field_errors().len(), 1);
    assert_eq!(err.field_errors()[0].path, "c");
    assert!(err.to_string().contains("c: value 150 is above maximum 100"));
    assert!(!err.is_json_related());
}

#[tokio::test]
async fn test_flat_output_envelope() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(FLASH_PATH);
            then.status(200).json_body(json!({
                "candidates": [{"output": "{\"c\":0,\"m\":0,\"y\":0,\"k\":100}"}]
            }));
        })
        .await;

    let engine = engine_for(&server);
    let data = engine.query_value(&blue_request()).await.unwrap();

    assert_eq!(data, json!({"c": 0, "m": 0, "y": 0, "k": 100}));
}

#[tokio::test]
async fn test_blocked_prompt_is_transport_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(FLASH_PATH);
            then.status(200)
                .json_body(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        })
        .await;

    let engine = engine_for(&server);
    let err = engine.query_value(&blue_request()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("SAFETY"));
}

#[tokio::test]
async fn test_identical_requests_yield_identical_data() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(FLASH_PATH);
            then.status(200)
                .json_body(candidate_body(r#"{"c":100,"m":100,"y":0,"k":0}"#));
        })
        .await;

    let engine = engine_for(&server);
    let request = blue_request();

    let first = engine.query_value(&request).await.unwrap();
    let second = engine.query_value(&request).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(mock.hits_async().await, 2);
}

#[tokio::test]
async fn test_model_tier_selection() {
    let server = MockServer::start_async().await;
    let pro = server
        .mock_async(|when, then| {
            when.method(POST).path(PRO_PATH);
            then.status(200)
                .json_body(candidate_body(r#"{"c":1,"m":2,"y":3,"k":4}"#));
        })
        .await;
    let flash = server
        .mock_async(|when, then| {
            when.method(POST).path(FLASH_PATH);
            then.status(200)
                .json_body(candidate_body(r#"{"c":5,"m":6,"y":7,"k":8}"#));
        })
        .await;

    let engine = engine_for(&server);

    let from_pro = engine
        .query_value(&blue_request().with_tier(ModelTier::Pro))
        .await
        .unwrap();
    assert_eq!(from_pro["k"], 4);

    // Unknown model names fall back to flash
    let from_unknown = engine
        .query_value(&blue_request().with_model("gpt-4o"))
        .await
        .unwrap();
    assert_eq!(from_unknown["k"], 8);

    assert_eq!(pro.hits_async().await, 1);
    assert_eq!(flash.hits_async().await, 1);
}

#[tokio::test]
async fn test_concurrent_queries_are_independent() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(FLASH_PATH).body_contains("CMYK for blue");
            then.status(200)
                .json_body(candidate_body(r#"{"c":100,"m":100,"y":0,"k":0}"#));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(FLASH_PATH).body_contains("CMYK for red");
            then.status(200)
                .json_body(candidate_body(r#"{"c":0,"m":100,"y":100,"k":0}"#));
        })
        .await;

    let engine = engine_for(&server);
    let blue = blue_request();
    let red = QueryRequest::new("CMYK for red, JSON only", cmyk_schema());

    let (blue_result, red_result) = tokio::join!(engine.query_value(&blue), engine.query_value(&red));

    assert_eq!(blue_result.unwrap()["c"], 100);
    assert_eq!(red_result.unwrap()["y"], 100);
}

#[tokio::test]
async fn test_empty_prompt_rejected_before_io() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.any_request();
            then.status(200).json_body(candidate_body("{}"));
        })
        .await;

    let engine = engine_for(&server);
    let err = engine
        .query_value(&QueryRequest::new("", cmyk_schema()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(mock.hits_async().await, 0);
}
