//! Error Response Tests
//!
//! Tests for error classification, status codes and error bodies.

use crate::*;
use std::io::Write;

fn assert_rejected(service: &EvaluationService, request: ServingRequest, code: &str) -> String {
    let response = service.handle(&request);
    assert_eq!(response.status, 400, "expected a client error for {}", code);
    assert_eq!(response.body.media_type, "application/json");

    let body = json_body(&response.body);
    assert_eq!(body["code"], code);
    let object = body.as_object().unwrap();
    assert_eq!(object.len(), 2);
    body["message"].as_str().unwrap().to_string()
}

// =============================================================================
// CLIENT ERRORS
// =============================================================================

#[test]
fn test_malformed_json() {
    assert_rejected(&doubling_service(), ServingRequest::new("{\"x\": [1,"), "DecodeError");
}

#[test]
fn test_unsupported_content_type() {
    let request = ServingRequest::new("a,b").content_type("text/csv");
    let message = assert_rejected(&doubling_service(), request, "UnsupportedMediaType");
    assert!(message.contains("unsupported content type text/csv"));
}

#[test]
fn test_unsupported_accept() {
    let request = ServingRequest::new(r#"{"x": [[1, 2]]}"#).accept("application/xml");
    let message = assert_rejected(&doubling_service(), request, "UnsupportedMediaType");
    assert!(message.contains("accept header 'application/xml' not supported"));
}

#[test]
fn test_mixed_types() {
    let message = assert_rejected(
        &doubling_service(),
        ServingRequest::new(r#"{"x": [[1, "a"]]}"#),
        "MixedTypes",
    );
    assert!(message.contains("integer"));
    assert!(message.contains("string"));
}

#[test]
fn test_ragged_input() {
    assert_rejected(
        &doubling_service(),
        ServingRequest::new(r#"{"x": [[1, 2], [3]]}"#),
        "DimensionMismatch",
    );
}

#[test]
fn test_missing_tensor() {
    let message = assert_rejected(&doubling_service(), ServingRequest::new(r#"{"z": [[1, 2]]}"#), "MissingTensor");
    assert!(message.contains('x'));
}

#[test]
fn test_unresolvable_shape() {
    let message = assert_rejected(&doubling_service(), ServingRequest::new(r#"{"x": [1, 2, 3]}"#), "ShapeError");
    assert!(message.contains("tensor x"));
}

#[test]
fn test_invalid_debug_directive() {
    let request = ServingRequest::new(r#"{"x": [[1, 2]]}"#).debug_stage("middle");
    let message = assert_rejected(&doubling_service(), request, "DecodeError");
    assert!(message.contains("invalid debug directive 'middle'"));
}

#[test]
fn test_not_an_image() {
    let request = ServingRequest::new(&b"\x89PNG but truncated"[..]).content_type("image/png");
    assert_rejected(&invert_service(), request, "ImageError");
}

// =============================================================================
// SERVER ERRORS
// =============================================================================

#[test]
fn test_backend_failure() {
    init_tracing();
    let service = EvaluationService::with_backend(Broken, doubling_config()).unwrap();
    let response = service.handle(&ServingRequest::new(r#"{"x": [[1, 2]]}"#));
    assert_eq!(response.status, 500);
    assert!(!response.is_success());

    let body = json_body(&response.body);
    assert_eq!(body["code"], "BackendError");
    assert!(body["message"].as_str().unwrap().contains("model crashed"));
    assert_eq!(service.evaluation_count(), 0);

    let err = evaluate_err(&service, ServingRequest::new(r#"{"x": [[1, 2]]}"#));
    assert!(!err.is_client_error());
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[test]
fn test_service_from_toml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
default_accept = "text/html"

[[inputs]]
name = "x"
type = "double"
shape = [-1, 2]

[[outputs]]
name = "y"
type = "double"
shape = [-1, 2]
"#
    )
    .unwrap();

    let config = ServingConfig::from_file(file.path()).unwrap();
    let service = EvaluationService::with_backend(Doubling { from: "x", to: "y" }, config).unwrap();
    let body = evaluate(&service, ServingRequest::new(r#"{"x": [[1, 2]]}"#));
    assert_eq!(body.as_str(), Some("<h1>y</h1><ul><li>2</li><li>4</li></ul>"));
}

#[test]
fn test_invalid_config_is_refused() {
    let mut config = doubling_config();
    config.rolling_window_size = 0;
    let err = EvaluationService::with_backend(Doubling { from: "x", to: "y" }, config).unwrap_err();
    assert_eq!(err.code(), "ConfigError");
    assert!(err.to_string().contains("rolling_window_size"));
}
