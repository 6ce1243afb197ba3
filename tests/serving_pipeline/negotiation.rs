//! Response Format Negotiation Tests
//!
//! Tests for JSON, HTML and multipart responses selected by Accept.

use crate::*;
use serde_json::json;
use tensorserve_wire::{parse_multipart, MediaType};

// =============================================================================
// JSON
// =============================================================================

#[test]
fn test_scalar_json_round_trip() {
    let service = EvaluationService::new(Identity, ServingConfig::default()).unwrap();
    let body = evaluate(&service, ServingRequest::new(r#"{"x": 1}"#));
    assert_eq!(body.media_type, "application/json");
    assert_eq!(body.as_str(), Some(r#"{"x":1}"#));
}

#[test]
fn test_doubling_json() {
    let service = doubling_service();
    let body = evaluate(&service, ServingRequest::new(r#"{"x": [[1, 2], [3, 4]]}"#));
    assert_eq!(json_body(&body), json!({"y": [[2.0, 4.0], [6.0, 8.0]]}));
}

#[test]
fn test_single_row_is_squeezed() {
    let service = doubling_service();
    let body = evaluate(&service, ServingRequest::new(r#"{"x": [[1, 2]]}"#));
    assert_eq!(json_body(&body), json!({"y": [2.0, 4.0]}));
}

#[test]
fn test_wildcard_accept_means_json() {
    let service = doubling_service();
    let body = evaluate(&service, ServingRequest::new(r#"{"x": [[1, 2]]}"#).accept("*/*"));
    assert_eq!(body.media_type, "application/json");
}

// =============================================================================
// HTML
// =============================================================================

#[test]
fn test_scalar_html() {
    let service = EvaluationService::new(Identity, ServingConfig::default()).unwrap();
    let body = evaluate(&service, ServingRequest::new(r#"{"x": 1}"#).accept("text/html"));
    assert_eq!(body.media_type, "text/html; charset=UTF-8");
    assert_eq!(body.as_str(), Some("<h1>x</h1><p>1</p>"));
}

#[test]
fn test_matrix_html() {
    let service = doubling_service();
    let body = evaluate(&service, ServingRequest::new(r#"{"x": [[1, 2], [3, 4]]}"#).accept("text/html"));
    assert_eq!(body.as_str(), Some("<h1>y</h1><code>[[2.0,4.0],[6.0,8.0]]</code>"));
}

#[test]
fn test_first_supported_accept_entry_wins() {
    let service = doubling_service();
    let body = evaluate(
        &service,
        ServingRequest::new(r#"{"x": [[1, 2]]}"#).accept("text/csv, text/html;q=0.8, application/json"),
    );
    assert_eq!(body.as_str(), Some("<h1>y</h1><ul><li>2</li><li>4</li></ul>"));
}

// =============================================================================
// MULTIPART
// =============================================================================

#[test]
fn test_multipart_response() {
    let service = EvaluationService::new(Identity, ServingConfig::default()).unwrap();
    let body = evaluate(
        &service,
        ServingRequest::new(r#"{"a": [1, 2], "b": "text"}"#).accept("multipart/form-data"),
    );

    let media_type = MediaType::parse(&body.media_type).unwrap();
    assert!(media_type.is("multipart/form-data"));
    assert_eq!(media_type.param("charset"), Some("UTF-8"));

    let parts = parse_multipart(&body.bytes, media_type.param("boundary").unwrap()).unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].name, "a");
    assert_eq!(parts[0].filename.as_deref(), Some("a.json"));
    assert_eq!(parts[0].body, b"[1,2]");
    assert_eq!(parts[1].body, b"\"text\"");
}

#[test]
fn test_default_accept_from_config() {
    let mut config = doubling_config();
    config.default_accept = "text/html".to_string();
    let service = EvaluationService::with_backend(Doubling { from: "x", to: "y" }, config).unwrap();

    let body = evaluate(&service, ServingRequest::new(r#"{"x": [[1, 2]]}"#));
    assert!(body.media_type.starts_with("text/html"));

    let body = evaluate(&service, ServingRequest::new(r#"{"x": [[1, 2]]}"#).accept("application/json"));
    assert_eq!(body.media_type, "application/json");
}
