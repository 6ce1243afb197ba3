//! Evaluation Stage Tests
//!
//! Tests for evaluator chains, debug stages, rolling windows, index columns
//! and the shared evaluation counter.

use crate::*;
use serde_json::json;
use std::sync::Arc;
use std::thread;

fn chain_service() -> EvaluationService {
    let x = TensorField::new("x", DataType::Double, vec![-1, 2]);
    let y = TensorField::new("y", DataType::Double, vec![-1, 2]);
    let total = TensorField::new("total", DataType::Double, vec![-1]);

    let stages: Vec<Box<dyn Evaluator>> = vec![
        Box::new(TensorEvaluator::new(Doubling { from: "x", to: "y" }, vec![x], vec![y.clone()])),
        Box::new(TensorEvaluator::new(RowSum, vec![y], vec![total])),
    ];
    let chain = EvaluatorChain::new(stages, Vec::new()).unwrap();
    EvaluationService::new(chain, ServingConfig::default()).unwrap()
}

// =============================================================================
// CHAINS
// =============================================================================

#[test]
fn test_chain_runs_every_stage() {
    init_tracing();
    let service = chain_service();
    assert_eq!(service.inputs().len(), 1);
    assert_eq!(service.inputs()[0].name, "x");
    assert_eq!(service.outputs()[0].name, "total");

    let body = evaluate(&service, ServingRequest::new(r#"{"x": [[1, 2], [3, 4]]}"#));
    assert_eq!(json_body(&body), json!({"total": [6.0, 14.0]}));
    assert_eq!(service.evaluation_count(), 4);
}

#[test]
fn test_debug_output_of_first_stage() {
    let service = chain_service();
    let request = ServingRequest::new(r#"{"x": [[1, 2]]}"#).debug_stage("output:0");
    let body = evaluate(&service, request);
    assert_eq!(json_body(&body), json!({"y": [[2.0, 4.0]]}));
    assert_eq!(service.evaluation_count(), 0);
}

#[test]
fn test_debug_input_of_second_stage() {
    let service = chain_service();
    let request = service.request_from_headers(
        [("X-Debug-Stage", "input:1")],
        r#"{"x": [[1, 2]]}"#.as_bytes(),
    );
    let body = evaluate(&service, request);
    assert_eq!(json_body(&body), json!({"y": [[2.0, 4.0]]}));
    assert_eq!(service.evaluation_count(), 1);
}

#[test]
fn test_debug_stage_past_the_chain_is_ignored() {
    let service = chain_service();
    let request = ServingRequest::new(r#"{"x": [[1, 2]]}"#).debug_stage("output:7");
    let body = evaluate(&service, request);
    assert_eq!(json_body(&body), json!({"total": 6.0}));
}

#[test]
fn test_custom_debug_header() {
    let mut config = doubling_config();
    config.debug_header = "X-Stage".to_string();
    let service = EvaluationService::with_backend(Doubling { from: "x", to: "y" }, config).unwrap();

    let request = service.request_from_headers([("x-stage", "input:0")], r#"{"x": [1, 2, 3, 4]}"#);
    let body = evaluate(&service, request);
    assert_eq!(json_body(&body), json!({"x": [[1.0, 2.0], [3.0, 4.0]]}));
}

// =============================================================================
// SCHEMAS
// =============================================================================

#[test]
fn test_rolling_window() {
    let config = ServingConfig::builder()
        .rolling_window_size(2)
        .input(TensorField::new("x", DataType::Double, vec![-1, 2, 2]))
        .output(TensorField::new("y", DataType::Double, vec![-1, 2, 2]))
        .build()
        .unwrap();
    let service = EvaluationService::with_backend(Doubling { from: "x", to: "y" }, config).unwrap();

    let body = evaluate(&service, ServingRequest::new(r#"{"x": [[1, 2], [3, 4], [5, 6]]}"#));
    assert_eq!(
        json_body(&body),
        json!({"y": [[[2.0, 4.0], [6.0, 8.0]], [[6.0, 8.0], [10.0, 12.0]]]})
    );
    assert_eq!(service.evaluation_count(), 2);
}

#[test]
fn test_index_columns_in_and_out() {
    let config = ServingConfig::builder()
        .input(
            TensorField::new("x", DataType::Double, vec![-1, 2])
                .with_index(TensorIndex::new("a", 0))
                .with_index(TensorIndex::new("b", 1)),
        )
        .output(
            TensorField::new("y", DataType::Double, vec![-1, 2])
                .with_index(TensorIndex::new("first", 0))
                .with_index(TensorIndex::new("second", 1).with_type(DataType::Long)),
        )
        .build()
        .unwrap();
    let service = EvaluationService::with_backend(Doubling { from: "x", to: "y" }, config).unwrap();

    let body = evaluate(&service, ServingRequest::new(r#"{"a": [1, 3], "b": [2, 4]}"#));
    assert_eq!(json_body(&body), json!({"first": [2.0, 6.0], "second": [4, 8]}));
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[test]
fn test_counter_is_shared_between_threads() {
    let service = Arc::new(doubling_service());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..5 {
                    let response = service.handle(&ServingRequest::new(r#"{"x": [[1, 2], [3, 4]]}"#));
                    assert!(response.is_success());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(service.evaluation_count(), 40);
}

// =============================================================================
// PROCESSORS
// =============================================================================

fn scaler() -> StandardScaler {
    let scales = std::collections::BTreeMap::from([("age".to_string(), MeanStd::new(40.0, 10.0))]);
    StandardScaler::new(
        vec![TensorField::new("age", DataType::Double, vec![-1])],
        vec![TensorField::new("age_scaled", DataType::Double, vec![-1])],
        scales,
    )
    .unwrap()
}

#[test]
fn test_standard_scaler_served_alone() {
    let service = EvaluationService::new(scaler(), ServingConfig::default()).unwrap();
    let body = evaluate(&service, ServingRequest::new(r#"{"age": [30, 40, 60]}"#));
    assert_eq!(json_body(&body), json!({"age_scaled": [-1.0, 0.0, 2.0]}));
    assert_eq!(service.evaluation_count(), 1);
}

#[test]
fn test_standard_scaler_feeds_a_model() {
    let scaled = TensorField::new("age_scaled", DataType::Double, vec![-1]);
    let doubled = TensorField::new("doubled", DataType::Double, vec![-1]);
    let stages: Vec<Box<dyn Evaluator>> = vec![
        Box::new(scaler()),
        Box::new(TensorEvaluator::new(
            Doubling { from: "age_scaled", to: "doubled" },
            vec![scaled],
            vec![doubled],
        )),
    ];
    let chain = EvaluatorChain::new(stages, Vec::new()).unwrap();
    let service = EvaluationService::new(chain, ServingConfig::default()).unwrap();

    let body = evaluate(&service, ServingRequest::new(r#"{"age": [50, 20]}"#));
    assert_eq!(json_body(&body), json!({"doubled": [2.0, -4.0]}));

    let body = evaluate(&service, ServingRequest::new(r#"{"age": [50, 20]}"#).debug_stage("output:0"));
    assert_eq!(json_body(&body), json!({"age_scaled": [1.0, -2.0]}));
}

#[test]
fn test_scaler_without_its_column() {
    let service = EvaluationService::new(scaler(), ServingConfig::default()).unwrap();
    let response = service.handle(&ServingRequest::new(r#"{"height": [1.8]}"#));
    assert_eq!(response.status, 400);
    assert_eq!(json_body(&response.body)["code"], "MissingTensor");
}

// =============================================================================
// DESCRIPTION
// =============================================================================

#[test]
fn test_describe_chain() {
    let service = chain_service();
    let description = service.describe();
    assert_eq!(description.inputs.len(), 1);
    assert_eq!(description.outputs[0].name, "total");

    let body = service.describe_json().unwrap();
    assert_eq!(
        json_body(&body),
        json!({
            "inputs": [{"name": "x", "type": "double", "shape": [-1, 2]}],
            "outputs": [{"name": "total", "type": "double", "shape": [-1]}]
        })
    );
}
