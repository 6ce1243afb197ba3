//! Request handling: decode, evaluate, encode.

use crate::config::ServingConfig;
use crate::error::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tensorserve_core::{
    ConversionError, EvaluationContext, Evaluator, TensorBackend, TensorEvaluator, TensorField,
};
use tensorserve_wire::media_type::JSON;
use tensorserve_wire::{encode_error_message, encode_response, Accept, EncodedBody, RequestDecoder};
use tracing::{debug, error, info, warn};

/// HTTP-agnostic view of one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServingRequest {
    /// Content-Type header, JSON when absent
    pub content_type: Option<String>,
    /// Accept header, the configured default when absent
    pub accept: Option<String>,
    /// Debug directive such as `output:0`
    pub debug_stage: Option<String>,
    /// Raw body
    pub body: Vec<u8>,
}

impl ServingRequest {
    /// Request with `body` and no headers
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    /// Request from header pairs, header names matched case-insensitively.
    ///
    /// The debug directive is read from `debug_header`.
    pub fn from_headers<'a, I>(headers: I, debug_header: &str, body: impl Into<Vec<u8>>) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut request = Self::new(body);
        for (name, value) in headers {
            if name.eq_ignore_ascii_case("content-type") {
                request.content_type = Some(value.to_string());
            } else if name.eq_ignore_ascii_case("accept") {
                request.accept = Some(value.to_string());
            } else if name.eq_ignore_ascii_case(debug_header) {
                request.debug_stage = Some(value.to_string());
            }
        }
        request
    }

    /// Set the Content-Type
    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(value.into());
        self
    }

    /// Set the Accept header
    pub fn accept(mut self, value: impl Into<String>) -> Self {
        self.accept = Some(value.into());
        self
    }

    /// Set the debug directive
    pub fn debug_stage(mut self, value: impl Into<String>) -> Self {
        self.debug_stage = Some(value.into());
        self
    }
}

/// Response to one request, errors included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServingResponse {
    /// HTTP status: 200, 400 for client errors, 500 otherwise
    pub status: u16,
    /// Encoded payload or error body
    pub body: EncodedBody,
}

impl ServingResponse {
    /// Check if the request succeeded
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Evaluator exposed through the wire formats.
///
/// The service is shared between request threads; the only mutable state
/// is the running count of evaluated rows.
pub struct EvaluationService {
    evaluator: Arc<dyn Evaluator>,
    config: ServingConfig,
    decoder: RequestDecoder,
    outputs: Vec<TensorField>,
    evaluations: AtomicU64,
}

/// Schema of a served evaluator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescription {
    /// Tensors decoded from requests
    pub inputs: Vec<TensorField>,
    /// Tensors encoded into responses
    pub outputs: Vec<TensorField>,
}

impl fmt::Debug for EvaluationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationService")
            .field("config", &self.config)
            .field("evaluations", &self.evaluations)
            .finish_non_exhaustive()
    }
}

impl EvaluationService {
    /// Serve `evaluator` with `config`.
    pub fn new(evaluator: impl Evaluator + 'static, config: ServingConfig) -> Result<Self> {
        Self::from_arc(Arc::new(evaluator), config)
    }

    /// Serve a shared evaluator with `config`.
    ///
    /// Inputs and outputs declared in `config` take precedence over the
    /// evaluator's own.
    pub fn from_arc(evaluator: Arc<dyn Evaluator>, config: ServingConfig) -> Result<Self> {
        config.validate()?;
        let inputs = if config.inputs.is_empty() {
            evaluator.inputs()
        } else {
            config.inputs.clone()
        };
        let outputs = if config.outputs.is_empty() {
            evaluator.outputs()
        } else {
            config.outputs.clone()
        };
        let decoder = RequestDecoder::new(inputs)
            .expected_width(config.image.expected_width)
            .expected_height(config.image.expected_height);

        Ok(Self {
            evaluator,
            config,
            decoder,
            outputs,
            evaluations: AtomicU64::new(0),
        })
    }

    /// Serve `backend` wrapped in a [`TensorEvaluator`] built from `config`.
    pub fn with_backend<B: TensorBackend + 'static>(backend: B, config: ServingConfig) -> Result<Self> {
        if config.inputs.is_empty() || config.outputs.is_empty() {
            return Err(ServiceError::Config(
                "serving a backend needs inputs and outputs in the configuration".to_string(),
            ));
        }
        let evaluator = TensorEvaluator::new(backend, config.inputs.clone(), config.outputs.clone())
            .with_rolling_window_size(config.rolling_window_size);
        Self::new(evaluator, config)
    }

    /// Active configuration
    pub fn config(&self) -> &ServingConfig {
        &self.config
    }

    /// Tensors decoded from requests
    pub fn inputs(&self) -> &[TensorField] {
        self.decoder.fields()
    }

    /// Tensors encoded into responses
    pub fn outputs(&self) -> &[TensorField] {
        &self.outputs
    }

    /// Rows evaluated since the service started
    pub fn evaluation_count(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    /// Inputs and outputs as served
    pub fn describe(&self) -> ModelDescription {
        ModelDescription {
            inputs: self.inputs().to_vec(),
            outputs: self.outputs.clone(),
        }
    }

    /// [`describe`](Self::describe) as a JSON body.
    pub fn describe_json(&self) -> Result<EncodedBody> {
        let bytes = serde_json::to_vec(&self.describe()).map_err(|e| {
            ServiceError::Evaluator(ConversionError::Schema(format!(
                "unable to describe the evaluator: {}",
                e
            )))
        })?;
        Ok(EncodedBody {
            media_type: JSON.to_string(),
            bytes,
        })
    }

    /// Request built from header pairs with the configured debug header
    pub fn request_from_headers<'a, I>(&self, headers: I, body: impl Into<Vec<u8>>) -> ServingRequest
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        ServingRequest::from_headers(headers, &self.config.debug_header, body)
    }

    /// Decode, evaluate and encode one request.
    pub fn evaluate(&self, request: &ServingRequest) -> Result<EncodedBody> {
        let accept_header = request
            .accept
            .as_deref()
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(self.config.default_accept.as_str());
        let accept = Accept::parse(Some(accept_header))?;
        let mut context = EvaluationContext::from_header(request.debug_stage.as_deref())?;

        let input = self
            .decoder
            .decode(request.content_type.as_deref(), &request.body)?;
        info!(
            "Decoded {} request with tensors {:?}",
            request.content_type.as_deref().unwrap_or("application/json"),
            input.names()
        );
        debug!("Evaluating a batch of {} rows", input.batch_size());

        let output = self.evaluator.evaluate(input, &mut context)?;
        self.evaluations
            .fetch_add(context.evaluation_count(), Ordering::Relaxed);
        if context.is_interrupted() {
            debug!("Stopped at debug stage {:?}", context.debug_stage());
        }

        let body = encode_response(&output, &accept, &self.outputs, context.simplify_output())?;
        Ok(body)
    }

    /// Like [`evaluate`](Self::evaluate), turning errors into error bodies.
    pub fn handle(&self, request: &ServingRequest) -> ServingResponse {
        match self.evaluate(request) {
            Ok(body) => ServingResponse { status: 200, body },
            Err(e) => {
                let status = if e.is_client_error() {
                    warn!("Rejected request: {}", e);
                    400
                } else {
                    error!("Evaluation failed: {}", e);
                    500
                };
                ServingResponse {
                    status,
                    body: encode_error_message(e.code(), &e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tensorserve_core::{DataType, TensorIndex, TensorCollection};

    /// Copies its input to its output
    struct Echo;

    impl Evaluator for Echo {
        fn evaluate(
            &self,
            input: TensorCollection,
            context: &mut EvaluationContext,
        ) -> tensorserve_core::Result<TensorCollection> {
            context.inc_evaluation_by(input.batch_size() as u64);
            Ok(input)
        }

        fn inputs(&self) -> Vec<TensorField> {
            vec![TensorField::new("x", DataType::Long, Vec::<i64>::new())]
        }

        fn outputs(&self) -> Vec<TensorField> {
            self.inputs()
        }
    }

    /// Backend failing on every batch
    struct Broken;

    impl TensorBackend for Broken {
        fn evaluate_tensors(&self, _: TensorCollection) -> tensorserve_core::Result<TensorCollection> {
            Err(ConversionError::Backend("model not loaded".into()))
        }
    }

    fn echo() -> EvaluationService {
        EvaluationService::new(Echo, ServingConfig::default()).unwrap()
    }

    #[test]
    fn test_json_round_trip() {
        let service = echo();
        let body = service.evaluate(&ServingRequest::new(r#"{"x": 1}"#)).unwrap();
        assert_eq!(body.as_str(), Some(r#"{"x":1}"#));
        assert_eq!(service.evaluation_count(), 1);
    }

    #[test]
    fn test_default_accept_from_config() {
        let config = ServingConfig::builder().default_accept("text/html").build().unwrap();
        let service = EvaluationService::new(Echo, config).unwrap();
        let body = service.evaluate(&ServingRequest::new(r#"{"x": 1}"#)).unwrap();
        assert_eq!(body.as_str(), Some("<h1>x</h1><p>1</p>"));
    }

    #[test]
    fn test_headers() {
        let service = echo();
        let request = service.request_from_headers(
            [("content-type", "application/json"), ("ACCEPT", "text/html"), ("x-debug-stage", "input:0")],
            r#"{"x": 1}"#,
        );
        assert_eq!(request.accept.as_deref(), Some("text/html"));
        assert_eq!(request.debug_stage.as_deref(), Some("input:0"));
    }

    #[test]
    fn test_client_and_server_errors() {
        let service = echo();
        let response = service.handle(&ServingRequest::new("{").accept("application/json"));
        assert_eq!(response.status, 400);
        assert!(response.body.as_str().unwrap().contains(r#""code":"DecodeError""#));

        let response = service.handle(&ServingRequest::new("{}").debug_stage("sideways"));
        assert_eq!(response.status, 400);

        let config = ServingConfig::builder()
            .input(TensorField::new("x", DataType::Double, vec![-1]))
            .output(TensorField::new("y", DataType::Double, vec![-1]))
            .build()
            .unwrap();
        let service = EvaluationService::with_backend(Broken, config).unwrap();
        let response = service.handle(&ServingRequest::new(r#"{"x": [1.0, 2.0]}"#));
        assert_eq!(response.status, 500);
        assert!(response.body.as_str().unwrap().contains("model not loaded"));
        assert_eq!(service.evaluation_count(), 0);
    }

    #[test]
    fn test_with_backend_needs_schema() {
        let err = EvaluationService::with_backend(Broken, ServingConfig::default()).unwrap_err();
        assert_eq!(err.code(), "ConfigError");
    }

    #[test]
    fn test_config_overrides_evaluator_fields() {
        let config = ServingConfig::builder()
            .input(TensorField::new("z", DataType::Long, vec![-1]))
            .build()
            .unwrap();
        let service = EvaluationService::new(Echo, config).unwrap();
        assert_eq!(service.inputs()[0].name, "z");
        assert_eq!(service.outputs()[0].name, "x");
    }

    #[test]
    fn test_describe() {
        let config = ServingConfig::builder()
            .input(
                TensorField::new("x", DataType::Double, vec![-1, 2])
                    .with_index(TensorIndex::new("a", 0))
                    .with_index(TensorIndex::new("b", 1)),
            )
            .build()
            .unwrap();
        let service = EvaluationService::new(Echo, config).unwrap();

        let description = service.describe();
        assert_eq!(description.inputs[0].name, "x");
        assert_eq!(description.outputs[0].name, "x");
        assert_eq!(description.outputs[0].data_type, DataType::Long);

        let body = service.describe_json().unwrap();
        assert_eq!(body.media_type, "application/json");
        let value: serde_json::Value = serde_json::from_slice(&body.bytes).unwrap();
        assert_eq!(
            value,
            json!({
                "inputs": [{
                    "name": "x",
                    "type": "double",
                    "shape": [-1, 2],
                    "fields": [{"name": "a", "index": 0}, {"name": "b", "index": 1}]
                }],
                "outputs": [{"name": "x", "type": "long", "shape": []}]
            })
        );
        let parsed: ModelDescription = serde_json::from_slice(&body.bytes).unwrap();
        assert_eq!(parsed, description);
    }
}
