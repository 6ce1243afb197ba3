//! Serving Pipeline Test Suite
//!
//! End-to-end checks of `EvaluationService`: request decoding, evaluation
//! through tensor evaluators and chains, and response encoding.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test serving_pipeline
//!
//! # Run image tests only
//! cargo test --test serving_pipeline images::
//! ```

use serde_json::Value as JsonValue;
use tensorserve::prelude::*;

// Test modules
pub mod errors;
pub mod images;
pub mod negotiation;
pub mod stages;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Send service logs to the test output
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Returns its input untouched
pub struct Identity;

impl Evaluator for Identity {
    fn evaluate(
        &self,
        input: TensorCollection,
        _context: &mut EvaluationContext,
    ) -> ConversionResult<TensorCollection> {
        Ok(input)
    }

    fn inputs(&self) -> Vec<TensorField> {
        Vec::new()
    }

    fn outputs(&self) -> Vec<TensorField> {
        Vec::new()
    }
}

/// Multiplies every element of `from` by two into `to`
pub struct Doubling {
    pub from: &'static str,
    pub to: &'static str,
}

impl TensorBackend for Doubling {
    fn evaluate_tensors(&self, input: TensorCollection) -> ConversionResult<TensorCollection> {
        let tensor = input
            .get(self.from)
            .ok_or_else(|| ConversionError::Backend(format!("no tensor {}", self.from)))?;
        let doubled = tensor.map(DataType::Double, |e| {
            Ok(Element::Double(e.as_f64().unwrap_or_default() * 2.0))
        })?;
        Ok(TensorCollection::single(self.to, doubled))
    }
}

/// Sums the rows of `y` into `total`
pub struct RowSum;

impl TensorBackend for RowSum {
    fn evaluate_tensors(&self, input: TensorCollection) -> ConversionResult<TensorCollection> {
        let y = input
            .get("y")
            .ok_or_else(|| ConversionError::Backend("no tensor y".into()))?;
        let rows = y.dims()[0];
        let width = y.len() / rows.max(1);
        let sums: Vec<f64> = (0..rows)
            .map(|r| {
                (0..width)
                    .filter_map(|c| y.element(r * width + c).as_f64())
                    .sum()
            })
            .collect();
        Ok(TensorCollection::single("total", Tensor::vector(sums)))
    }
}

/// Inverts the pixels of `image` into `inverted`
pub struct Invert;

impl TensorBackend for Invert {
    fn evaluate_tensors(&self, input: TensorCollection) -> ConversionResult<TensorCollection> {
        let image = input
            .get("image")
            .ok_or_else(|| ConversionError::Backend("no tensor image".into()))?;
        let inverted = image.map(DataType::Integer, |e| {
            Ok(Element::Integer(255 - e.as_i64().unwrap_or_default() as i32))
        })?;
        Ok(TensorCollection::single("inverted", inverted))
    }
}

/// Fails on every batch
pub struct Broken;

impl TensorBackend for Broken {
    fn evaluate_tensors(&self, _input: TensorCollection) -> ConversionResult<TensorCollection> {
        Err(ConversionError::Backend("model crashed".into()))
    }
}

/// `x: double[-1, 2]` doubled into `y: double[-1, 2]`
pub fn doubling_config() -> ServingConfig {
    ServingConfig::builder()
        .input(TensorField::new("x", DataType::Double, vec![-1, 2]))
        .output(TensorField::new("y", DataType::Double, vec![-1, 2]))
        .build()
        .unwrap()
}

/// Service doubling `x` into `y`
pub fn doubling_service() -> EvaluationService {
    EvaluationService::with_backend(Doubling { from: "x", to: "y" }, doubling_config()).unwrap()
}

/// Service inverting RGB images
pub fn invert_config() -> ServingConfig {
    ServingConfig::builder()
        .input(TensorField::new("image", DataType::Integer, vec![-1, -1, -1, 3]))
        .output(TensorField::new("inverted", DataType::Integer, vec![-1, -1, -1, 3]))
        .build()
        .unwrap()
}

/// Service inverting RGB images
pub fn invert_service() -> EvaluationService {
    EvaluationService::with_backend(Invert, invert_config()).unwrap()
}

/// Uniform RGB PNG
pub fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(width, height, image::Rgb(color)));
    let mut cursor = std::io::Cursor::new(Vec::new());
    image.write_to(&mut cursor, image::ImageOutputFormat::Png).unwrap();
    cursor.into_inner()
}

/// Parse a JSON response body
pub fn json_body(body: &EncodedBody) -> JsonValue {
    serde_json::from_slice(&body.bytes).unwrap()
}

/// Evaluate and unwrap
pub fn evaluate(service: &EvaluationService, request: ServingRequest) -> EncodedBody {
    match service.evaluate(&request) {
        Ok(body) => body,
        Err(e) => panic!("evaluation failed: {}", e),
    }
}

/// Evaluate, expecting a failure
pub fn evaluate_err(service: &EvaluationService, request: ServingRequest) -> ServiceError {
    match service.evaluate(&request) {
        Ok(body) => panic!("expected a failure, got {:?}", body.as_str()),
        Err(e) => e,
    }
}
