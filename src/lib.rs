//! # tensorserve
//!
//! Model-serving runtime: typed tensors, schema transforms and
//! content-negotiated wire codecs.
//!
//! This crate implements the serving facade:
//! - [`ServingConfig`]: TOML or builder configuration
//! - [`EvaluationService`]: decode a request, evaluate it, encode the response
//! - [`ServiceError`]: client and server failures with canonical codes
//!
//! The building blocks live in their own crates: `tensorserve-core`
//! (tensors, schemas, evaluators), `tensorserve-image` (image layouts and
//! codec) and `tensorserve-wire` (request and response bodies). The
//! [`prelude`] gathers what an evaluator implementation needs.
//!
//! ## Quick Start
//!
//! ```
//! use tensorserve::prelude::*;
//!
//! struct Identity;
//!
//! impl Evaluator for Identity {
//!     fn evaluate(
//!         &self,
//!         input: TensorCollection,
//!         _context: &mut EvaluationContext,
//!     ) -> ConversionResult<TensorCollection> {
//!         Ok(input)
//!     }
//!
//!     fn inputs(&self) -> Vec<TensorField> {
//!         Vec::new()
//!     }
//!
//!     fn outputs(&self) -> Vec<TensorField> {
//!         Vec::new()
//!     }
//! }
//!
//! let service = EvaluationService::new(Identity, ServingConfig::default()).unwrap();
//! let request = ServingRequest::new(r#"{"x": 1}"#).accept("text/html");
//! let response = service.handle(&request);
//! assert_eq!(response.body.as_str(), Some("<h1>x</h1><p>1</p>"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod service;

pub mod prelude;

pub use config::{ImageConfig, ServingConfig, ServingConfigBuilder, DEFAULT_ACCEPT, DEFAULT_DEBUG_HEADER};
pub use error::{Result, ServiceError};
pub use service::{EvaluationService, ModelDescription, ServingRequest, ServingResponse};
