//! Convenient imports for tensorserve.
//!
//! ```
//! use tensorserve::prelude::*;
//!
//! let config = ServingConfig::builder()
//!     .input(TensorField::new("x", DataType::Double, vec![-1, 2]))
//!     .build()
//!     .unwrap();
//! assert_eq!(config.inputs.len(), 1);
//! ```

// Facade
pub use crate::{
    EvaluationService, ModelDescription, ServiceError, ServingConfig, ServingRequest, ServingResponse,
};

// Tensors and schemas
pub use tensorserve_core::Result as ConversionResult;
pub use tensorserve_core::{
    Builder, ConversionError, DataType, Element, EvaluationContext, Evaluator, EvaluatorChain, MeanStd,
    SchemaTransform, StandardScaler, StructuralTensorBuilder, Tensor, TensorBackend, TensorCollection, TensorEvaluator, TensorField,
    TensorIndex, TensorShape,
};

// Images and wire formats
pub use tensorserve_image::{ImageFormat, ImageLayout};
pub use tensorserve_wire::{Accept, EncodedBody};

// Re-export serde_json for convenience
pub use serde_json::json;
