//! Tensor conversion core for tensorserve
//!
//! This crate implements the typed data model exchanged with model backends:
//! - DataType / Element: the closed set of element kinds and their conversions
//! - TensorShape: shape algebra with `-1` wildcards
//! - CoordinateIterator: row-major coordinate walks, optionally rolling
//! - Tensor: flat typed buffer with shape and nullability
//! - TensorCollection: named tensors of one request
//! - StructuralTensorBuilder: tensors inferred from nested JSON
//! - SchemaTransform: collections reshaped after evaluator fields and indexes
//! - Evaluator / TensorEvaluator / EvaluatorChain: the evaluation pipeline
//! - StandardScaler: per-column standardization as a pipeline stage
//!
//! ## Tensor shapes
//!
//! | Shape | Meaning |
//! |-------|---------|
//! | `[]` | scalar |
//! | `[n]` | vector |
//! | `[-1, 3]` | any number of rows of 3 columns |
//! | `[-1, -1, -1, 3]` | batch of RGB images of any size |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod builder;
pub mod collection;
pub mod context;
pub mod data_type;
pub mod element;
pub mod error;
pub mod evaluator;
pub mod field;
pub mod iter;
pub mod scaler;
pub mod shape;
pub mod tensor;

pub use buffer::Buffer;
pub use builder::{Builder, SchemaTransform, StructuralTensorBuilder};
pub use collection::TensorCollection;
pub use context::{DebugPoint, EvaluationContext};
pub use data_type::DataType;
pub use element::Element;
pub use error::{ConversionError, Result, ResultExt};
pub use evaluator::{Evaluator, EvaluatorChain, TensorBackend, TensorEvaluator};
pub use field::{TensorField, TensorIndex};
pub use iter::CoordinateIterator;
pub use scaler::{MeanStd, StandardScaler};
pub use shape::TensorShape;
pub use tensor::{CoordValue, Tensor};
