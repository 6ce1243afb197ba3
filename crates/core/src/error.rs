//! Conversion error taxonomy.
//!
//! Every operation of the conversion layer fails with a [`ConversionError`].
//! Errors are synchronous, local to one request and never retryable.
//!
//! ## Error Codes
//!
//! | Code | Description |
//! |------|-------------|
//! | ShapeError | Invalid shape, coordinate or reshape target |
//! | TypeError | Value not convertible to the requested element type |
//! | DimensionMismatch | Nested input whose length differs from the inferred dimension |
//! | MixedTypes | Nested input mixing incompatible element kinds |
//! | MissingTensor | Neither a field tensor nor one of its index columns was supplied |
//! | DecodeError | Malformed structural input (JSON, multipart, debug directive) |
//! | UnsupportedMediaType | Content-Type or Accept value not handled |
//! | ImageError | Image decoding, encoding or layout failure |
//! | SchemaError | Invalid evaluator schema (field/index declarations) |
//! | BackendError | The model backend failed to evaluate a batch |

use thiserror::Error;

/// Errors raised while converting between wire payloads, tensors and images.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Invalid shape or coordinates
    #[error("shape error: {0}")]
    Shape(String),

    /// Element type conversion failure
    #[error("type error: {0}")]
    Type(String),

    /// A nested sequence has a length different from the inferred dimension
    #[error("dimension {dimension} expected size {expected} found {found}")]
    DimensionMismatch {
        /// Zero-based axis of the mismatch
        dimension: usize,
        /// Size inferred from the first element at that level
        expected: i64,
        /// Size actually found
        found: usize,
    },

    /// Nested input mixes element kinds that cannot be unified
    #[error("incompatible element types found: {}", format_kinds(.found))]
    MixedTypes {
        /// Alphabetically sorted kind names
        found: Vec<String>,
    },

    /// Neither the field tensor nor one of its index columns is present
    #[error("{}", missing_message(.field, .index.as_deref()))]
    MissingTensor {
        /// Field name
        field: String,
        /// First missing index column, if the field declares any
        index: Option<String>,
    },

    /// Malformed structural input
    #[error("decode error: {0}")]
    Decode(String),

    /// Content-Type or Accept value that cannot be handled
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Image codec failure
    #[error("image error: {0}")]
    Image(String),

    /// Invalid evaluator schema
    #[error("schema error: {0}")]
    Schema(String),

    /// Model backend failure
    #[error("backend error: {0}")]
    Backend(String),

    /// Error wrapped with the operation or tensor it happened in
    #[error("{context}: {source}")]
    Context {
        /// What was being converted
        context: String,
        /// Underlying error
        #[source]
        source: Box<ConversionError>,
    },
}

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, ConversionError>;

fn format_kinds(kinds: &[String]) -> String {
    let quoted: Vec<String> = kinds.iter().map(|k| format!("\"{}\"", k)).collect();
    format!("[{}]", quoted.join(","))
}

fn missing_message(field: &str, index: Option<&str>) -> String {
    match index {
        Some(index) => format!(
            "unable to find either a tensor with name {} or with name {}",
            field, index
        ),
        None => format!("unable to find a tensor with name {}", field),
    }
}

impl ConversionError {
    /// Wrap this error with a context prefix.
    pub fn context(self, context: impl Into<String>) -> Self {
        ConversionError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context wrappers.
    pub fn root(&self) -> &ConversionError {
        match self {
            ConversionError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Get the canonical error code
    pub fn code(&self) -> &'static str {
        match self.root() {
            ConversionError::Shape(_) => "ShapeError",
            ConversionError::Type(_) => "TypeError",
            ConversionError::DimensionMismatch { .. } => "DimensionMismatch",
            ConversionError::MixedTypes { .. } => "MixedTypes",
            ConversionError::MissingTensor { .. } => "MissingTensor",
            ConversionError::Decode(_) => "DecodeError",
            ConversionError::UnsupportedMediaType(_) => "UnsupportedMediaType",
            ConversionError::Image(_) => "ImageError",
            ConversionError::Schema(_) => "SchemaError",
            ConversionError::Backend(_) => "BackendError",
            ConversionError::Context { .. } => unreachable!("root() never returns a context"),
        }
    }

    /// Check if the caller is at fault.
    ///
    /// Everything but a broken evaluator schema or a failing backend is
    /// caused by the request.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self.root(),
            ConversionError::Schema(_) | ConversionError::Backend(_)
        )
    }

    /// Check if this is a shape error.
    pub fn is_shape_error(&self) -> bool {
        matches!(self.root(), ConversionError::Shape(_))
    }

    /// Check if this is a type error.
    pub fn is_type_error(&self) -> bool {
        matches!(self.root(), ConversionError::Type(_))
    }
}

/// Extension adding `.context()` to conversion results.
pub trait ResultExt<T> {
    /// Prefix the error, if any, with `context`.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Prefix the error, if any, with a lazily built context.
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}
