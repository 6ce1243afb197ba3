//! Service error type.
//!
//! ## Canonical Error Codes
//!
//! | Variant | Code | Category |
//! |---------|------|----------|
//! | Conversion | the conversion error's code | client |
//! | Evaluator | the conversion error's code | server |
//! | Config | ConfigError | server |

use tensorserve_core::ConversionError;
use thiserror::Error;

/// All errors of the serving facade.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request could not be decoded, converted or encoded
    #[error(transparent)]
    Conversion(ConversionError),

    /// The evaluator failed on a well-formed request
    #[error("evaluator error: {0}")]
    Evaluator(ConversionError),

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(String),
}

/// Result type for serving operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
    /// Canonical error code
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Conversion(e) | ServiceError::Evaluator(e) => e.code(),
            ServiceError::Config(_) => "ConfigError",
        }
    }

    /// Check if the caller is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ServiceError::Conversion(_))
    }

    /// Underlying conversion error, if any
    pub fn conversion(&self) -> Option<&ConversionError> {
        match self {
            ServiceError::Conversion(e) | ServiceError::Evaluator(e) => Some(e),
            ServiceError::Config(_) => None,
        }
    }
}

// Server-side conversion failures belong to the evaluator
impl From<ConversionError> for ServiceError {
    fn from(e: ConversionError) -> Self {
        if e.is_client_error() {
            ServiceError::Conversion(e)
        } else {
            ServiceError::Evaluator(e)
        }
    }
}
