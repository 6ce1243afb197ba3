//! Serving configuration.
//!
//! ```toml
//! rolling_window_size = 1
//! default_accept = "*/*"
//! debug_header = "X-Debug-Stage"
//!
//! [image]
//! expected_width = 224
//! expected_height = 224
//!
//! [[inputs]]
//! name = "image"
//! type = "integer"
//! shape = [-1, -1, -1, 3]
//!
//! [[outputs]]
//! name = "scores"
//! type = "double"
//! shape = [-1, 10]
//! ```

use crate::error::{Result, ServiceError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tensorserve_core::TensorField;
use tensorserve_wire::Accept;

/// Header carrying the debug directive by default
pub const DEFAULT_DEBUG_HEADER: &str = "X-Debug-Stage";

/// Accept value used when a request has none
pub const DEFAULT_ACCEPT: &str = "*/*";

/// Image size overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Width every input image is resized to
    pub expected_width: Option<i64>,
    /// Height every input image is resized to
    pub expected_height: Option<i64>,
}

/// Configuration of an [`EvaluationService`](crate::EvaluationService)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServingConfig {
    /// Rows of history the evaluator consumes per output row
    pub rolling_window_size: usize,
    /// Accept header assumed when the request carries none
    pub default_accept: String,
    /// Evaluator inputs, overriding the evaluator's own when not empty
    pub inputs: Vec<TensorField>,
    /// Evaluator outputs, overriding the evaluator's own when not empty
    pub outputs: Vec<TensorField>,
    /// Image size overrides
    pub image: ImageConfig,
    /// Name of the header carrying the debug directive
    pub debug_header: String,
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            rolling_window_size: 1,
            default_accept: DEFAULT_ACCEPT.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            image: ImageConfig::default(),
            debug_header: DEFAULT_DEBUG_HEADER.to_string(),
        }
    }
}

impl ServingConfig {
    /// Create a builder.
    pub fn builder() -> ServingConfigBuilder {
        ServingConfigBuilder::new()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ServingConfig =
            toml::from_str(text).map_err(|e| ServiceError::Config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            ServiceError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text).map_err(|e| match e {
            ServiceError::Config(msg) => ServiceError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Check every setting.
    pub fn validate(&self) -> Result<()> {
        if self.rolling_window_size == 0 {
            return Err(ServiceError::Config(
                "rolling_window_size must be at least 1".to_string(),
            ));
        }
        Accept::parse(Some(&self.default_accept))
            .map_err(|e| ServiceError::Config(format!("default_accept: {}", e)))?;
        if self.debug_header.trim().is_empty() {
            return Err(ServiceError::Config("debug_header must not be empty".to_string()));
        }
        for (name, size) in [
            ("expected_width", self.image.expected_width),
            ("expected_height", self.image.expected_height),
        ] {
            if matches!(size, Some(v) if v <= 0) {
                return Err(ServiceError::Config(format!("image.{} must be positive", name)));
            }
        }
        for field in self.inputs.iter().chain(&self.outputs) {
            field
                .validate()
                .map_err(|e| ServiceError::Config(format!("field {}: {}", field.name, e)))?;
        }
        Ok(())
    }
}

/// Builder for [`ServingConfig`]
#[derive(Debug, Clone, Default)]
pub struct ServingConfigBuilder {
    config: ServingConfig,
}

impl ServingConfigBuilder {
    /// Builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rolling window size.
    pub fn rolling_window_size(mut self, size: usize) -> Self {
        self.config.rolling_window_size = size;
        self
    }

    /// Set the Accept value used when requests carry none.
    pub fn default_accept(mut self, accept: impl Into<String>) -> Self {
        self.config.default_accept = accept.into();
        self
    }

    /// Add an input field.
    pub fn input(mut self, field: TensorField) -> Self {
        self.config.inputs.push(field);
        self
    }

    /// Add an output field.
    pub fn output(mut self, field: TensorField) -> Self {
        self.config.outputs.push(field);
        self
    }

    /// Resize input images to this width.
    pub fn expected_width(mut self, width: i64) -> Self {
        self.config.image.expected_width = Some(width);
        self
    }

    /// Resize input images to this height.
    pub fn expected_height(mut self, height: i64) -> Self {
        self.config.image.expected_height = Some(height);
        self
    }

    /// Set the debug header name.
    pub fn debug_header(mut self, header: impl Into<String>) -> Self {
        self.config.debug_header = header.into();
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<ServingConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tensorserve_core::{DataType, TensorShape};

    #[test]
    fn test_defaults() {
        let config = ServingConfig::default();
        assert_eq!(config.rolling_window_size, 1);
        assert_eq!(config.default_accept, "*/*");
        assert_eq!(config.debug_header, "X-Debug-Stage");
        assert!(config.image.expected_width.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = ServingConfig::from_toml_str(
            r#"
            rolling_window_size = 3
            default_accept = "text/html"

            [image]
            expected_width = 32

            [[inputs]]
            name = "image"
            type = "integer"
            shape = [-1, -1, -1, 3]
            "#,
        )
        .unwrap();
        assert_eq!(config.rolling_window_size, 3);
        assert_eq!(config.default_accept, "text/html");
        assert_eq!(config.image.expected_width, Some(32));
        assert_eq!(config.image.expected_height, None);
        assert_eq!(config.inputs[0].data_type, DataType::Integer);
        assert_eq!(config.inputs[0].shape, TensorShape::new(vec![-1, -1, -1, 3]));
        assert_eq!(config.debug_header, DEFAULT_DEBUG_HEADER);
    }

    #[test]
    fn test_invalid_configs() {
        let err = ServingConfig::from_toml_str("rolling_window_size = 0").unwrap_err();
        assert!(err.to_string().contains("rolling_window_size"));

        let err = ServingConfig::from_toml_str(r#"default_accept = "text/csv""#).unwrap_err();
        assert!(err.to_string().contains("default_accept"));

        let err = ServingConfig::from_toml_str("rolling_window_size = \"many\"").unwrap_err();
        assert_eq!(err.code(), "ConfigError");

        let err = ServingConfig::from_toml_str("[image]\nexpected_height = -4").unwrap_err();
        assert!(err.to_string().contains("image.expected_height"));
    }

    #[test]
    fn test_overflowing_field_shape() {
        let err = ServingConfig::from_toml_str(
            r#"
            [[inputs]]
            name = "x"
            type = "double"
            shape = [-1, 4294967296, 4294967296]
            "#,
        )
        .unwrap_err();
        assert_eq!(err.code(), "ConfigError");
        assert!(err.to_string().contains("field x"));
        assert!(err.to_string().contains("too many elements"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "debug_header = \"X-Stage\"").unwrap();
        let config = ServingConfig::from_file(file.path()).unwrap();
        assert_eq!(config.debug_header, "X-Stage");

        let err = ServingConfig::from_file("/nonexistent/tensorserve.toml").unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_builder() {
        let config = ServingConfig::builder()
            .rolling_window_size(2)
            .default_accept("application/json")
            .input(TensorField::new("x", DataType::Double, vec![-1, 2]))
            .output(TensorField::new("y", DataType::Double, vec![-1]))
            .expected_width(10)
            .expected_height(20)
            .build()
            .unwrap();
        assert_eq!(config.inputs.len(), 1);
        assert_eq!(config.outputs[0].name, "y");
        assert_eq!(config.image.expected_height, Some(20));

        assert!(ServingConfig::builder().debug_header(" ").build().is_err());
    }
}
