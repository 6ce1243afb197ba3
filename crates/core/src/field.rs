//! Schema descriptions of evaluator inputs and outputs.
//!
//! A [`TensorField`] names one tensor with its expected type and shape. It
//! may declare [`TensorIndex`] children, each naming one column of the
//! field's `[batch, columns]` layout so callers can exchange separate
//! vectors instead of the whole matrix.

use crate::data_type::DataType;
use crate::error::{ConversionError, Result};
use crate::shape::TensorShape;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One named column of a [`TensorField`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorIndex {
    /// Column tensor name
    pub name: String,
    /// Element type, defaulting to the parent field's type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,
    /// Zero-based column position
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl TensorIndex {
    /// Column `name` at position `index`
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            index: Some(index),
        }
    }

    /// Column without a declared position
    pub fn unindexed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            index: None,
        }
    }

    /// Override the element type
    pub fn with_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }
}

/// Expected tensor of an evaluator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorField {
    /// Tensor name
    pub name: String,
    /// Element type
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Expected shape, wildcards allowed
    #[serde(default)]
    pub shape: TensorShape,
    /// Index columns
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<TensorIndex>,
}

impl TensorField {
    /// Field without index columns
    pub fn new(name: impl Into<String>, data_type: DataType, shape: impl Into<TensorShape>) -> Self {
        Self {
            name: name.into(),
            data_type,
            shape: shape.into(),
            fields: Vec::new(),
        }
    }

    /// Add an index column
    pub fn with_index(mut self, index: TensorIndex) -> Self {
        self.fields.push(index);
        self
    }

    /// Check if index columns are declared
    pub fn has_indexes(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Effective element type of `index`
    pub fn index_type(&self, index: &TensorIndex) -> DataType {
        index.data_type.unwrap_or(self.data_type)
    }

    /// Check that every index column has a position and no two share one,
    /// and that the declared extents have a representable element count.
    pub fn validate(&self) -> Result<()> {
        let known: Vec<i64> = self.shape.dims().iter().map(|d| (*d).max(1)).collect();
        TensorShape::new(known).element_count().map_err(|_| {
            ConversionError::Shape(format!(
                "shape {} of field {} has too many elements",
                self.shape, self.name
            ))
        })?;

        let missing: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.index.is_none())
            .map(|f| f.name.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(ConversionError::Schema(format!(
                "indexes of field {} are empty for: {}",
                self.name,
                missing.join(",")
            )));
        }

        let mut by_position: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        for f in &self.fields {
            if let Some(position) = f.index {
                by_position.entry(position).or_default().push(&f.name);
            }
        }
        if let Some((position, names)) = by_position.iter().find(|(_, names)| names.len() > 1) {
            return Err(ConversionError::Schema(format!(
                "index {} of field {} is shared by: {}",
                position,
                self.name,
                names.join(",")
            )));
        }
        Ok(())
    }
}
