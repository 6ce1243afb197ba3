//! Tensors inferred from loosely typed nested data.
//!
//! The shape comes from the first element at each nesting level, the element
//! type from the set of leaf kinds. Numeric kinds widen to the first present
//! of `double`, `float`, `long`, falling back to `integer`. Ragged input is
//! only detected while copying the data.

use super::Builder;
use crate::collection::TensorCollection;
use crate::data_type::DataType;
use crate::element::Element;
use crate::error::{ConversionError, Result, ResultExt};
use crate::tensor::Tensor;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;

/// Builds a [`Tensor`] from a parsed JSON value
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralTensorBuilder;

impl StructuralTensorBuilder {
    /// Create a builder
    pub fn new() -> Self {
        Self
    }

    /// Shape implied by the first element at every level.
    ///
    /// An empty sequence contributes a zero extent and stops the descent.
    pub fn infer_shape(input: &JsonValue) -> Vec<usize> {
        let mut shape = Vec::new();
        let mut node = input;
        while let JsonValue::Array(items) = node {
            shape.push(items.len());
            match items.first() {
                Some(first) => node = first,
                None => break,
            }
        }
        shape
    }

    /// Unified element type and whether a null leaf was seen.
    pub fn infer_type(input: &JsonValue) -> Result<(Option<DataType>, bool)> {
        let mut kinds = BTreeSet::new();
        let mut nullable = false;
        collect_kinds(input, &mut kinds, &mut nullable)?;

        let data_type = if kinds.is_empty() {
            None
        } else if kinds.len() == 1 {
            kinds.iter().next().copied()
        } else if kinds.iter().all(DataType::is_numeric) {
            Some(
                DataType::WIDENING_ORDER
                    .iter()
                    .copied()
                    .find(|t| kinds.contains(t))
                    .unwrap_or(DataType::Integer),
            )
        } else {
            let mut found: Vec<String> = kinds.iter().map(|t| t.name().to_string()).collect();
            found.sort();
            return Err(ConversionError::MixedTypes { found });
        };
        Ok((data_type, nullable))
    }

    /// Build one tensor per entry of a JSON object.
    pub fn build_collection(&self, input: &Map<String, JsonValue>) -> Result<TensorCollection> {
        let mut collection = TensorCollection::new();
        for (name, value) in input {
            let tensor = self
                .build(value)
                .with_context(|| format!("tensor {}", name))?;
            collection.insert(name.clone(), tensor);
        }
        Ok(collection)
    }

    fn materialize(input: &JsonValue) -> Result<Tensor> {
        let shape = Self::infer_shape(input);
        let (data_type, nullable) = Self::infer_type(input)?;

        if shape.is_empty() {
            let leaf = leaf(input, 0)?;
            return Ok(Tensor::scalar(leaf));
        }

        let data_type = data_type.ok_or_else(|| {
            ConversionError::Decode("unable to find the type of the tensor: no type found".to_string())
        })?;

        let mut leaves = Vec::with_capacity(shape.iter().product());
        flatten(input, 0, &shape, &mut leaves)?;

        let dims: Vec<i64> = shape.iter().map(|d| *d as i64).collect();
        let mut tensor = if nullable {
            Tensor::new_nullable(data_type, dims)?
        } else {
            Tensor::new(data_type, dims)?
        };
        for (i, value) in leaves.iter().enumerate() {
            tensor.set_flat(i, value)?;
        }
        Ok(tensor)
    }
}

impl<'a> Builder<&'a JsonValue> for StructuralTensorBuilder {
    type Output = Tensor;

    fn build(&self, input: &'a JsonValue) -> Result<Tensor> {
        Self::materialize(input).context("impossible to convert object into tensor")
    }
}

fn leaf(value: &JsonValue, depth: usize) -> Result<Element> {
    Element::from_json(value).ok_or_else(|| {
        ConversionError::Decode(format!(
            "expected a scalar value at depth {} but found {}",
            depth,
            json_kind(value)
        ))
    })
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "list",
        JsonValue::Object(_) => "object",
    }
}

fn collect_kinds(value: &JsonValue, kinds: &mut BTreeSet<DataType>, nullable: &mut bool) -> Result<()> {
    match value {
        JsonValue::Array(items) => {
            for item in items {
                collect_kinds(item, kinds, nullable)?;
            }
        }
        other => match leaf(other, 0)?.data_type() {
            Some(kind) => {
                kinds.insert(kind);
            }
            None => *nullable = true,
        },
    }
    Ok(())
}

fn flatten(value: &JsonValue, depth: usize, shape: &[usize], out: &mut Vec<Element>) -> Result<()> {
    let items = match value {
        JsonValue::Array(items) => items,
        other => {
            return Err(ConversionError::Decode(format!(
                "all tensor layers should be of type list, found {} at depth {}",
                json_kind(other),
                depth
            )))
        }
    };

    if items.len() != shape[depth] {
        return Err(ConversionError::DimensionMismatch {
            dimension: depth,
            expected: shape[depth] as i64,
            found: items.len(),
        });
    }

    for item in items {
        if depth + 1 == shape.len() {
            out.push(leaf(item, depth + 1)?);
        } else {
            flatten(item, depth + 1, shape, out)?;
        }
    }
    Ok(())
}
