//! Named tensor collections exchanged as one request or response.

use crate::error::{ConversionError, Result};
use crate::field::TensorField;
use crate::tensor::Tensor;
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};

/// Mapping of tensor name to tensor.
///
/// Iteration is ordered by name so encoded payloads are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TensorCollection {
    tensors: BTreeMap<String, Tensor>,
}

impl TensorCollection {
    /// Empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Collection holding a single tensor
    pub fn single(name: impl Into<String>, tensor: Tensor) -> Self {
        let mut c = Self::new();
        c.insert(name, tensor);
        c
    }

    /// Tensor named `name`
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    /// Check if a tensor named `name` exists
    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    /// Insert or replace a tensor, returning the previous one
    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) -> Option<Tensor> {
        self.tensors.insert(name.into(), tensor)
    }

    /// Remove a tensor
    pub fn remove(&mut self, name: &str) -> Option<Tensor> {
        self.tensors.remove(name)
    }

    /// Number of tensors
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Check if the collection is empty
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Sorted tensor names
    pub fn names(&self) -> Vec<&str> {
        self.tensors.keys().map(String::as_str).collect()
    }

    /// Iterate over `(name, tensor)` pairs ordered by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor)> {
        self.tensors.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Add every tensor of `other`, replacing tensors with the same name.
    pub fn merge(&mut self, other: TensorCollection) {
        self.tensors.extend(other.tensors);
    }

    /// Concatenate tensors pairwise along `axis`.
    ///
    /// Both collections must hold exactly the same names.
    pub fn concat(&self, other: &TensorCollection, axis: usize) -> Result<TensorCollection> {
        let left: BTreeSet<&String> = self.tensors.keys().collect();
        let right: BTreeSet<&String> = other.tensors.keys().collect();
        if left != right {
            return Err(ConversionError::Shape(format!(
                "unable to concatenate collections with different tensors {:?} and {:?}",
                left, right
            )));
        }

        let mut out = TensorCollection::new();
        for (name, tensor) in &self.tensors {
            if let Some(rhs) = other.tensors.get(name) {
                let joined = tensor
                    .concat(rhs, axis)
                    .map_err(|e| e.context(format!("tensor {}", name)))?;
                out.insert(name.clone(), joined);
            }
        }
        Ok(out)
    }

    /// Largest first-axis extent, 1 for scalars, 0 when empty
    pub fn batch_size(&self) -> usize {
        self.tensors.values().map(Tensor::batch_len).max().unwrap_or(0)
    }

    /// Drop every tensor not named by `fields` or their index columns.
    pub fn retain_fields(&mut self, fields: &[TensorField]) {
        let keep: BTreeSet<&str> = fields
            .iter()
            .flat_map(|f| {
                std::iter::once(f.name.as_str()).chain(f.fields.iter().map(|i| i.name.as_str()))
            })
            .collect();
        self.tensors.retain(|name, _| keep.contains(name.as_str()));
    }

    /// Squeeze every tensor
    pub fn to_simplified(&self) -> Result<TensorCollection> {
        let mut out = TensorCollection::new();
        for (name, tensor) in &self.tensors {
            out.insert(name.clone(), tensor.clone().squeeze()?);
        }
        Ok(out)
    }

    /// JSON object of name to nested data, squeezed when `simplify`
    pub fn to_json_map(&self, simplify: bool) -> Map<String, JsonValue> {
        self.tensors
            .iter()
            .map(|(name, tensor)| (name.clone(), tensor.to_json(simplify)))
            .collect()
    }
}

impl FromIterator<(String, Tensor)> for TensorCollection {
    fn from_iter<I: IntoIterator<Item = (String, Tensor)>>(iter: I) -> Self {
        Self {
            tensors: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for TensorCollection {
    type Item = (String, Tensor);
    type IntoIter = std::collections::btree_map::IntoIter<String, Tensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.tensors.into_iter()
    }
}
