//! Shape algebra.
//!
//! A [`TensorShape`] is an ordered list of signed extents. Negative entries
//! are wildcards and only appear in schema shapes or reshape targets; a
//! materialized tensor always has a concrete shape.

use crate::error::{ConversionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered tensor extents, negative entries meaning "unknown"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TensorShape(Vec<i64>);

impl TensorShape {
    /// Create a shape from its extents
    pub fn new(dims: Vec<i64>) -> Self {
        TensorShape(dims)
    }

    /// The rank-0 shape
    pub fn scalar() -> Self {
        TensorShape(Vec::new())
    }

    /// Extents
    pub fn dims(&self) -> &[i64] {
        &self.0
    }

    /// Number of axes
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Product of all extents, 1 for a scalar
    pub fn element_count(&self) -> Result<i64> {
        checked_product(&self.0)
            .ok_or_else(|| ConversionError::Shape(format!("element count of shape {} overflows", self)))
    }

    /// Rank 0
    pub fn is_scalar(&self) -> bool {
        self.rank() == 0
    }

    /// Rank 1
    pub fn is_vector(&self) -> bool {
        self.rank() == 1
    }

    /// Rank 2
    pub fn is_matrix(&self) -> bool {
        self.rank() == 2
    }

    /// Number of wildcard entries
    pub fn unknown_dimensions(&self) -> usize {
        self.0.iter().filter(|d| **d < 0).count()
    }

    /// Check that no entry is a wildcard
    pub fn is_concrete(&self) -> bool {
        self.unknown_dimensions() == 0
    }

    /// Check if the first axis is a wildcard batch axis
    pub fn handles_batch(&self) -> bool {
        self.0.first().map_or(false, |d| *d < 0)
    }

    /// Substitute the batch axis with `batch` and, if given, every other
    /// wildcard with `replace_missing`.
    pub fn with_batch(&self, batch: i64, replace_missing: Option<i64>) -> TensorShape {
        let mut dims = self.0.clone();
        if self.handles_batch() {
            dims[0] = batch;
        }
        if let Some(fill) = replace_missing {
            for d in dims.iter_mut().filter(|d| **d < 0) {
                *d = fill;
            }
        }
        TensorShape(dims)
    }

    /// Concrete extents as `usize`, failing on any wildcard
    pub fn to_usize(&self) -> Result<Vec<usize>> {
        self.0
            .iter()
            .map(|d| {
                usize::try_from(*d).map_err(|_| {
                    ConversionError::Shape(format!(
                        "shape {} has unknown dimensions",
                        self
                    ))
                })
            })
            .collect()
    }

    /// Same element count as `other`
    pub fn is_compatible_with(&self, other: &TensorShape) -> bool {
        matches!(
            (self.element_count(), other.element_count()),
            (Ok(a), Ok(b)) if a == b
        )
    }

    /// Drop every extent equal to 1
    pub fn squeeze(&self) -> TensorShape {
        TensorShape(self.0.iter().copied().filter(|d| *d != 1).collect())
    }

    /// Resolve the wildcards of `desired` against this shape.
    ///
    /// A single wildcard takes whatever extent keeps the element count. With
    /// several wildcards each one copies this shape's extent at the same
    /// position (1 past the current rank) and every concrete entry must equal
    /// this shape's extent exactly.
    pub fn resolve_wildcards(&self, desired: &TensorShape) -> Result<TensorShape> {
        let unresolvable = || {
            ConversionError::Shape(format!("unable to resolve shape {} into {}", self, desired))
        };

        let resolved = match desired.unknown_dimensions() {
            0 => desired.clone(),
            1 => {
                let known: Vec<i64> = desired.0.iter().copied().filter(|d| *d > 0).collect();
                let known = checked_product(&known).ok_or_else(unresolvable)?;
                let fill = self.element_count()? / known;
                TensorShape(
                    desired
                        .0
                        .iter()
                        .map(|d| if *d < 0 { fill } else { *d })
                        .collect(),
                )
            }
            _ => {
                let mut dims = Vec::with_capacity(desired.rank());
                for (i, wanted) in desired.0.iter().enumerate() {
                    let current = self.0.get(i).copied().unwrap_or(1);
                    if *wanted >= 0 && *wanted != current {
                        return Err(unresolvable());
                    }
                    dims.push(current);
                }
                TensorShape(dims)
            }
        };

        if !self.is_compatible_with(&resolved) {
            return Err(unresolvable());
        }
        Ok(resolved)
    }
}

fn checked_product(dims: &[i64]) -> Option<i64> {
    dims.iter().try_fold(1i64, |acc, d| acc.checked_mul(*d))
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.0.iter().map(|d| d.to_string()).collect();
        write!(f, "[{}]", dims.join(", "))
    }
}

impl From<Vec<i64>> for TensorShape {
    fn from(dims: Vec<i64>) -> Self {
        TensorShape(dims)
    }
}

impl From<&[i64]> for TensorShape {
    fn from(dims: &[i64]) -> Self {
        TensorShape(dims.to_vec())
    }
}

impl<const N: usize> From<[i64; N]> for TensorShape {
    fn from(dims: [i64; N]) -> Self {
        TensorShape(dims.to_vec())
    }
}

impl From<&[usize]> for TensorShape {
    fn from(dims: &[usize]) -> Self {
        TensorShape(dims.iter().map(|d| *d as i64).collect())
    }
}
