//! Lazy row-major coordinate enumeration.
//!
//! Plain mode walks every coordinate of a shape with the last axis varying
//! fastest. Rolling mode on axis `a` with window `w` walks the shape
//! `[.., dim[a] - w + 1, w, ..]` and maps each (start, offset) pair back to
//! position `start + offset` on axis `a`, so consecutive windows overlap.

use crate::error::{ConversionError, Result};
use std::iter::FusedIterator;

/// Iterator over tensor coordinates
#[derive(Debug, Clone)]
pub struct CoordinateIterator {
    extents: Vec<usize>,
    rolling_axis: Option<usize>,
    next: Option<Vec<usize>>,
}

impl CoordinateIterator {
    /// Plain row-major iteration over `dims`.
    ///
    /// A scalar shape yields one empty coordinate, a shape with a zero
    /// extent yields nothing.
    pub fn new(dims: &[usize]) -> Self {
        Self::over(dims.to_vec(), None)
    }

    /// Overlapping-window iteration along `axis`.
    pub fn rolling(dims: &[usize], axis: usize, window: usize) -> Result<Self> {
        let extent = *dims.get(axis).ok_or_else(|| {
            ConversionError::Shape(format!(
                "unable to roll over axis {} of a rank {} shape",
                axis,
                dims.len()
            ))
        })?;
        if window == 0 || window > extent {
            return Err(ConversionError::Shape(format!(
                "rolling window of size {} does not fit axis {} of extent {}",
                window, axis, extent
            )));
        }

        let mut extents = Vec::with_capacity(dims.len() + 1);
        extents.extend_from_slice(&dims[..axis]);
        extents.push(extent - window + 1);
        extents.push(window);
        extents.extend_from_slice(&dims[axis + 1..]);
        Ok(Self::over(extents, Some(axis)))
    }

    fn over(extents: Vec<usize>, rolling_axis: Option<usize>) -> Self {
        let next = if extents.iter().any(|d| *d == 0) {
            None
        } else {
            Some(vec![0; extents.len()])
        };
        Self {
            extents,
            rolling_axis,
            next,
        }
    }

    /// Number of coordinates a fresh iterator yields
    pub fn total(&self) -> usize {
        self.extents.iter().product()
    }

    fn advance(&self, current: &[usize]) -> Option<Vec<usize>> {
        let mut succ = current.to_vec();
        for axis in (0..succ.len()).rev() {
            succ[axis] += 1;
            if succ[axis] < self.extents[axis] {
                return Some(succ);
            }
            succ[axis] = 0;
        }
        None
    }

    fn project(&self, coord: Vec<usize>) -> Vec<usize> {
        match self.rolling_axis {
            None => coord,
            Some(axis) => {
                let mut out = Vec::with_capacity(coord.len() - 1);
                out.extend_from_slice(&coord[..axis]);
                out.push(coord[axis] + coord[axis + 1]);
                out.extend_from_slice(&coord[axis + 2..]);
                out
            }
        }
    }
}

impl Iterator for CoordinateIterator {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        self.next = self.advance(&current);
        Some(self.project(current))
    }
}

impl FusedIterator for CoordinateIterator {}
