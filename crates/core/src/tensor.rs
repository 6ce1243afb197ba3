//! Typed, shaped, nullable-aware N-dimensional arrays.
//!
//! A [`Tensor`] stores its elements in a flat row-major [`Buffer`]. A rank-0
//! tensor is a scalar over a one-element buffer. Nullable tensors carry a
//! validity mask with one flag per element; non-nullable tensors refuse
//! nulls.
//!
//! Every transformation (`reshape`, `slice`, `concat`, `roll`, `map`)
//! returns a new tensor. In-place writes (`set`, `set_on_coord`) are meant
//! for filling a freshly allocated tensor.

use crate::buffer::Buffer;
use crate::data_type::DataType;
use crate::element::Element;
use crate::error::{ConversionError, Result};
use crate::iter::CoordinateIterator;
use crate::shape::TensorShape;
use serde_json::Value as JsonValue;

/// Result of [`Tensor::get_coord`]: one element, or a whole axis when the
/// coordinates contain a `-1`.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordValue {
    /// Single element
    Scalar(Element),
    /// Every element along the wildcard axis
    Axis(Vec<Element>),
}

/// Typed N-dimensional array
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: TensorShape,
    dims: Vec<usize>,
    buffer: Buffer,
    validity: Option<Vec<bool>>,
}

fn element_count(dims: &[usize]) -> usize {
    dims.iter().product()
}

fn strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; dims.len()];
    for axis in (0..dims.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * dims[axis + 1];
    }
    strides
}

impl Tensor {
    // === Construction ===

    /// Allocate a non-nullable tensor filled with default values.
    pub fn new(data_type: DataType, shape: impl Into<TensorShape>) -> Result<Self> {
        let shape = shape.into();
        let dims = concrete_dims(&shape)?;
        let buffer = Buffer::with_len(data_type, element_count(&dims));
        Ok(Self {
            shape,
            dims,
            buffer,
            validity: None,
        })
    }

    /// Allocate a nullable tensor whose elements are all null.
    pub fn new_nullable(data_type: DataType, shape: impl Into<TensorShape>) -> Result<Self> {
        let mut tensor = Self::new(data_type, shape)?;
        tensor.validity = Some(vec![false; tensor.buffer.len()]);
        Ok(tensor)
    }

    /// Same as [`Tensor::new`].
    pub fn zeros(data_type: DataType, shape: impl Into<TensorShape>) -> Result<Self> {
        Self::new(data_type, shape)
    }

    /// Tensor over row-major `values`.
    pub fn from_vec<T>(shape: impl Into<TensorShape>, values: Vec<T>) -> Result<Self>
    where
        Vec<T>: Into<Buffer>,
    {
        Self::from_parts(shape, values, None)
    }

    /// Wrap an existing row-major buffer.
    pub fn from_buffer(shape: impl Into<TensorShape>, buffer: impl Into<Buffer>) -> Result<Self> {
        Self::from_parts(shape, buffer, None)
    }

    /// Wrap a buffer and an optional validity mask.
    pub fn from_parts(
        shape: impl Into<TensorShape>,
        buffer: impl Into<Buffer>,
        validity: Option<Vec<bool>>,
    ) -> Result<Self> {
        let shape = shape.into();
        let buffer = buffer.into();
        let dims = concrete_dims(&shape)?;
        let expected = element_count(&dims);
        if buffer.len() != expected {
            return Err(ConversionError::Shape(format!(
                "shape {} needs {} elements but {} were given",
                shape,
                expected,
                buffer.len()
            )));
        }
        if let Some(mask) = &validity {
            if mask.len() != expected {
                return Err(ConversionError::Shape(format!(
                    "validity mask has {} flags for {} elements",
                    mask.len(),
                    expected
                )));
            }
        }
        Ok(Self {
            shape,
            dims,
            buffer,
            validity,
        })
    }

    /// Rank-0 tensor holding `value`.
    ///
    /// A null value gives a nullable `string` scalar with no value.
    pub fn scalar(value: impl Into<Element>) -> Self {
        let value = value.into();
        let data_type = value.data_type().unwrap_or(DataType::String);
        let mut buffer = Buffer::with_len(data_type, 1);
        let validity = if value.is_null() {
            Some(vec![false])
        } else {
            // The buffer kind matches the value kind, so this cannot fail.
            let _ = buffer.set(0, &value);
            None
        };
        Self {
            shape: TensorShape::scalar(),
            dims: Vec::new(),
            buffer,
            validity,
        }
    }

    /// Rank-1 tensor over `buffer`.
    pub fn vector(buffer: impl Into<Buffer>) -> Self {
        let buffer = buffer.into();
        let len = buffer.len();
        Self {
            shape: TensorShape::from(vec![len as i64]),
            dims: vec![len],
            buffer,
            validity: None,
        }
    }

    /// Same tensor, marked nullable with every element present.
    pub fn into_nullable(mut self) -> Self {
        if self.validity.is_none() {
            self.validity = Some(vec![true; self.buffer.len()]);
        }
        self
    }

    // === Accessors ===

    /// Element kind
    pub fn data_type(&self) -> DataType {
        self.buffer.data_type()
    }

    /// Shape
    pub fn shape(&self) -> &TensorShape {
        &self.shape
    }

    /// Extents as `usize`
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of axes
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the tensor holds no element
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Check if missing values are permitted
    pub fn is_nullable(&self) -> bool {
        self.validity.is_some()
    }

    /// Backing storage
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Validity mask of a nullable tensor
    pub fn validity(&self) -> Option<&[bool]> {
        self.validity.as_deref()
    }

    /// Extent of the first axis, 1 for a scalar
    pub fn batch_len(&self) -> usize {
        self.dims.first().copied().unwrap_or(1)
    }

    /// Element at flat row-major position `index`, `Null` if absent.
    pub fn element(&self, index: usize) -> Element {
        match &self.validity {
            Some(mask) if !mask[index] => Element::Null,
            _ => self.buffer.get(index),
        }
    }

    /// Every element in row-major order
    pub fn elements(&self) -> Vec<Element> {
        (0..self.len()).map(|i| self.element(i)).collect()
    }

    /// Flat position of `coords`.
    pub fn offset(&self, coords: &[usize]) -> Result<usize> {
        if coords.len() != self.rank() {
            return Err(ConversionError::Shape(format!(
                "expected {} coordinates for shape {} but got {}",
                self.rank(),
                self.shape,
                coords.len()
            )));
        }
        let mut offset = 0;
        for (axis, (&c, &d)) in coords.iter().zip(&self.dims).enumerate() {
            if c >= d {
                return Err(ConversionError::Shape(format!(
                    "index {} out of range for axis {} of shape {}",
                    c, axis, self.shape
                )));
            }
            offset = offset * d + c;
        }
        Ok(offset)
    }

    /// Element at `coords`
    pub fn get(&self, coords: &[usize]) -> Result<Element> {
        Ok(self.element(self.offset(coords)?))
    }

    /// Write `value` at flat position `index`.
    pub fn set_flat(&mut self, index: usize, value: &Element) -> Result<()> {
        if index >= self.len() {
            return Err(ConversionError::Shape(format!(
                "flat index {} out of range for {} elements",
                index,
                self.len()
            )));
        }
        if value.is_null() {
            return match &mut self.validity {
                Some(mask) => {
                    mask[index] = false;
                    Ok(())
                }
                None => Err(ConversionError::Type(
                    "unable to store null in a non-nullable tensor".to_string(),
                )),
            };
        }
        self.buffer.set(index, value)?;
        if let Some(mask) = &mut self.validity {
            mask[index] = true;
        }
        Ok(())
    }

    /// Write `value` at `coords`.
    pub fn set(&mut self, coords: &[usize], value: &Element) -> Result<()> {
        let index = self.offset(coords)?;
        self.set_flat(index, value)
    }

    /// Flat positions addressed by coordinates that may contain one `-1`.
    fn addressed(&self, coords: &[i64]) -> Result<(Vec<usize>, bool)> {
        if coords.len() != self.rank() {
            return Err(ConversionError::Shape(format!(
                "expected {} coordinates for shape {} but got {}",
                self.rank(),
                self.shape,
                coords.len()
            )));
        }
        let wildcards: Vec<usize> = coords
            .iter()
            .enumerate()
            .filter(|(_, c)| **c < 0)
            .map(|(axis, _)| axis)
            .collect();
        if wildcards.len() > 1 {
            return Err(ConversionError::Shape(format!(
                "at most one -1 coordinate is allowed, got {:?}",
                coords
            )));
        }

        let mut base: Vec<usize> = coords.iter().map(|c| (*c).max(0) as usize).collect();
        match wildcards.first() {
            None => Ok((vec![self.offset(&base)?], false)),
            Some(&axis) => {
                let mut positions = Vec::with_capacity(self.dims[axis]);
                for i in 0..self.dims[axis] {
                    base[axis] = i;
                    positions.push(self.offset(&base)?);
                }
                Ok((positions, true))
            }
        }
    }

    /// Read one element, or a whole axis when one coordinate is `-1`.
    pub fn get_coord(&self, coords: &[i64]) -> Result<CoordValue> {
        let (positions, whole_axis) = self.addressed(coords)?;
        if whole_axis {
            Ok(CoordValue::Axis(
                positions.into_iter().map(|i| self.element(i)).collect(),
            ))
        } else {
            Ok(CoordValue::Scalar(self.element(positions[0])))
        }
    }

    /// Write one element, or a whole axis when one coordinate is `-1`.
    ///
    /// An axis value must have exactly as many elements as the wildcard
    /// axis extent.
    pub fn set_on_coord(&mut self, value: CoordValue, coords: &[i64]) -> Result<()> {
        let (positions, whole_axis) = self.addressed(coords)?;
        match (value, whole_axis) {
            (CoordValue::Scalar(v), false) => self.set_flat(positions[0], &v),
            (CoordValue::Axis(values), true) => {
                if values.len() != positions.len() {
                    return Err(ConversionError::Shape(format!(
                        "expected {} values along the -1 axis but got {}",
                        positions.len(),
                        values.len()
                    )));
                }
                for (i, v) in positions.into_iter().zip(values.iter()) {
                    self.set_flat(i, v)?;
                }
                Ok(())
            }
            (CoordValue::Scalar(_), true) => Err(ConversionError::Shape(
                "a single value cannot be written along a -1 axis".to_string(),
            )),
            (CoordValue::Axis(_), false) => Err(ConversionError::Shape(
                "writing several values needs exactly one -1 coordinate".to_string(),
            )),
        }
    }

    // === Shape transformations ===

    /// Reshape to `shape`, resolving wildcards.
    pub fn reshape(self, shape: impl Into<TensorShape>) -> Result<Self> {
        let data_type = self.data_type();
        self.reshape_with_type(shape, data_type)
    }

    /// Reshape to `shape` and convert elements to `data_type`.
    ///
    /// Row-major element order is preserved. Returns `self` untouched when
    /// neither shape nor type change.
    pub fn reshape_with_type(
        self,
        shape: impl Into<TensorShape>,
        data_type: DataType,
    ) -> Result<Self> {
        let resolved = self.shape.resolve_wildcards(&shape.into())?;
        if resolved == self.shape && data_type == self.data_type() {
            return Ok(self);
        }

        let buffer = if data_type == self.data_type() {
            self.buffer
        } else {
            convert_buffer(&self.buffer, self.validity.as_deref(), data_type)?
        };
        Self::from_parts(resolved, buffer, self.validity)
    }

    /// Remove every axis of extent 1
    pub fn squeeze(self) -> Result<Self> {
        let squeezed = self.shape.squeeze();
        self.reshape(squeezed)
    }

    /// Flatten to rank 1
    pub fn to_vector(self) -> Result<Self> {
        self.reshape(TensorShape::from([-1]))
    }

    fn gather(&self, positions: &[usize], shape: TensorShape) -> Result<Self> {
        let validity = self
            .validity
            .as_ref()
            .map(|mask| positions.iter().map(|&i| mask[i]).collect());
        Self::from_parts(shape, self.buffer.gather(positions), validity)
    }

    /// Copy the block starting at `begin` with extents `size`.
    pub fn slice(&self, begin: &[usize], size: &[usize]) -> Result<Self> {
        if begin.len() != self.rank() || size.len() != self.rank() {
            return Err(ConversionError::Shape(format!(
                "slice of a rank {} tensor needs {} begin and size entries",
                self.rank(),
                self.rank()
            )));
        }
        for axis in 0..self.rank() {
            if begin[axis] >= self.dims[axis] {
                return Err(ConversionError::Shape(format!(
                    "slice begins at {} on axis {} of extent {}",
                    begin[axis], axis, self.dims[axis]
                )));
            }
            if begin[axis] + size[axis] > self.dims[axis] {
                return Err(ConversionError::Shape(format!(
                    "slice of size {} from {} overflows axis {} of extent {}",
                    size[axis], begin[axis], axis, self.dims[axis]
                )));
            }
        }

        let mut positions = Vec::with_capacity(element_count(size));
        for coord in CoordinateIterator::new(size) {
            let source: Vec<usize> = coord.iter().zip(begin).map(|(c, b)| c + b).collect();
            positions.push(self.offset(&source)?);
        }
        self.gather(&positions, TensorShape::from(size))
    }

    /// Join with `other` along `axis`. Scalars are promoted to rank 1 first.
    pub fn concat(&self, other: &Tensor, axis: usize) -> Result<Self> {
        if self.data_type() != other.data_type() {
            return Err(ConversionError::Type(format!(
                "unable to concatenate {} and {} tensors",
                self.data_type(),
                other.data_type()
            )));
        }
        let left_dims = if self.rank() == 0 { vec![1] } else { self.dims.clone() };
        let right_dims = if other.rank() == 0 { vec![1] } else { other.dims.clone() };

        if axis >= left_dims.len() {
            return Err(ConversionError::Shape(format!(
                "unable to concatenate along axis {} of a rank {} tensor",
                axis,
                left_dims.len()
            )));
        }
        let same_outer = left_dims.len() == right_dims.len()
            && left_dims
                .iter()
                .zip(&right_dims)
                .enumerate()
                .all(|(i, (l, r))| i == axis || l == r);
        if !same_outer {
            return Err(ConversionError::Shape(format!(
                "unable to concatenate shapes {} and {} along axis {}",
                self.shape, other.shape, axis
            )));
        }

        let outer: usize = left_dims[..axis].iter().product();
        let inner: usize = left_dims[axis + 1..].iter().product();
        let left_block = left_dims[axis] * inner;
        let right_block = right_dims[axis] * inner;

        let mut combined = self.buffer.clone();
        combined.extend_from(&other.buffer)?;
        let left_len = self.len();

        let mut positions = Vec::with_capacity(self.len() + other.len());
        for o in 0..outer {
            positions.extend(o * left_block..(o + 1) * left_block);
            positions.extend((o * right_block..(o + 1) * right_block).map(|i| i + left_len));
        }

        let validity = if self.is_nullable() || other.is_nullable() {
            let left = self.validity.clone().unwrap_or_else(|| vec![true; self.len()]);
            let right = other.validity.clone().unwrap_or_else(|| vec![true; other.len()]);
            let joined: Vec<bool> = left.into_iter().chain(right).collect();
            Some(positions.iter().map(|&i| joined[i]).collect())
        } else {
            None
        };

        let mut dims = left_dims;
        dims[axis] += right_dims[axis];
        Self::from_parts(TensorShape::from(dims.as_slice()), combined.gather(&positions), validity)
    }

    /// Materialize overlapping windows of size `window` along `axis`.
    ///
    /// The result inserts a `window` axis after `axis`, whose extent becomes
    /// `dim[axis] - window + 1`.
    pub fn roll(&self, axis: usize, window: usize) -> Result<Self> {
        let source = CoordinateIterator::rolling(&self.dims, axis, window)?;
        let mut positions = Vec::with_capacity(source.total());
        for coord in source {
            positions.push(self.offset(&coord)?);
        }

        let mut dims = Vec::with_capacity(self.rank() + 1);
        dims.extend_from_slice(&self.dims[..axis]);
        dims.push(self.dims[axis] - window + 1);
        dims.push(window);
        dims.extend_from_slice(&self.dims[axis + 1..]);
        self.gather(&positions, TensorShape::from(dims.as_slice()))
    }

    /// Elementwise transform into a tensor of `output_type`.
    ///
    /// `f` sees `Null` for absent elements of a nullable tensor.
    pub fn map<F>(&self, output_type: DataType, mut f: F) -> Result<Self>
    where
        F: FnMut(&Element) -> Result<Element>,
    {
        let mut out = if self.is_nullable() {
            Self::new_nullable(output_type, self.shape.clone())?
        } else {
            Self::new(output_type, self.shape.clone())?
        };
        for i in 0..self.len() {
            let value = f(&self.element(i))?;
            out.set_flat(i, &value)?;
        }
        Ok(out)
    }

    /// Pass if this tensor can be converted into `wanted`.
    ///
    /// Equal kinds pass, and any numeric kind accepts any other numeric kind.
    pub fn check_type_compatible(&self, wanted: DataType) -> Result<()> {
        let current = self.data_type();
        if current == wanted || (current.is_numeric() && wanted.is_numeric()) {
            Ok(())
        } else {
            Err(ConversionError::Type(format!(
                "incompatible types: tensor holds {} but {} is expected",
                current, wanted
            )))
        }
    }

    // === Output ===

    /// Nested JSON arrays of the data, squeezed first when `simplify`.
    pub fn to_json(&self, simplify: bool) -> JsonValue {
        let dims: Vec<usize> = if simplify {
            self.dims.iter().copied().filter(|d| *d != 1).collect()
        } else {
            self.dims.clone()
        };
        let strides = strides(&dims);
        self.nest(&dims, &strides, 0, 0)
    }

    fn nest(&self, dims: &[usize], strides: &[usize], axis: usize, offset: usize) -> JsonValue {
        if axis == dims.len() {
            return self.element(offset).to_json();
        }
        JsonValue::Array(
            (0..dims[axis])
                .map(|i| self.nest(dims, strides, axis + 1, offset + i * strides[axis]))
                .collect(),
        )
    }
}

fn concrete_dims(shape: &TensorShape) -> Result<Vec<usize>> {
    if !shape.is_concrete() {
        return Err(ConversionError::Shape(format!(
            "unable to create a tensor with unknown dimensions {}",
            shape
        )));
    }
    shape.to_usize()
}

fn convert_buffer(buffer: &Buffer, validity: Option<&[bool]>, target: DataType) -> Result<Buffer> {
    match validity {
        None => buffer.convert(target),
        Some(mask) => {
            let mut out = Buffer::with_len(target, buffer.len());
            for (i, present) in mask.iter().enumerate() {
                if *present {
                    out.set(i, &buffer.get(i))?;
                }
            }
            Ok(out)
        }
    }
}
