//! Flat, typed, row-major element storage.

use crate::data_type::DataType;
use crate::element::Element;
use crate::error::{ConversionError, Result};
use chrono::NaiveDateTime;

/// Typed contiguous storage backing a [`Tensor`](crate::Tensor).
#[derive(Debug, Clone, PartialEq)]
pub enum Buffer {
    /// `string` elements
    String(Vec<String>),
    /// `integer` elements
    Integer(Vec<i32>),
    /// `long` elements
    Long(Vec<i64>),
    /// `float` elements
    Float(Vec<f32>),
    /// `double` elements
    Double(Vec<f64>),
    /// `boolean` elements
    Boolean(Vec<bool>),
    /// `date` elements
    Date(Vec<NaiveDateTime>),
}

macro_rules! each_variant {
    ($buffer:expr, $v:ident => $body:expr) => {
        match $buffer {
            Buffer::String($v) => $body,
            Buffer::Integer($v) => $body,
            Buffer::Long($v) => $body,
            Buffer::Float($v) => $body,
            Buffer::Double($v) => $body,
            Buffer::Boolean($v) => $body,
            Buffer::Date($v) => $body,
        }
    };
}

macro_rules! map_variant {
    ($buffer:expr, $v:ident => $body:expr) => {
        match $buffer {
            Buffer::String($v) => Buffer::String($body),
            Buffer::Integer($v) => Buffer::Integer($body),
            Buffer::Long($v) => Buffer::Long($body),
            Buffer::Float($v) => Buffer::Float($body),
            Buffer::Double($v) => Buffer::Double($body),
            Buffer::Boolean($v) => Buffer::Boolean($body),
            Buffer::Date($v) => Buffer::Date($body),
        }
    };
}

impl Buffer {
    /// Allocate `len` default elements of `data_type`.
    pub fn with_len(data_type: DataType, len: usize) -> Self {
        match data_type {
            DataType::String => Buffer::String(vec![String::new(); len]),
            DataType::Integer => Buffer::Integer(vec![0; len]),
            DataType::Long => Buffer::Long(vec![0; len]),
            DataType::Float => Buffer::Float(vec![0.0; len]),
            DataType::Double => Buffer::Double(vec![0.0; len]),
            DataType::Boolean => Buffer::Boolean(vec![false; len]),
            DataType::Date => Buffer::Date(vec![NaiveDateTime::default(); len]),
        }
    }

    /// Element kind stored
    pub fn data_type(&self) -> DataType {
        match self {
            Buffer::String(_) => DataType::String,
            Buffer::Integer(_) => DataType::Integer,
            Buffer::Long(_) => DataType::Long,
            Buffer::Float(_) => DataType::Float,
            Buffer::Double(_) => DataType::Double,
            Buffer::Boolean(_) => DataType::Boolean,
            Buffer::Date(_) => DataType::Date,
        }
    }

    /// Number of stored elements
    pub fn len(&self) -> usize {
        each_variant!(self, v => v.len())
    }

    /// Check if no element is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read element `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds; callers index through a validated shape.
    pub fn get(&self, i: usize) -> Element {
        match self {
            Buffer::String(v) => Element::String(v[i].clone()),
            Buffer::Integer(v) => Element::Integer(v[i]),
            Buffer::Long(v) => Element::Long(v[i]),
            Buffer::Float(v) => Element::Float(v[i]),
            Buffer::Double(v) => Element::Double(v[i]),
            Buffer::Boolean(v) => Element::Boolean(v[i]),
            Buffer::Date(v) => Element::Date(v[i]),
        }
    }

    /// Write element `i`, converting `value` to the stored kind.
    ///
    /// Writing `Null` is rejected; nullability lives in the tensor's mask.
    pub fn set(&mut self, i: usize, value: &Element) -> Result<()> {
        let converted = self.data_type().convert(value)?;
        match (self, converted) {
            (Buffer::String(v), Element::String(x)) => v[i] = x,
            (Buffer::Integer(v), Element::Integer(x)) => v[i] = x,
            (Buffer::Long(v), Element::Long(x)) => v[i] = x,
            (Buffer::Float(v), Element::Float(x)) => v[i] = x,
            (Buffer::Double(v), Element::Double(x)) => v[i] = x,
            (Buffer::Boolean(v), Element::Boolean(x)) => v[i] = x,
            (Buffer::Date(v), Element::Date(x)) => v[i] = x,
            (buffer, _) => {
                return Err(ConversionError::Type(format!(
                    "null is not a valid {} element",
                    buffer.data_type()
                )))
            }
        }
        Ok(())
    }

    /// Copy the elements at `indices`, in that order.
    pub fn gather(&self, indices: &[usize]) -> Buffer {
        map_variant!(self, v => indices.iter().map(|&i| v[i].clone()).collect())
    }

    /// Append every element of `other`, which must hold the same kind.
    pub fn extend_from(&mut self, other: &Buffer) -> Result<()> {
        match (self, other) {
            (Buffer::String(a), Buffer::String(b)) => a.extend_from_slice(b),
            (Buffer::Integer(a), Buffer::Integer(b)) => a.extend_from_slice(b),
            (Buffer::Long(a), Buffer::Long(b)) => a.extend_from_slice(b),
            (Buffer::Float(a), Buffer::Float(b)) => a.extend_from_slice(b),
            (Buffer::Double(a), Buffer::Double(b)) => a.extend_from_slice(b),
            (Buffer::Boolean(a), Buffer::Boolean(b)) => a.extend_from_slice(b),
            (Buffer::Date(a), Buffer::Date(b)) => a.extend_from_slice(b),
            (a, b) => {
                return Err(ConversionError::Type(format!(
                    "unable to append {} elements to a {} buffer",
                    b.data_type(),
                    a.data_type()
                )))
            }
        }
        Ok(())
    }

    /// Convert every element into `target`.
    pub fn convert(&self, target: DataType) -> Result<Buffer> {
        if target == self.data_type() {
            return Ok(self.clone());
        }
        let mut out = Buffer::with_len(target, self.len());
        for i in 0..self.len() {
            out.set(i, &self.get(i))?;
        }
        Ok(out)
    }
}

impl From<Vec<String>> for Buffer {
    fn from(v: Vec<String>) -> Self {
        Buffer::String(v)
    }
}

impl From<Vec<&str>> for Buffer {
    fn from(v: Vec<&str>) -> Self {
        Buffer::String(v.into_iter().map(String::from).collect())
    }
}

impl From<Vec<i32>> for Buffer {
    fn from(v: Vec<i32>) -> Self {
        Buffer::Integer(v)
    }
}

impl From<Vec<i64>> for Buffer {
    fn from(v: Vec<i64>) -> Self {
        Buffer::Long(v)
    }
}

impl From<Vec<f32>> for Buffer {
    fn from(v: Vec<f32>) -> Self {
        Buffer::Float(v)
    }
}

impl From<Vec<f64>> for Buffer {
    fn from(v: Vec<f64>) -> Self {
        Buffer::Double(v)
    }
}

impl From<Vec<bool>> for Buffer {
    fn from(v: Vec<bool>) -> Self {
        Buffer::Boolean(v)
    }
}

impl From<Vec<NaiveDateTime>> for Buffer {
    fn from(v: Vec<NaiveDateTime>) -> Self {
        Buffer::Date(v)
    }
}
