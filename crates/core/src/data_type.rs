//! Element kinds and conversion rules.
//!
//! Numeric kinds (`integer`, `long`, `float`, `double`) are mutually
//! convertible, narrowing included. `string`, `boolean` and `date` only
//! convert from themselves.

use crate::element::Element;
use crate::error::{ConversionError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scalar element kind of a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum DataType {
    /// UTF-8 string
    String,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Boolean
    Boolean,
    /// Naive date-time
    Date,
}

impl DataType {
    /// All kinds, in declaration order
    pub const ALL: [DataType; 7] = [
        DataType::String,
        DataType::Integer,
        DataType::Long,
        DataType::Float,
        DataType::Double,
        DataType::Boolean,
        DataType::Date,
    ];

    /// Widening preference used when unifying numeric leaves
    pub const WIDENING_ORDER: [DataType; 3] = [DataType::Double, DataType::Float, DataType::Long];

    /// Lowercase wire name
    pub fn name(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "string" => Some(DataType::String),
            "integer" | "int" => Some(DataType::Integer),
            "long" => Some(DataType::Long),
            "float" => Some(DataType::Float),
            "double" => Some(DataType::Double),
            "boolean" | "bool" => Some(DataType::Boolean),
            "date" => Some(DataType::Date),
            _ => None,
        }
    }

    /// Check if this is one of the numeric kinds
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Integer | DataType::Long | DataType::Float | DataType::Double
        )
    }

    /// Convert `value` into this kind.
    ///
    /// Null converts to null. Numeric values narrow with `as` casts: integers
    /// keep their low bits, floats truncate toward zero and saturate.
    pub fn convert(&self, value: &Element) -> Result<Element> {
        let source = match value.data_type() {
            None => return Ok(Element::Null),
            Some(kind) => kind,
        };

        if source == *self {
            return Ok(value.clone());
        }

        if !(source.is_numeric() && self.is_numeric()) {
            return Err(ConversionError::Type(format!(
                "unable to convert a {} value into {}",
                source, self
            )));
        }

        let converted = match (self, value) {
            (DataType::Integer, Element::Long(v)) => Element::Integer(*v as i32),
            (DataType::Integer, Element::Float(v)) => Element::Integer(*v as i32),
            (DataType::Integer, Element::Double(v)) => Element::Integer(*v as i32),
            (DataType::Long, Element::Integer(v)) => Element::Long(i64::from(*v)),
            (DataType::Long, Element::Float(v)) => Element::Long(*v as i64),
            (DataType::Long, Element::Double(v)) => Element::Long(*v as i64),
            (DataType::Float, Element::Integer(v)) => Element::Float(*v as f32),
            (DataType::Float, Element::Long(v)) => Element::Float(*v as f32),
            (DataType::Float, Element::Double(v)) => Element::Float(*v as f32),
            (DataType::Double, Element::Integer(v)) => Element::Double(f64::from(*v)),
            (DataType::Double, Element::Long(v)) => Element::Double(*v as f64),
            (DataType::Double, Element::Float(v)) => Element::Double(f64::from(*v)),
            _ => {
                return Err(ConversionError::Type(format!(
                    "unable to convert a {} value into {}",
                    source, self
                )))
            }
        };
        Ok(converted)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self> {
        DataType::parse(s).ok_or_else(|| ConversionError::Type(format!("unknown data type '{}'", s)))
    }
}

impl TryFrom<String> for DataType {
    type Error = ConversionError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<DataType> for &'static str {
    fn from(t: DataType) -> Self {
        t.name()
    }
}
