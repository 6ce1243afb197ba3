//! Single tensor element values.

use crate::data_type::DataType;
use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;
use std::fmt;

/// One element of a tensor, tagged with its kind.
///
/// `Null` stands for a missing value in a nullable tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Missing value
    Null,
    /// UTF-8 string
    String(String),
    /// 32-bit signed integer
    Integer(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Boolean
    Boolean(bool),
    /// Naive date-time
    Date(NaiveDateTime),
}

impl Element {
    /// Kind of this element, `None` for null
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Element::Null => None,
            Element::String(_) => Some(DataType::String),
            Element::Integer(_) => Some(DataType::Integer),
            Element::Long(_) => Some(DataType::Long),
            Element::Float(_) => Some(DataType::Float),
            Element::Double(_) => Some(DataType::Double),
            Element::Boolean(_) => Some(DataType::Boolean),
            Element::Date(_) => Some(DataType::Date),
        }
    }

    /// Check if this is the null element
    pub fn is_null(&self) -> bool {
        matches!(self, Element::Null)
    }

    /// Numeric value as `i64`, floats truncated
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Element::Integer(v) => Some(i64::from(*v)),
            Element::Long(v) => Some(*v),
            Element::Float(v) => Some(*v as i64),
            Element::Double(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Numeric value as `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Element::Integer(v) => Some(f64::from(*v)),
            Element::Long(v) => Some(*v as f64),
            Element::Float(v) => Some(f64::from(*v)),
            Element::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Classify a JSON leaf.
    ///
    /// Integral numbers fitting 32 bits are `Integer`, other integral numbers
    /// `Long`, everything else numeric `Double`. Arrays and objects are not
    /// leaves and yield `None`.
    pub fn from_json(value: &JsonValue) -> Option<Element> {
        match value {
            JsonValue::Null => Some(Element::Null),
            JsonValue::Bool(b) => Some(Element::Boolean(*b)),
            JsonValue::String(s) => Some(Element::String(s.clone())),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(match i32::try_from(i) {
                        Ok(small) => Element::Integer(small),
                        Err(_) => Element::Long(i),
                    })
                } else if let Some(f) = n.as_f64() {
                    Some(Element::Double(f))
                } else {
                    None
                }
            }
            JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }

    /// JSON representation.
    ///
    /// Non-finite floats become `null`, dates ISO-8601 strings.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Element::Null => JsonValue::Null,
            Element::String(s) => JsonValue::String(s.clone()),
            Element::Integer(v) => JsonValue::from(*v),
            Element::Long(v) => JsonValue::from(*v),
            Element::Float(v) => serde_json::Number::from_f64(f64::from(*v))
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Element::Double(v) => serde_json::Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Element::Boolean(b) => JsonValue::Bool(*b),
            Element::Date(d) => JsonValue::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Null => f.write_str("null"),
            Element::String(s) => f.write_str(s),
            Element::Integer(v) => write!(f, "{}", v),
            Element::Long(v) => write!(f, "{}", v),
            Element::Float(v) => write!(f, "{}", v),
            Element::Double(v) => write!(f, "{}", v),
            Element::Boolean(v) => write!(f, "{}", v),
            Element::Date(d) => write!(f, "{}", d.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl From<&str> for Element {
    fn from(v: &str) -> Self {
        Element::String(v.to_string())
    }
}

impl From<String> for Element {
    fn from(v: String) -> Self {
        Element::String(v)
    }
}

impl From<i32> for Element {
    fn from(v: i32) -> Self {
        Element::Integer(v)
    }
}

impl From<i64> for Element {
    fn from(v: i64) -> Self {
        Element::Long(v)
    }
}

impl From<f32> for Element {
    fn from(v: f32) -> Self {
        Element::Float(v)
    }
}

impl From<f64> for Element {
    fn from(v: f64) -> Self {
        Element::Double(v)
    }
}

impl From<bool> for Element {
    fn from(v: bool) -> Self {
        Element::Boolean(v)
    }
}

impl From<NaiveDateTime> for Element {
    fn from(v: NaiveDateTime) -> Self {
        Element::Date(v)
    }
}
