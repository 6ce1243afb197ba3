//! Content-Type and Accept parsing.
//!
//! ## Response formats
//!
//! | Accept | Format |
//! |--------|--------|
//! | missing, empty, `*/*`, `application/json` | JSON object of tensors |
//! | `multipart/form-data` | one part per tensor |
//! | `text/html` | HTML page |
//! | `image/png`, `image/jpeg`, `image/*` | single image |
//!
//! Parameters of multipart and HTML Accept values name the encoding of
//! individual tensors, as in `multipart/form-data; mask=image/jpeg`.

use std::fmt;
use tensorserve_core::{ConversionError, Result};
use tensorserve_image::ImageFormat;

/// JSON media type
pub const JSON: &str = "application/json";
/// Multipart form media type
pub const MULTIPART: &str = "multipart/form-data";
/// HTML media type
pub const HTML: &str = "text/html";
/// Untyped binary media type
pub const OCTET_STREAM: &str = "application/octet-stream";
/// Media type matching anything
pub const ANY: &str = "*/*";

/// Split `value` on `separator`, ignoring separators inside double quotes.
fn split_unquoted(value: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        if c == '"' {
            quoted = !quoted;
        } else if c == separator && !quoted {
            pieces.push(&value[start..i]);
            start = i + c.len_utf8();
        }
    }
    pieces.push(&value[start..]);
    pieces
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Parsed `type/subtype; key=value` header value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    essence: String,
    params: Vec<(String, String)>,
}

impl MediaType {
    /// Parse a header value.
    pub fn parse(value: &str) -> Result<Self> {
        let mut pieces = split_unquoted(value, ';').into_iter();
        let essence = pieces.next().unwrap_or_default().trim().to_ascii_lowercase();
        if essence.is_empty() {
            return Err(ConversionError::Decode(format!("invalid media type '{}'", value)));
        }

        let mut params = Vec::new();
        for piece in pieces {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            let (key, val) = piece.split_once('=').ok_or_else(|| {
                ConversionError::Decode(format!("invalid parameter '{}' in media type '{}'", piece, value))
            })?;
            params.push((key.trim().to_string(), unquote(val.trim()).to_string()));
        }
        Ok(Self { essence, params })
    }

    /// Media type without parameters
    pub fn new(essence: &str) -> Self {
        Self {
            essence: essence.to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// Same media type with one more parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Lowercase `type/subtype`
    pub fn essence(&self) -> &str {
        &self.essence
    }

    /// Value of parameter `key`.
    ///
    /// An exact match wins over a case-insensitive one.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .or_else(|| self.params.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)))
            .map(|(_, v)| v.as_str())
    }

    /// Check if the essence is `essence`
    pub fn is(&self, essence: &str) -> bool {
        self.essence.eq_ignore_ascii_case(essence)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.essence)?;
        for (key, value) in &self.params {
            if value.contains([';', ' ', '"', ',']) {
                write!(f, "; {}=\"{}\"", key, value)?;
            } else {
                write!(f, "; {}={}", key, value)?;
            }
        }
        Ok(())
    }
}

/// Encoding of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// JSON object of name to nested data
    Json,
    /// Multipart form, one part per tensor
    Multipart,
    /// HTML page
    Html,
    /// Single image
    Image(ImageFormat),
}

impl ResponseFormat {
    fn from_media_type(media_type: &MediaType) -> Option<Self> {
        match media_type.essence() {
            ANY | JSON => Some(ResponseFormat::Json),
            MULTIPART => Some(ResponseFormat::Multipart),
            HTML => Some(ResponseFormat::Html),
            other => ImageFormat::from_media_type(other).map(ResponseFormat::Image),
        }
    }
}

/// Negotiated response encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accept {
    format: ResponseFormat,
    media_type: MediaType,
}

impl Default for Accept {
    fn default() -> Self {
        Self {
            format: ResponseFormat::Json,
            media_type: MediaType::new(ANY),
        }
    }
}

impl Accept {
    /// Negotiate from an Accept header.
    ///
    /// The first supported entry of a comma separated list wins. A missing
    /// or empty header means JSON.
    pub fn parse(header: Option<&str>) -> Result<Self> {
        let header = match header.map(str::trim) {
            None | Some("") => return Ok(Self::default()),
            Some(header) => header,
        };

        for entry in split_unquoted(header, ',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let media_type = MediaType::parse(entry)?;
            if let Some(format) = ResponseFormat::from_media_type(&media_type) {
                return Ok(Self { format, media_type });
            }
        }
        Err(ConversionError::UnsupportedMediaType(format!(
            "accept header '{}' not supported",
            header
        )))
    }

    /// Selected format
    pub fn format(&self) -> ResponseFormat {
        self.format
    }

    /// Accept entry the format was selected from
    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// Media type requested for tensor `name`, if any
    pub fn part_type(&self, name: &str) -> Option<&str> {
        self.media_type.param(name)
    }
}
