//! `multipart/form-data` bodies.

use crate::media_type::MediaType;
use tensorserve_core::{ConversionError, Result};
use uuid::Uuid;

const CRLF: &[u8] = b"\r\n";

/// One part of a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Form field name
    pub name: String,
    /// Submitted file name
    pub filename: Option<String>,
    /// Declared Content-Type
    pub content_type: Option<MediaType>,
    /// Raw content
    pub body: Vec<u8>,
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Next delimiter at the start of the body or of a line.
fn find_delimiter(body: &[u8], delimiter: &[u8], from: usize) -> Option<usize> {
    let mut from = from;
    while let Some(pos) = find(body, delimiter, from) {
        if pos == 0 || body[pos - 1] == b'\n' {
            return Some(pos);
        }
        from = pos + 1;
    }
    None
}

fn skip_line_break(body: &[u8], pos: usize) -> usize {
    if body[pos..].starts_with(CRLF) {
        pos + 2
    } else if body[pos..].starts_with(b"\n") {
        pos + 1
    } else {
        pos
    }
}

fn parse_part(raw: &[u8]) -> Result<Part> {
    let (head, body) = match find(raw, b"\r\n\r\n", 0) {
        Some(end) => (&raw[..end], &raw[end + 4..]),
        None => match find(raw, b"\n\n", 0) {
            Some(end) => (&raw[..end], &raw[end + 2..]),
            None => (raw, &raw[raw.len()..]),
        },
    };
    let head = std::str::from_utf8(head)
        .map_err(|_| ConversionError::Decode("multipart headers are not valid UTF-8".to_string()))?;

    let mut disposition = None;
    let mut content_type = None;
    for line in head.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("content-disposition") {
            disposition = Some(MediaType::parse(value.trim())?);
        } else if key.eq_ignore_ascii_case("content-type") {
            content_type = Some(MediaType::parse(value.trim())?);
        }
    }

    let disposition = disposition.ok_or_else(|| {
        ConversionError::Decode("multipart part without Content-Disposition header".to_string())
    })?;
    let name = disposition
        .param("name")
        .ok_or_else(|| ConversionError::Decode("multipart part without a name".to_string()))?;

    Ok(Part {
        name: name.to_string(),
        filename: disposition.param("filename").map(str::to_string),
        content_type,
        body: body.to_vec(),
    })
}

/// Split a multipart body delimited by `boundary`.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<Vec<Part>> {
    let delimiter = format!("--{}", boundary).into_bytes();
    let mut pos = find_delimiter(body, &delimiter, 0).ok_or_else(|| {
        ConversionError::Decode(format!("multipart boundary '{}' not found in body", boundary))
    })? + delimiter.len();

    let mut parts = Vec::new();
    loop {
        if body[pos..].starts_with(b"--") {
            return Ok(parts);
        }
        let start = skip_line_break(body, pos);
        let end = find_delimiter(body, &delimiter, start)
            .ok_or_else(|| ConversionError::Decode("unterminated multipart body".to_string()))?;

        // The line break before a delimiter belongs to the delimiter
        let mut content_end = end;
        if body[..content_end].ends_with(CRLF) {
            content_end -= 2;
        } else if body[..content_end].ends_with(b"\n") {
            content_end -= 1;
        }
        parts.push(parse_part(&body[start..content_end.max(start)])?);
        pos = end + delimiter.len();
    }
}

/// Incremental multipart body writer
#[derive(Debug)]
pub struct MultipartWriter {
    boundary: String,
    buffer: Vec<u8>,
}

impl Default for MultipartWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartWriter {
    /// Writer with a random boundary
    pub fn new() -> Self {
        Self::with_boundary(format!("tensorserve-{}", Uuid::new_v4().simple()))
    }

    /// Writer with a fixed boundary
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            buffer: Vec::new(),
        }
    }

    /// Boundary separating the parts
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Append one part.
    pub fn add_part(&mut self, name: &str, filename: &str, content_type: &str, body: &[u8]) {
        self.buffer.extend_from_slice(b"--");
        self.buffer.extend_from_slice(self.boundary.as_bytes());
        self.buffer.extend_from_slice(CRLF);
        self.buffer
            .extend_from_slice(format!("Content-Type: {}", content_type).as_bytes());
        self.buffer.extend_from_slice(CRLF);
        self.buffer.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
                name, filename
            )
            .as_bytes(),
        );
        self.buffer.extend_from_slice(CRLF);
        self.buffer.extend_from_slice(CRLF);
        self.buffer.extend_from_slice(body);
        self.buffer.extend_from_slice(CRLF);
    }

    /// Close the body.
    pub fn finish(mut self) -> Vec<u8> {
        self.buffer.extend_from_slice(b"--");
        self.buffer.extend_from_slice(self.boundary.as_bytes());
        self.buffer.extend_from_slice(b"--");
        self.buffer.extend_from_slice(CRLF);
        self.buffer
    }
}
