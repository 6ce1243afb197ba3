//! Tensor collections into response bodies.
//!
//! The format comes from the negotiated [`Accept`]. Multipart and HTML
//! responses pick an encoding per tensor: the Accept parameter named after
//! the tensor when present, PNG when the tensor is image-shaped, JSON
//! otherwise.

mod html;
mod image;
mod json;
mod multipart;

pub use self::html::encode_html;
pub use self::image::encode_image;
pub use self::json::encode_json;
pub use self::multipart::encode_multipart;

use crate::media_type::{Accept, ResponseFormat, JSON};
use tensorserve_core::{ConversionError, Result, Tensor, TensorCollection, TensorField};
use tensorserve_image::{ImageFormat, ImageLayout};
use tracing::debug;

/// Encoded response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    /// Full Content-Type of `bytes`
    pub media_type: String,
    /// Response payload
    pub bytes: Vec<u8>,
}

impl EncodedBody {
    /// Body as text, for the textual formats
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// How one tensor of a multipart or HTML response is written
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PartEncoding {
    Json,
    Image(ImageFormat, ImageLayout),
}

/// Layout of tensor `name`, from its output field first, its shape otherwise
pub(crate) fn image_layout(name: &str, tensor: &Tensor, fields: &[TensorField]) -> Option<ImageLayout> {
    fields
        .iter()
        .find(|f| f.name == name)
        .and_then(ImageLayout::from_field)
        .or_else(|| ImageLayout::from_shape(tensor.shape()))
}

pub(crate) fn part_encoding(
    name: &str,
    tensor: &Tensor,
    accept: &Accept,
    fields: &[TensorField],
) -> Result<PartEncoding> {
    let layout = image_layout(name, tensor, fields);
    match accept.part_type(name) {
        Some(requested) if requested.eq_ignore_ascii_case(JSON) => Ok(PartEncoding::Json),
        Some(requested) => {
            let format = ImageFormat::from_media_type(requested).ok_or_else(|| {
                ConversionError::UnsupportedMediaType(format!(
                    "unsupported media type {} for tensor {}",
                    requested, name
                ))
            })?;
            let layout = layout.ok_or_else(|| {
                ConversionError::Image(format!("impossible to convert tensor '{}' into image", name))
            })?;
            Ok(PartEncoding::Image(format, layout))
        }
        None => Ok(match layout {
            Some(layout) => PartEncoding::Image(ImageFormat::Png, layout),
            None => PartEncoding::Json,
        }),
    }
}

/// Encode `output` in the format selected by `accept`.
///
/// `fields` are the evaluator outputs, used to recognize image tensors.
pub fn encode_response(
    output: &TensorCollection,
    accept: &Accept,
    fields: &[TensorField],
    simplify: bool,
) -> Result<EncodedBody> {
    debug!("Encoding {} tensors as {:?}", output.len(), accept.format());
    match accept.format() {
        ResponseFormat::Json => Ok(encode_json(output, simplify)),
        ResponseFormat::Multipart => encode_multipart(output, accept, fields, simplify),
        ResponseFormat::Html => encode_html(output, accept, fields, simplify),
        ResponseFormat::Image(format) => encode_image(output, format, fields),
    }
}
