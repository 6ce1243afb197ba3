//! Request bodies into tensor collections.
//!
//! | Content-Type | Decoding |
//! |--------------|----------|
//! | `application/json` (default) | object of name to nested value |
//! | `multipart/form-data` | image parts batched per name, other parts parsed as JSON |
//! | `image/png`, `image/jpeg` (or `image/jpg`) | one image for the single input field |

use crate::media_type::{MediaType, JSON, MULTIPART, OCTET_STREAM};
use crate::multipart::{parse_multipart, Part};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tensorserve_core::{
    Builder, ConversionError, Result, ResultExt, StructuralTensorBuilder, TensorCollection,
    TensorField, TensorShape,
};
use tensorserve_image::{read_image, DynamicImage, ImageFormat, ImageLayout};
use tracing::debug;

/// Decodes request bodies for an evaluator with the given inputs
#[derive(Debug, Clone, Default)]
pub struct RequestDecoder {
    fields: Vec<TensorField>,
    expected_width: Option<i64>,
    expected_height: Option<i64>,
}

/// What a multipart part holds
enum PartKind {
    Image,
    Json,
}

fn part_kind(part: &Part) -> PartKind {
    let declared = part
        .content_type
        .as_ref()
        .filter(|ct| !ct.is(OCTET_STREAM));
    let is_image = match declared {
        Some(ct) => ImageFormat::from_media_type(ct.essence()).is_some(),
        None => ImageFormat::sniff(&part.body).is_some(),
    };
    if is_image {
        PartKind::Image
    } else {
        PartKind::Json
    }
}

fn parse_json(body: &[u8]) -> Result<JsonValue> {
    serde_json::from_slice(body)
        .map_err(|e| ConversionError::Decode(format!("invalid JSON body: {}", e)))
}

/// Layout guessed from a decoded image when no field describes it
fn inferred_layout(image: &DynamicImage) -> Option<ImageLayout> {
    let channels = if image.color().has_color() { 3 } else { 1 };
    ImageLayout::from_shape(&TensorShape::new(vec![-1, -1, -1, channels]))
}

impl RequestDecoder {
    /// Decoder for requests feeding `fields`
    pub fn new(fields: Vec<TensorField>) -> Self {
        Self {
            fields,
            expected_width: None,
            expected_height: None,
        }
    }

    /// Resize incoming images to this width, whatever the field shape says
    pub fn expected_width(mut self, width: Option<i64>) -> Self {
        self.expected_width = width;
        self
    }

    /// Resize incoming images to this height, whatever the field shape says
    pub fn expected_height(mut self, height: Option<i64>) -> Self {
        self.expected_height = height;
        self
    }

    /// Input fields
    pub fn fields(&self) -> &[TensorField] {
        &self.fields
    }

    /// Decode `body` declared as `content_type`, JSON when absent.
    pub fn decode(&self, content_type: Option<&str>, body: &[u8]) -> Result<TensorCollection> {
        let media_type = match content_type.map(str::trim) {
            None | Some("") => MediaType::new(JSON),
            Some(value) => MediaType::parse(value)?,
        };
        debug!("Decoding request body of {} bytes as {}", body.len(), media_type.essence());

        if media_type.is(JSON) {
            self.decode_json(body)
        } else if media_type.is(MULTIPART) {
            let boundary = media_type.param("boundary").ok_or_else(|| {
                ConversionError::Decode("multipart content type without boundary".to_string())
            })?;
            let parts = parse_multipart(body, boundary)?;
            self.decode_parts(&parts)
        } else if ImageFormat::from_media_type(media_type.essence()).is_some() {
            self.decode_single_image(body)
        } else {
            Err(ConversionError::UnsupportedMediaType(format!(
                "unsupported content type {}",
                media_type.essence()
            )))
        }
    }

    fn decode_json(&self, body: &[u8]) -> Result<TensorCollection> {
        match parse_json(body)? {
            JsonValue::Object(map) => StructuralTensorBuilder::new().build_collection(&map),
            _ => Err(ConversionError::Decode(
                "expected a JSON object of tensors".to_string(),
            )),
        }
    }

    fn layout_for(&self, name: &str, first_image: Option<&DynamicImage>) -> Result<ImageLayout> {
        let layout = match self.fields.iter().find(|f| f.name == name) {
            Some(field) => ImageLayout::from_field(field).ok_or_else(|| {
                ConversionError::Image(format!(
                    "impossible to feed an image into tensor {} of shape {}",
                    name, field.shape
                ))
            })?,
            None => first_image.and_then(inferred_layout).ok_or_else(|| {
                ConversionError::Image(format!("unable to guess an image layout for {}", name))
            })?,
        };
        Ok(layout.with_expected_size(self.expected_width, self.expected_height))
    }

    fn decode_parts(&self, parts: &[Part]) -> Result<TensorCollection> {
        let mut images: BTreeMap<&str, Vec<DynamicImage>> = BTreeMap::new();
        let mut values: BTreeMap<&str, Vec<JsonValue>> = BTreeMap::new();
        for part in parts {
            match part_kind(part) {
                PartKind::Image => {
                    let image = read_image(&part.body).with_context(|| format!("part {}", part.name))?;
                    images.entry(part.name.as_str()).or_default().push(image);
                }
                PartKind::Json => {
                    let value = parse_json(&part.body).with_context(|| format!("part {}", part.name))?;
                    values.entry(part.name.as_str()).or_default().push(value);
                }
            }
        }

        if let Some(name) = values.keys().find(|name| images.contains_key(*name)) {
            return Err(ConversionError::Decode(format!(
                "parts named {} mix images and JSON values",
                name
            )));
        }

        let mut collection = TensorCollection::new();
        for (name, batch) in images {
            let layout = self.layout_for(name, batch.first())?;
            let tensor = layout
                .tensor_builder()
                .build(batch.as_slice())
                .with_context(|| format!("tensor {}", name))?;
            collection.insert(name, tensor);
        }

        let builder = StructuralTensorBuilder::new();
        let mut from_json = TensorCollection::new();
        for (name, batch) in values {
            let tensor = builder
                .build(&JsonValue::Array(batch))
                .with_context(|| format!("tensor {}", name))?;
            from_json.insert(name, tensor);
        }
        collection.merge(from_json);
        Ok(collection)
    }

    fn decode_single_image(&self, body: &[u8]) -> Result<TensorCollection> {
        let field = match self.fields.as_slice() {
            [field] => field,
            fields => {
                return Err(ConversionError::Decode(format!(
                    "a raw image can only feed a model with a single input, this one takes {}",
                    fields.len()
                )))
            }
        };
        let image = read_image(body)?;
        let layout = self.layout_for(&field.name, Some(&image))?;
        let tensor = layout
            .tensor_builder()
            .build(std::slice::from_ref(&image))
            .with_context(|| format!("tensor {}", field.name))?;
        Ok(TensorCollection::single(field.name.clone(), tensor))
    }
}

/// Decode a request for `fields` with default settings.
pub fn decode_request(
    content_type: Option<&str>,
    body: &[u8],
    fields: &[TensorField],
) -> Result<TensorCollection> {
    RequestDecoder::new(fields.to_vec()).decode(content_type, body)
}
