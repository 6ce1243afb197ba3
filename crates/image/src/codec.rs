//! PNG and JPEG byte codec.

use image::{DynamicImage, ImageOutputFormat};
use std::borrow::Cow;
use std::io::Cursor;
use tensorserve_core::{ConversionError, Result};

/// PNG media type
pub const PNG_MEDIA_TYPE: &str = "image/png";
/// JPEG media type
pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";
/// Any image, encoded as PNG
pub const ANY_IMAGE_MEDIA_TYPE: &str = "image/*";

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const JPEG_QUALITY: u8 = 90;

/// Encoded image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Portable Network Graphics
    Png,
    /// JPEG
    Jpeg,
}

impl ImageFormat {
    /// Format named by a media type, `image/*` meaning PNG.
    ///
    /// Parameters after `;` are ignored.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case(PNG_MEDIA_TYPE) || essence.eq_ignore_ascii_case(ANY_IMAGE_MEDIA_TYPE) {
            Some(ImageFormat::Png)
        } else if essence.eq_ignore_ascii_case(JPEG_MEDIA_TYPE) || essence.eq_ignore_ascii_case("image/jpg") {
            Some(ImageFormat::Jpeg)
        } else {
            None
        }
    }

    /// Format detected from the leading magic bytes
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PNG_MAGIC) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(JPEG_MAGIC) {
            Some(ImageFormat::Jpeg)
        } else {
            None
        }
    }

    /// Canonical media type
    pub fn media_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => PNG_MEDIA_TYPE,
            ImageFormat::Jpeg => JPEG_MEDIA_TYPE,
        }
    }

    /// File extension
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }
}

/// Encoded image ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryContent {
    /// File extension, `png` or `jpg`
    pub extension: &'static str,
    /// Media type of `bytes`
    pub media_type: &'static str,
    /// Encoded image
    pub bytes: Vec<u8>,
}

/// Decode a PNG or JPEG image.
pub fn read_image(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(|e| {
        ConversionError::Image(format!("unable to load image from the given bytes: {}", e))
    })
}

/// Encode `image` as `format`.
///
/// JPEG has no alpha channel, so images with one are flattened to RGB.
pub fn write_image(image: &DynamicImage, format: ImageFormat) -> Result<BinaryContent> {
    let mut cursor = Cursor::new(Vec::new());
    let written = match format {
        ImageFormat::Png => image.write_to(&mut cursor, ImageOutputFormat::Png),
        ImageFormat::Jpeg => {
            let flat = match image {
                DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => Cow::Borrowed(image),
                other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
            };
            flat.write_to(&mut cursor, ImageOutputFormat::Jpeg(JPEG_QUALITY))
        }
    };
    written.map_err(|e| {
        ConversionError::Image(format!("unable to encode image as {}: {}", format.extension(), e))
    })?;

    Ok(BinaryContent {
        extension: format.extension(),
        media_type: format.media_type(),
        bytes: cursor.into_inner(),
    })
}
