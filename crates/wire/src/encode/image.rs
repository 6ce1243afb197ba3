use super::{image_layout, EncodedBody};
use tensorserve_core::{Builder, ConversionError, Result, TensorCollection, TensorField};
use tensorserve_image::{write_image, ImageFormat};

/// Encode the single tensor of `output` as one image.
pub fn encode_image(
    output: &TensorCollection,
    format: ImageFormat,
    fields: &[TensorField],
) -> Result<EncodedBody> {
    let (name, tensor) = match output.iter().collect::<Vec<_>>().as_slice() {
        [single] => *single,
        _ => {
            return Err(ConversionError::Image(format!(
                "unable to convert several tensors ({}) into a single image",
                output.names().join(", ")
            )))
        }
    };

    let layout = image_layout(name, tensor, fields).ok_or_else(|| {
        ConversionError::Image(format!("impossible to convert tensor '{}' into image", name))
    })?;
    let images = layout.image_builder().build(tensor)?;
    let image = match images.as_slice() {
        [image] => image,
        images => {
            return Err(ConversionError::Image(format!(
                "unable to convert a batch of {} images into a single image",
                images.len()
            )))
        }
    };

    let content = write_image(image, format)?;
    Ok(EncodedBody {
        media_type: content.media_type.to_string(),
        bytes: content.bytes,
    })
}
