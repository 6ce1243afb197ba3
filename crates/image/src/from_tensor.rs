//! Tensor into images.

use crate::layout::{AxisRole, ChannelProperty, ImageLayout};
use image::{DynamicImage, GrayImage, RgbImage};
use tensorserve_core::{Builder, ConversionError, Result, Tensor};

/// Splits a tensor into one image per batch entry
#[derive(Debug, Clone)]
pub struct TensorIntoImages {
    layout: ImageLayout,
}

/// Band of an RGB pixel written by `channel`
fn band(channel: ChannelProperty) -> usize {
    match channel {
        ChannelProperty::Red | ChannelProperty::Gray => 0,
        ChannelProperty::Green => 1,
        ChannelProperty::Blue => 2,
    }
}

fn sample(value: f64) -> u8 {
    value.clamp(0.0, 255.0) as u8
}

fn pixel_size(extent: usize, role: AxisRole) -> Result<u32> {
    u32::try_from(extent)
        .map_err(|_| ConversionError::Image(format!("image {} of {} is too large", role, extent)))
}

impl TensorIntoImages {
    /// Builder following `layout`
    pub fn new(layout: ImageLayout) -> Self {
        Self { layout }
    }

    /// Layout used to read the tensor
    pub fn layout(&self) -> &ImageLayout {
        &self.layout
    }

    fn required(&self, role: AxisRole) -> Result<usize> {
        self.layout.position(role).ok_or_else(|| {
            let roles: Vec<String> = self.layout.roles().iter().map(AxisRole::to_string).collect();
            ConversionError::Image(format!(
                "converting a tensor into images needs width, height and channel axes, but was given [{}]",
                roles.join(", ")
            ))
        })
    }
}

impl<'a> Builder<&'a Tensor> for TensorIntoImages {
    type Output = Vec<DynamicImage>;

    fn build(&self, tensor: &'a Tensor) -> Result<Vec<DynamicImage>> {
        let width_axis = self.required(AxisRole::Width)?;
        let height_axis = self.required(AxisRole::Height)?;
        let channel_axis = self.required(AxisRole::Channel)?;

        let roles = self.layout.roles();
        let channels = self.layout.channels();
        let dims = tensor.dims();
        if dims.len() != roles.len() {
            return Err(ConversionError::Image(format!(
                "a tensor of shape {} cannot hold images with {} axes",
                tensor.shape(),
                roles.len()
            )));
        }
        if dims[channel_axis] != channels.len() {
            return Err(ConversionError::Image(format!(
                "channel is expected to be of size {} but found a tensor with channel size of {}",
                channels.len(),
                dims[channel_axis]
            )));
        }

        let batch = self.layout.position(AxisRole::Batch).map_or(1, |axis| dims[axis]);
        let width = pixel_size(dims[width_axis], AxisRole::Width)?;
        let height = pixel_size(dims[height_axis], AxisRole::Height)?;
        let grayscale = self.layout.is_grayscale();
        let bands = if grayscale { 1 } else { 3 };

        let mut images = Vec::with_capacity(batch);
        let mut coords = vec![0usize; roles.len()];
        for batch_index in 0..batch {
            let mut raw = vec![0u8; width as usize * height as usize * bands];
            for y in 0..height as usize {
                for x in 0..width as usize {
                    let pixel = (y * width as usize + x) * bands;
                    for (channel_index, channel) in channels.iter().enumerate() {
                        for (axis, role) in roles.iter().enumerate() {
                            coords[axis] = match role {
                                AxisRole::Batch => batch_index,
                                AxisRole::Height => y,
                                AxisRole::Width => x,
                                AxisRole::Channel => channel_index,
                            };
                        }
                        let value = tensor.get(&coords)?.as_f64().unwrap_or_default();
                        let slot = if grayscale { 0 } else { band(*channel) };
                        raw[pixel + slot] = sample(value);
                    }
                }
            }

            let image = if grayscale {
                GrayImage::from_raw(width, height, raw).map(DynamicImage::ImageLuma8)
            } else {
                RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8)
            };
            images.push(image.ok_or_else(|| {
                ConversionError::Image(format!("unable to allocate a {}x{} image", width, height))
            })?);
        }
        Ok(images)
    }
}
