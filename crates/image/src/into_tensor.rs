//! Images into an integer tensor.

use crate::layout::{AxisRole, ChannelProperty, ImageLayout};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, RgbImage};
use std::borrow::Cow;
use std::collections::BTreeSet;
use tensorserve_core::{Builder, ConversionError, DataType, Element, Result, Tensor, TensorShape};
use tracing::debug;

/// Builds one `integer` tensor out of a list of images
#[derive(Debug, Clone)]
pub struct ImagesIntoTensor {
    layout: ImageLayout,
}

impl ImagesIntoTensor {
    /// Builder following `layout`
    pub fn new(layout: ImageLayout) -> Self {
        Self { layout }
    }

    /// Layout used to fill the tensor
    pub fn layout(&self) -> &ImageLayout {
        &self.layout
    }

    /// Target size of `image`, `None` when it already fits the layout.
    ///
    /// A single wildcard dimension follows the aspect ratio of the image.
    fn target_size(&self, image: &DynamicImage) -> Option<(u32, u32)> {
        let (width, height) = image.dimensions();
        let expected_width = self.layout.expected_width();
        let expected_height = self.layout.expected_height();

        let resize_width = expected_width > 0 && i64::from(width) != expected_width;
        let resize_height = expected_height > 0 && i64::from(height) != expected_height;
        if !resize_width && !resize_height {
            return None;
        }

        let scaled = |size: u32, numerator: i64, denominator: u32| -> u32 {
            let value = (f64::from(size) * numerator as f64 / f64::from(denominator)).round();
            (value as u32).max(1)
        };
        let target_width = if expected_width > 0 {
            expected_width as u32
        } else {
            scaled(width, expected_height, height)
        };
        let target_height = if expected_height > 0 {
            expected_height as u32
        } else {
            scaled(height, expected_width, width)
        };
        Some((target_width, target_height))
    }

    fn resize<'a>(&self, image: &'a DynamicImage) -> Cow<'a, DynamicImage> {
        match self.target_size(image) {
            Some((width, height)) => {
                debug!(
                    "Resizing image from {}x{} to {}x{}",
                    image.width(),
                    image.height(),
                    width,
                    height
                );
                Cow::Owned(image.resize_exact(width, height, FilterType::CatmullRom))
            }
            None => Cow::Borrowed(image),
        }
    }
}

fn common_size(values: impl Iterator<Item = u32>, dimension: &str) -> Result<u32> {
    let found: BTreeSet<u32> = values.collect();
    let mut iter = found.iter();
    match (iter.next(), iter.next()) {
        (Some(value), None) => Ok(*value),
        (None, _) => Err(ConversionError::Image("no image to convert".to_string())),
        _ => {
            let sizes: Vec<String> = found.iter().map(u32::to_string).collect();
            Err(ConversionError::Image(format!(
                "to merge several images as a tensor, all images should have the same {}. Found several: {}",
                dimension,
                sizes.join(", ")
            )))
        }
    }
}

/// Pixels of one image decomposed once per needed color model
struct Samples {
    rgb: Option<RgbImage>,
    gray: Option<GrayImage>,
}

impl Samples {
    fn new(image: &DynamicImage, channels: &[ChannelProperty]) -> Self {
        let needs_gray = channels.contains(&ChannelProperty::Gray);
        let needs_rgb = channels.iter().any(|c| *c != ChannelProperty::Gray);
        Self {
            rgb: needs_rgb.then(|| image.to_rgb8()),
            gray: needs_gray.then(|| image.to_luma8()),
        }
    }

    fn value(&self, x: u32, y: u32, channel: ChannelProperty) -> i32 {
        let band = match channel {
            ChannelProperty::Red => self.rgb.as_ref().map(|img| img.get_pixel(x, y).0[0]),
            ChannelProperty::Green => self.rgb.as_ref().map(|img| img.get_pixel(x, y).0[1]),
            ChannelProperty::Blue => self.rgb.as_ref().map(|img| img.get_pixel(x, y).0[2]),
            ChannelProperty::Gray => self.gray.as_ref().map(|img| img.get_pixel(x, y).0[0]),
        };
        band.map(i32::from).unwrap_or_default()
    }
}

impl<'a> Builder<&'a [DynamicImage]> for ImagesIntoTensor {
    type Output = Tensor;

    fn build(&self, images: &'a [DynamicImage]) -> Result<Tensor> {
        let images: Vec<Cow<'_, DynamicImage>> = images.iter().map(|img| self.resize(img)).collect();
        let width = common_size(images.iter().map(|img| img.width()), "width")?;
        let height = common_size(images.iter().map(|img| img.height()), "height")?;

        let roles = self.layout.roles();
        let channels = self.layout.channels();
        let dims: Vec<i64> = roles
            .iter()
            .map(|role| match role {
                AxisRole::Batch => images.len() as i64,
                AxisRole::Height => i64::from(height),
                AxisRole::Width => i64::from(width),
                AxisRole::Channel => channels.len() as i64,
            })
            .collect();
        let mut tensor = Tensor::new(DataType::Integer, TensorShape::new(dims))?;

        let mut coords = vec![0usize; roles.len()];
        for (image_index, image) in images.iter().enumerate() {
            let samples = Samples::new(image, channels);
            for x in 0..width {
                for y in 0..height {
                    for (channel_index, channel) in channels.iter().enumerate() {
                        for (axis, role) in roles.iter().enumerate() {
                            coords[axis] = match role {
                                AxisRole::Batch => image_index,
                                AxisRole::Height => y as usize,
                                AxisRole::Width => x as usize,
                                AxisRole::Channel => channel_index,
                            };
                        }
                        let value = Element::Integer(samples.value(x, y, *channel));
                        tensor.set(&coords, &value)?;
                    }
                }
            }
        }
        Ok(tensor)
    }
}
