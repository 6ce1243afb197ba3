//! How image pixels map onto tensor axes.
//!
//! A layout names the role of every tensor axis and the channel stored at
//! each position of the channel axis. Layouts are usually guessed from a
//! field shape:
//!
//! | Shape | Roles | Channels |
//! |-------|-------|----------|
//! | `[-1, -1, -1, 3]` | batch, height, width, channel | red, green, blue |
//! | `[3, -1, -1]` | channel, height, width | red, green, blue |
//! | `[25, 32, 1]` | height, width, channel | gray |
//! | `[-1, -1, -1, 1]` | batch, height, width, channel | gray |
//!
//! The channel axis is the last axis of extent 1 or 3. Shapes without a
//! channel axis, such as `[-1, -1]`, are not images.

use crate::from_tensor::TensorIntoImages;
use crate::into_tensor::ImagesIntoTensor;
use std::fmt;
use tensorserve_core::{ConversionError, Result, TensorField, TensorShape};

/// Role of one tensor axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisRole {
    /// Image index within the batch
    Batch,
    /// Pixel row
    Height,
    /// Pixel column
    Width,
    /// Color channel
    Channel,
}

impl fmt::Display for AxisRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AxisRole::Batch => "batch",
            AxisRole::Height => "height",
            AxisRole::Width => "width",
            AxisRole::Channel => "channel",
        };
        f.write_str(name)
    }
}

/// Sample stored at one position of the channel axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelProperty {
    /// Red band of an RGB pixel
    Red,
    /// Green band of an RGB pixel
    Green,
    /// Blue band of an RGB pixel
    Blue,
    /// Luminance
    Gray,
}

/// Channels of a grayscale image
pub const GRAY_CHANNELS: [ChannelProperty; 1] = [ChannelProperty::Gray];

/// Channels of an RGB image
pub const RGB_CHANNELS: [ChannelProperty; 3] = [
    ChannelProperty::Red,
    ChannelProperty::Green,
    ChannelProperty::Blue,
];

/// Last axis whose extent is 1 or 3.
pub fn channel_index(shape: &[i64]) -> Option<usize> {
    shape.iter().rposition(|d| *d == 1 || *d == 3)
}

/// Check if `shape` holds grayscale images.
pub fn is_grayscale(shape: &[i64]) -> Result<bool> {
    match channel_index(shape) {
        Some(index) => Ok(shape[index] == 1),
        None if shape.len() <= 3 => Ok(true),
        None => Err(ConversionError::Image(format!(
            "impossible to guess the kind of image from the shape {}",
            TensorShape::from(shape)
        ))),
    }
}

/// Check if the first axis of `shape` indexes images.
pub fn is_batched(shape: &[i64]) -> Result<bool> {
    let grayscale = is_grayscale(shape)?;
    match shape.len() {
        2 => Ok(false),
        3 => Ok(grayscale && channel_index(shape).is_none()),
        4 => Ok(true),
        _ => Err(ConversionError::Image(format!(
            "unable to get the channel properties of an image from a tensor of shape {}",
            TensorShape::from(shape)
        ))),
    }
}

/// Role of every axis of `shape`.
///
/// The channel axis is assigned first, the other axes take batch (when
/// batched), height, width and channel in that order.
pub fn axis_roles(shape: &[i64]) -> Result<Vec<AxisRole>> {
    let channel = channel_index(shape);
    let mut expected = Vec::with_capacity(4);
    if is_batched(shape)? {
        expected.push(AxisRole::Batch);
    }
    expected.extend([AxisRole::Height, AxisRole::Width, AxisRole::Channel]);

    let mut remaining = expected.into_iter();
    let mut roles = Vec::with_capacity(shape.len());
    for position in 0..shape.len() {
        if channel == Some(position) {
            roles.push(AxisRole::Channel);
        } else if let Some(role) = remaining.next() {
            roles.push(role);
        }
    }
    Ok(roles)
}

/// Channels stored along the channel axis of `shape`.
pub fn channel_properties(shape: &[i64]) -> Result<Vec<ChannelProperty>> {
    if is_grayscale(shape)? {
        Ok(GRAY_CHANNELS.to_vec())
    } else {
        Ok(RGB_CHANNELS.to_vec())
    }
}

/// Mapping between a tensor shape and a list of images
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLayout {
    roles: Vec<AxisRole>,
    channels: Vec<ChannelProperty>,
    shape: TensorShape,
}

impl ImageLayout {
    /// Layout guessed from `shape`, `None` if it does not describe images.
    pub fn from_shape(shape: &TensorShape) -> Option<Self> {
        let dims = shape.dims();
        let roles = axis_roles(dims).ok()?;
        let channels = channel_properties(dims).ok()?;
        let layout = Self {
            roles,
            channels,
            shape: shape.clone(),
        };
        layout.is_complete().then_some(layout)
    }

    /// Layout guessed from the shape of `field`.
    pub fn from_field(field: &TensorField) -> Option<Self> {
        Self::from_shape(&field.shape)
    }

    /// Layout with explicit roles and channels.
    ///
    /// `shape` gives the expected extent of every role, `-1` when any
    /// extent is accepted.
    pub fn custom(
        channels: Vec<ChannelProperty>,
        roles: Vec<AxisRole>,
        shape: impl Into<TensorShape>,
    ) -> Result<Self> {
        let shape = shape.into();
        if roles.len() != shape.rank() {
            return Err(ConversionError::Image(format!(
                "{} axis roles given for a shape of rank {}",
                roles.len(),
                shape.rank()
            )));
        }
        if channels.is_empty() {
            return Err(ConversionError::Image(
                "an image layout needs at least one channel".to_string(),
            ));
        }
        Ok(Self {
            roles,
            channels,
            shape,
        })
    }

    /// Role of every tensor axis
    pub fn roles(&self) -> &[AxisRole] {
        &self.roles
    }

    /// Channels along the channel axis
    pub fn channels(&self) -> &[ChannelProperty] {
        &self.channels
    }

    /// Expected tensor shape
    pub fn shape(&self) -> &TensorShape {
        &self.shape
    }

    /// Axis holding `role`
    pub fn position(&self, role: AxisRole) -> Option<usize> {
        self.roles.iter().position(|r| *r == role)
    }

    /// Check if height, width and channel axes are all present.
    pub fn is_complete(&self) -> bool {
        [AxisRole::Height, AxisRole::Width, AxisRole::Channel]
            .iter()
            .all(|role| self.roles.contains(role))
    }

    /// Check if channels are a single luminance band
    pub fn is_grayscale(&self) -> bool {
        self.channels.len() == 1
    }

    fn expected(&self, role: AxisRole) -> Option<i64> {
        self.position(role)
            .and_then(|axis| self.shape.dims().get(axis).copied())
    }

    /// Expected image width, `-1` when any width is accepted
    pub fn expected_width(&self) -> i64 {
        self.expected(AxisRole::Width).unwrap_or(-1)
    }

    /// Expected image height, `-1` when any height is accepted
    pub fn expected_height(&self) -> i64 {
        self.expected(AxisRole::Height).unwrap_or(-1)
    }

    /// Expected number of images, 1 without a batch axis
    pub fn expected_batch_size(&self) -> i64 {
        self.expected(AxisRole::Batch).unwrap_or(1)
    }

    /// Check if the layout accepts several images
    pub fn supports_batch(&self) -> bool {
        self.expected_batch_size() != 1
    }

    /// Same layout with the expected width and height replaced.
    pub fn with_expected_size(mut self, width: Option<i64>, height: Option<i64>) -> Self {
        let mut dims = self.shape.dims().to_vec();
        for (role, value) in [(AxisRole::Width, width), (AxisRole::Height, height)] {
            if let (Some(axis), Some(value)) = (self.position(role), value) {
                dims[axis] = value;
            }
        }
        self.shape = TensorShape::new(dims);
        self
    }

    /// Builder of tensors from images in this layout
    pub fn tensor_builder(&self) -> ImagesIntoTensor {
        ImagesIntoTensor::new(self.clone())
    }

    /// Builder of images from tensors in this layout
    pub fn image_builder(&self) -> TensorIntoImages {
        TensorIntoImages::new(self.clone())
    }
}
