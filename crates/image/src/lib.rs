//! Image support for tensorserve
//!
//! This crate converts between image tensors and decoded images:
//! - ImageLayout: axis roles and channels guessed from a field shape
//! - ImagesIntoTensor: a list of images into one `integer` tensor
//! - TensorIntoImages: a tensor into one image per batch entry
//! - read_image / write_image: PNG and JPEG bytes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod from_tensor;
pub mod into_tensor;
pub mod layout;

pub use codec::{read_image, write_image, BinaryContent, ImageFormat};
pub use from_tensor::TensorIntoImages;
pub use image::DynamicImage;
pub use into_tensor::ImagesIntoTensor;
pub use layout::{AxisRole, ChannelProperty, ImageLayout};
