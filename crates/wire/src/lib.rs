//! Wire formats for tensorserve
//!
//! This crate implements the HTTP body side of model serving:
//! - Request decoding by Content-Type (JSON, multipart forms, raw images)
//! - Response encoding by Accept (JSON, multipart forms, HTML, images)
//! - JSON error bodies
//!
//! ## Examples
//!
//! ```
//! use tensorserve_wire::{decode_request, encode_response, Accept};
//!
//! let input = decode_request(Some("application/json"), br#"{"x": [1, 2]}"#, &[]).unwrap();
//! let accept = Accept::parse(Some("text/html")).unwrap();
//! let body = encode_response(&input, &accept, &[], true).unwrap();
//! assert_eq!(body.as_str(), Some("<h1>x</h1><ul><li>1</li><li>2</li></ul>"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decode;
pub mod encode;
pub mod error;
pub mod media_type;
pub mod multipart;

pub use decode::{decode_request, RequestDecoder};
pub use encode::{encode_html, encode_image, encode_json, encode_multipart, encode_response, EncodedBody};
pub use error::{encode_error, encode_error_message};
pub use media_type::{Accept, MediaType, ResponseFormat};
pub use multipart::{parse_multipart, MultipartWriter, Part};
