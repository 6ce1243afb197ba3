//! Error bodies.
//!
//! Failed requests are answered with a JSON object:
//! ```json
//! {"code": "ShapeError", "message": "shape error: ..."}
//! ```

use crate::encode::EncodedBody;
use crate::media_type::JSON;
use serde_json::json;
use tensorserve_core::ConversionError;

/// Encode a code and message as a JSON error body
pub fn encode_error_message(code: &str, message: &str) -> EncodedBody {
    EncodedBody {
        media_type: JSON.to_string(),
        bytes: json!({ "code": code, "message": message }).to_string().into_bytes(),
    }
}

/// Encode a conversion error as a JSON error body
pub fn encode_error(error: &ConversionError) -> EncodedBody {
    encode_error_message(error.code(), &error.to_string())
}
