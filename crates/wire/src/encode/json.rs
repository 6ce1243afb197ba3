use super::EncodedBody;
use crate::media_type::JSON;
use serde_json::Value as JsonValue;
use tensorserve_core::TensorCollection;

/// Encode `output` as one JSON object of name to nested data.
pub fn encode_json(output: &TensorCollection, simplify: bool) -> EncodedBody {
    let body = JsonValue::Object(output.to_json_map(simplify)).to_string();
    EncodedBody {
        media_type: JSON.to_string(),
        bytes: body.into_bytes(),
    }
}
