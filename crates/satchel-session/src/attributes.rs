//! Attribute map encoding and merging

use serde_json::{Map, Value};

use satchel_core::Result;

/// Session attributes, key -> JSON value
pub type Attributes = Map<String, Value>;

/// Encode attributes into the blob handed to a store
pub fn encode(attributes: &Attributes) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(attributes)?)
}

/// Decode a stored blob; an empty blob is an empty session
pub fn decode(blob: &[u8]) -> Result<Attributes> {
    if blob.is_empty() {
        return Ok(Attributes::new());
    }
    Ok(serde_json::from_slice(blob)?)
}

/// Merge `incoming` into `target`
///
/// Objects on both sides merge key by key; any other pairing (arrays
/// included) takes the incoming value.
pub fn merge_replace(target: &mut Attributes, incoming: Attributes) {
    for (key, value) in incoming {
        if let Value::Object(nested) = value {
            if let Some(Value::Object(existing)) = target.get_mut(&key) {
                merge_replace(existing, nested);
                continue;
            }
            target.insert(key, Value::Object(nested));
        } else {
            target.insert(key, value);
        }
    }
}
