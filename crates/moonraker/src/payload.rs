//! Moonraker response envelopes.
//!
//! Database item responses look like
//! `{"result": {"namespace": "gcode_metadata", "key": null, "value": {...files...}}}`.

use serde_json::{Map, Value};

use crate::FetchError;

/// Strip the `result` wrapper Moonraker puts around most responses.
pub fn unwrap_result(payload: Value) -> Value {
    match payload {
        Value::Object(mut obj) if obj.contains_key("result") => {
            obj.remove("result").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Return the filename -> metadata mapping, descending into `value` when the
/// content is a database item.
pub fn extract_gcode_index(content: Value) -> Result<Map<String, Value>, FetchError> {
    match content {
        Value::Object(mut obj) => {
            if matches!(obj.get("value"), Some(Value::Object(_))) {
                if let Some(Value::Object(index)) = obj.remove("value") {
                    return Ok(index);
                }
            }
            Ok(obj)
        }
        _ => Err(FetchError::UnexpectedPayload),
    }
}
