//! JSON readiness of settings values.
//!
//! [`Value`] serializes through serde, but JSON cannot carry non-finite
//! numbers (serde_json writes them as `null`) and byte buffers belong in a
//! blob table. [`check_serializable`] walks the tree first so the error
//! names the offending path.

use patchbay_core::Value;

use crate::error::PresetError;

/// Refuses non-finite floats and leftover byte buffers anywhere under
/// `value`; run [`extract_blobs`](crate::blob::extract_blobs) first.
pub fn check_serializable(value: &Value, path: &str) -> Result<(), PresetError> {
    match value {
        Value::Float(f) if !f.is_finite() => Err(PresetError::Unserializable {
            path: path.to_string(),
            reason: format!("non-finite number {f}"),
        }),
        Value::Bytes(_) => Err(PresetError::Unserializable {
            path: path.to_string(),
            reason: "raw bytes outside a blob table".into(),
        }),
        Value::List(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, item)| check_serializable(item, &format!("{path}[{i}]"))),
        Value::Map(entries) => entries
            .iter()
            .try_for_each(|(key, item)| check_serializable(item, &format!("{path}.{key}"))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_keep_their_kind() {
        let value = Value::map().with("gain", 5).with("tempo", 120.0);
        check_serializable(&value, "settings").unwrap();
        let text = serde_json::to_string(&value).unwrap();
        assert_eq!(text, r#"{"gain":5,"tempo":120.0}"#);

        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_non_finite_is_unserializable() {
        let value = Value::map().with("x", vec![Value::Float(f64::INFINITY)]);
        match check_serializable(&value, "settings") {
            Err(PresetError::Unserializable { path, .. }) => assert_eq!(path, "settings.x[0]"),
            other => panic!("expected Unserializable, got {other:?}"),
        }
    }

    #[test]
    fn test_bytes_must_be_extracted_first() {
        let value = Value::map().with("sample", Value::Bytes(vec![1]));
        match check_serializable(&value, "settings") {
            Err(PresetError::Unserializable { path, .. }) => assert_eq!(path, "settings.sample"),
            other => panic!("expected Unserializable, got {other:?}"),
        }
    }
}
