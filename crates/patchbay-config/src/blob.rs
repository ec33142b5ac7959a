//! Content-addressed blob extraction.
//!
//! Binary payloads ([`Value::Bytes`]) are pulled out of a settings tree and
//! replaced by reference tokens:
//!
//! ```text
//! { "@blob": null, "t": "bytes", "h": "<sha-256, lowercase hex>" }
//! ```
//!
//! Payloads are keyed by their hash, so identical bytes anywhere in the tree
//! are stored once. Injection reverses the walk.

use std::collections::BTreeMap;

use patchbay_core::Value;
use sha2::{Digest, Sha256};

use crate::error::PresetError;

/// Reserved key marking a map as a blob reference token.
pub const BLOB_MARKER: &str = "@blob";

/// Type tag of byte-buffer blobs.
pub const BLOB_TYPE_BYTES: &str = "bytes";

/// Blob payloads keyed by content hash, iterated in ascending hash order.
pub type BlobTable = BTreeMap<String, Vec<u8>>;

/// SHA-256 of `bytes` as lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Replaces every binary leaf under `value` with a reference token.
///
/// `path` names the root in error messages. Fails with
/// [`PresetError::AmbiguousData`] if a map in the tree already uses the
/// marker key.
pub fn extract_blobs(value: &Value, path: &str) -> Result<(Value, BlobTable), PresetError> {
    let mut blobs = BlobTable::new();
    let stripped = extract(value, path, &mut blobs)?;
    Ok((stripped, blobs))
}

fn extract(value: &Value, path: &str, blobs: &mut BlobTable) -> Result<Value, PresetError> {
    match value {
        Value::Bytes(bytes) => {
            let hash = content_hash(bytes);
            blobs.entry(hash.clone()).or_insert_with(|| bytes.clone());
            Ok(token(&hash))
        }
        Value::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| extract(item, &format!("{path}[{i}]"), blobs))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Value::Map(entries) => {
            if entries.contains_key(BLOB_MARKER) {
                return Err(PresetError::AmbiguousData {
                    path: path.to_string(),
                });
            }
            entries
                .iter()
                .map(|(key, item)| Ok((key.clone(), extract(item, &format!("{path}.{key}"), blobs)?)))
                .collect::<Result<BTreeMap<_, _>, PresetError>>()
                .map(Value::Map)
        }
        other => Ok(other.clone()),
    }
}

fn token(hash: &str) -> Value {
    Value::map()
        .with(BLOB_MARKER, Value::Null)
        .with("t", BLOB_TYPE_BYTES)
        .with("h", hash)
}

/// Replaces every reference token under `value` with its payload.
pub fn inject_blobs(value: &Value, blobs: &BlobTable, path: &str) -> Result<Value, PresetError> {
    match value {
        Value::Map(entries) if entries.contains_key(BLOB_MARKER) => {
            let kind = entries.get("t").and_then(Value::as_str).unwrap_or_default();
            if kind != BLOB_TYPE_BYTES {
                return Err(PresetError::UnknownBlobType {
                    path: path.to_string(),
                    kind: kind.to_string(),
                });
            }
            let hash = entries.get("h").and_then(Value::as_str).unwrap_or_default();
            blobs
                .get(hash)
                .map(|bytes| Value::Bytes(bytes.clone()))
                .ok_or_else(|| PresetError::MissingBlob {
                    hash: hash.to_string(),
                })
        }
        Value::Map(entries) => entries
            .iter()
            .map(|(key, item)| {
                Ok((key.clone(), inject_blobs(item, blobs, &format!("{path}.{key}"))?))
            })
            .collect::<Result<BTreeMap<_, _>, PresetError>>()
            .map(Value::Map),
        Value::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| inject_blobs(item, blobs, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        other => Ok(other.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_lowercase_sha256() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_identical_payloads_are_stored_once() {
        let sample = vec![7u8; 64];
        let tree = Value::map()
            .with("a", Value::map().with("sample", sample.clone()))
            .with("b", vec![Value::Bytes(sample.clone()), Value::Bytes(vec![1, 2])]);

        let (stripped, blobs) = extract_blobs(&tree, "settings").unwrap();
        assert_eq!(blobs.len(), 2);
        assert_eq!(stripped.bytes_leaf_count(), 0);
        assert_eq!(
            stripped.get("a").and_then(|a| a.get("sample")).and_then(|t| t.get("h")),
            Some(&Value::from(content_hash(&sample)))
        );

        let restored = inject_blobs(&stripped, &blobs, "settings").unwrap();
        assert_eq!(restored, tree);
    }

    #[test]
    fn test_marker_in_user_data_is_ambiguous() {
        let tree = Value::map().with(
            "unitMap",
            Value::map().with("u1", Value::map().with(BLOB_MARKER, 1)),
        );
        match extract_blobs(&tree, "settings") {
            Err(PresetError::AmbiguousData { path }) => assert_eq!(path, "settings.unitMap.u1"),
            other => panic!("expected AmbiguousData, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_and_unknown_blobs() {
        let blobs = BlobTable::new();
        let err = inject_blobs(&token("00ff"), &blobs, "settings").unwrap_err();
        assert!(matches!(err, PresetError::MissingBlob { ref hash } if hash == "00ff"));

        let odd = Value::map()
            .with(BLOB_MARKER, Value::Null)
            .with("t", "image")
            .with("h", "00ff");
        let err = inject_blobs(&vec![odd].into(), &blobs, "settings").unwrap_err();
        assert!(matches!(err, PresetError::UnknownBlobType { ref path, .. } if path == "settings[0]"));
    }
}
