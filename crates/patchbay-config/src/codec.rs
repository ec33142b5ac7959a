//! Preset codec.
//!
//! A [`PresetDocument`] pairs a root unit type with that unit's settings.
//! For a whole patch the root is a `rack` and the settings are the patch
//! document, so nested racks ride along inside it.
//!
//! Two encodings exist:
//!
//! - **JSON**, for presets without binary payloads:
//!   `{ "presetVersion": 1, "rootTypeId": ..., "settings": ... }`
//! - **Container**, for presets carrying blobs:
//!
//! ```text
//! patchbay-preset 1\n
//! { "rootTypeId": ..., "settings": ..., "blobIndex": { hash: { offset, length } } }\n
//! <blob bytes, ascending hash order>
//! ```
//!
//! Blob offsets are relative to the first byte after the second newline.

use std::collections::BTreeMap;

use patchbay_core::Value;
use patchbay_graph::{PatchDocument, PatchGraph, RACK_TYPE_ID};
use serde::{Deserialize, Serialize};

use crate::blob::{BlobTable, content_hash, extract_blobs, inject_blobs};
use crate::error::PresetError;
use crate::json::check_serializable;

/// Envelope version written and accepted.
pub const PRESET_VERSION: u32 = 1;

/// First line of the binary container.
pub const CONTAINER_TAG: &str = "patchbay-preset";

const SETTINGS_PATH: &str = "settings";

/// Which encoding a preset uses on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetFormat {
    /// Single JSON object.
    Json,
    /// Tag line, index line, raw blobs.
    Container,
}

impl PresetFormat {
    /// Guesses the format from the first bytes of an encoded preset.
    pub fn sniff(bytes: &[u8]) -> Self {
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => PresetFormat::Json,
            _ => PresetFormat::Container,
        }
    }

    /// Conventional file extension.
    pub const fn extension(&self) -> &'static str {
        match self {
            PresetFormat::Json => "json",
            PresetFormat::Container => "patch",
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonEnvelope {
    preset_version: u32,
    root_type_id: String,
    settings: Value,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContainerIndex {
    root_type_id: String,
    settings: Value,
    #[serde(default)]
    blob_index: BTreeMap<String, BlobSpan>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct BlobSpan {
    offset: u64,
    length: u64,
}

/// A root unit type and its settings, binary payloads inline.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetDocument {
    /// Type id of the unit the settings belong to.
    pub root_type_id: String,
    /// Settings tree; may contain [`Value::Bytes`] leaves.
    pub settings: Value,
}

impl PresetDocument {
    /// Creates a preset for one unit.
    pub fn new(root_type_id: impl Into<String>, settings: Value) -> Self {
        Self {
            root_type_id: root_type_id.into(),
            settings,
        }
    }

    /// Snapshots a whole graph as a rack preset.
    pub fn from_graph(graph: &PatchGraph) -> Self {
        Self::new(RACK_TYPE_ID, graph.save().to_value())
    }

    /// The patch document, if the root is a rack.
    pub fn patch(&self) -> Result<PatchDocument, PresetError> {
        if self.root_type_id != RACK_TYPE_ID {
            return Err(PresetError::NotAPatch(self.root_type_id.clone()));
        }
        Ok(PatchDocument::from_value(&self.settings)?)
    }

    /// Loads the patch into `graph`. On error the graph is unchanged.
    pub fn mount(&self, graph: &mut PatchGraph) -> Result<(), PresetError> {
        graph.load(&self.patch()?)?;
        Ok(())
    }

    /// Number of distinct binary payloads in the settings.
    pub fn blob_count(&self) -> Result<usize, PresetError> {
        Ok(extract_blobs(&self.settings, SETTINGS_PATH)?.1.len())
    }

    /// The smallest encoding that can hold this preset.
    pub fn preferred_format(&self) -> PresetFormat {
        if self.settings.bytes_leaf_count() == 0 {
            PresetFormat::Json
        } else {
            PresetFormat::Container
        }
    }

    // --- JSON ---

    /// Encodes as JSON. Fails if the settings hold binary payloads.
    pub fn to_json(&self) -> Result<String, PresetError> {
        let (settings, blobs) = extract_blobs(&self.settings, SETTINGS_PATH)?;
        if !blobs.is_empty() {
            return Err(PresetError::BlobsNeedContainer(blobs.len()));
        }
        check_serializable(&settings, SETTINGS_PATH)?;
        let envelope = JsonEnvelope {
            preset_version: PRESET_VERSION,
            root_type_id: self.root_type_id.clone(),
            settings,
        };
        Ok(serde_json::to_string_pretty(&envelope)?)
    }

    /// Decodes the JSON form.
    pub fn from_json(text: &str) -> Result<Self, PresetError> {
        let raw: serde_json::Value = serde_json::from_str(text)?;
        match raw.get("presetVersion") {
            Some(v) if v.as_u64() == Some(u64::from(PRESET_VERSION)) => {}
            found => {
                return Err(PresetError::VersionMismatch {
                    found: found.map_or_else(|| "none".to_string(), ToString::to_string),
                    expected: PRESET_VERSION,
                });
            }
        }
        let envelope: JsonEnvelope = serde_json::from_value(raw)?;
        let settings = inject_blobs(&envelope.settings, &BlobTable::new(), SETTINGS_PATH)?;
        Ok(Self::new(envelope.root_type_id, settings))
    }

    // --- Container ---

    /// Encodes as a binary container.
    pub fn to_container(&self) -> Result<Vec<u8>, PresetError> {
        let (settings, blobs) = extract_blobs(&self.settings, SETTINGS_PATH)?;

        let mut blob_index = BTreeMap::new();
        let mut offset = 0u64;
        for (hash, bytes) in &blobs {
            let length = bytes.len() as u64;
            blob_index.insert(hash.clone(), BlobSpan { offset, length });
            offset += length;
        }
        check_serializable(&settings, SETTINGS_PATH)?;
        let index = ContainerIndex {
            root_type_id: self.root_type_id.clone(),
            settings,
            blob_index,
        };

        let mut out = format!("{CONTAINER_TAG} {PRESET_VERSION}\n").into_bytes();
        serde_json::to_writer(&mut out, &index)?;
        out.push(b'\n');
        for bytes in blobs.values() {
            out.extend_from_slice(bytes);
        }
        tracing::debug!(blobs = blobs.len(), size = out.len(), "preset container encoded");
        Ok(out)
    }

    /// Decodes a binary container.
    pub fn from_container(bytes: &[u8]) -> Result<Self, PresetError> {
        let (tag, rest) = split_line(bytes)
            .ok_or_else(|| PresetError::MalformedContainer("missing version line".into()))?;
        let tag = std::str::from_utf8(tag)
            .map_err(|_| PresetError::MalformedContainer("version line is not UTF-8".into()))?;
        match tag.trim_end().split_once(' ') {
            Some((CONTAINER_TAG, version)) if version == PRESET_VERSION.to_string() => {}
            Some((CONTAINER_TAG, version)) => {
                return Err(PresetError::VersionMismatch {
                    found: version.to_string(),
                    expected: PRESET_VERSION,
                });
            }
            _ => {
                return Err(PresetError::MalformedContainer(format!(
                    "unrecognized version line '{tag}'"
                )));
            }
        }

        let (index, body) = split_line(rest)
            .ok_or_else(|| PresetError::MalformedContainer("missing index line".into()))?;
        let index: ContainerIndex = serde_json::from_slice(index)
            .map_err(|err| PresetError::MalformedContainer(format!("bad index line: {err}")))?;

        let mut blobs = BlobTable::new();
        for (hash, span) in &index.blob_index {
            let bytes = slice(body, *span).ok_or_else(|| {
                PresetError::MalformedContainer(format!(
                    "blob {hash} at {}+{} runs past the end ({} bytes)",
                    span.offset,
                    span.length,
                    body.len()
                ))
            })?;
            if content_hash(bytes) != *hash {
                return Err(PresetError::MalformedContainer(format!(
                    "blob {hash} does not match its content"
                )));
            }
            blobs.insert(hash.clone(), bytes.to_vec());
        }

        let settings = inject_blobs(&index.settings, &blobs, SETTINGS_PATH)?;
        tracing::debug!(blobs = blobs.len(), "preset container decoded");
        Ok(Self::new(index.root_type_id, settings))
    }

    // --- Either ---

    /// Encodes in the requested format.
    pub fn encode(&self, format: PresetFormat) -> Result<Vec<u8>, PresetError> {
        match format {
            PresetFormat::Json => self.to_json().map(String::into_bytes),
            PresetFormat::Container => self.to_container(),
        }
    }

    /// Decodes either format, picking by the first byte.
    pub fn decode(bytes: &[u8]) -> Result<Self, PresetError> {
        match PresetFormat::sniff(bytes) {
            PresetFormat::Json => {
                let text = std::str::from_utf8(bytes)
                    .map_err(|_| PresetError::MalformedContainer("JSON preset is not UTF-8".into()))?;
                Self::from_json(text)
            }
            PresetFormat::Container => Self::from_container(bytes),
        }
    }
}

fn split_line(bytes: &[u8]) -> Option<(&[u8], &[u8])> {
    let end = bytes.iter().position(|&b| b == b'\n')?;
    Some((&bytes[..end], &bytes[end + 1..]))
}

fn slice(body: &[u8], span: BlobSpan) -> Option<&[u8]> {
    let start = usize::try_from(span.offset).ok()?;
    let end = start.checked_add(usize::try_from(span.length).ok()?)?;
    body.get(start..end)
}
