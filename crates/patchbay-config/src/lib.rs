//! Presets and configuration for patchbay.
//!
//! # Features
//!
//! - **Preset codec**: encode a patch (or any unit's settings) as JSON or as a
//!   binary container with content-addressed, deduplicated blobs
//! - **Preset files**: save and load either form, sniffing on load
//! - **Runtime config**: scheduler and clock defaults from a TOML file
//! - **Paths**: platform-specific config and preset directories
//!
//! # Example
//!
//! ```rust
//! use patchbay_config::{PresetDocument, PresetFormat};
//! use patchbay_core::Value;
//!
//! let preset = PresetDocument::new(
//!     "sampler",
//!     Value::map().with("gain", 5).with("sample", vec![0u8; 1024]),
//! );
//! assert_eq!(preset.preferred_format(), PresetFormat::Container);
//!
//! let bytes = preset.encode(PresetFormat::Container).unwrap();
//! assert_eq!(PresetDocument::decode(&bytes).unwrap(), preset);
//! ```

pub mod blob;
pub mod codec;
mod error;
mod file;
pub mod json;
pub mod paths;
pub mod runtime;

pub use blob::{BLOB_MARKER, BlobTable, content_hash, extract_blobs, inject_blobs};
pub use codec::{CONTAINER_TAG, PRESET_VERSION, PresetDocument, PresetFormat};
pub use error::{ConfigError, PresetError};
pub use file::PresetFile;
pub use paths::{
    default_config_path, find_preset, list_presets_in, preset_name_from_path, user_config_dir,
    user_presets_dir,
};
pub use runtime::RuntimeConfig;
