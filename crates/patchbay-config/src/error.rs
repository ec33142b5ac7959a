//! Error types for preset and configuration operations.

use std::path::PathBuf;

use patchbay_graph::PatchError;
use thiserror::Error;

/// Errors raised while encoding, decoding, reading or writing presets.
#[derive(Debug, Error)]
pub enum PresetError {
    /// User settings already contain the reserved blob marker key.
    #[error("settings at '{path}' already use the reserved '@blob' key")]
    AmbiguousData {
        /// Location of the offending map, e.g. `settings.unitMap.u1.settings`.
        path: String,
    },

    /// A blob reference names a hash with no stored payload.
    #[error("preset references missing blob {hash}")]
    MissingBlob {
        /// Lowercase hex content hash.
        hash: String,
    },

    /// A blob reference carries an unknown payload type tag.
    #[error("unknown blob type '{kind}' at '{path}'")]
    UnknownBlobType {
        /// Location of the reference token.
        path: String,
        /// The `t` tag found.
        kind: String,
    },

    /// The binary container framing is broken.
    #[error("malformed preset container: {0}")]
    MalformedContainer(String),

    /// The preset was written by an incompatible format version.
    #[error("unsupported preset version {found} (expected {expected})")]
    VersionMismatch {
        /// Version found in the file.
        found: String,
        /// Version this build reads.
        expected: u32,
    },

    /// The settings tree holds a value JSON cannot represent.
    #[error("cannot serialize value at '{path}': {reason}")]
    Unserializable {
        /// Location of the value.
        path: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The preset's root unit is not a patch.
    #[error("preset root '{0}' is not a patch")]
    NotAPatch(String),

    /// Blob-bearing presets only fit the binary container.
    #[error("preset holds {0} blob(s); use the binary container")]
    BlobsNeedContainer(usize),

    /// JSON parse or shape error.
    #[error("invalid preset JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The decoded patch could not be mounted.
    #[error(transparent)]
    Patch(#[from] PatchError),

    /// Failed to read a preset file.
    #[error("failed to read preset '{path}': {source}")]
    ReadFile {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a preset file.
    #[error("failed to write preset '{path}': {source}")]
    WriteFile {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl PresetError {
    /// Returns true for the errors that mean the stored preset itself is
    /// damaged: missing blobs, broken framing, unknown versions.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            PresetError::MissingBlob { .. }
                | PresetError::UnknownBlobType { .. }
                | PresetError::MalformedContainer(_)
                | PresetError::VersionMismatch { .. }
        )
    }

    pub(crate) fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PresetError::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PresetError::WriteFile {
            path: path.into(),
            source,
        }
    }
}

/// Errors raised while loading or saving the runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A value is out of range
    #[error("invalid setting '{field}': {reason}")]
    Invalid {
        /// Dotted key, e.g. `scheduler.poll_interval_ms`.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }
}
