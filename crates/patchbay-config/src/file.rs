//! Preset files on disk.

use std::path::{Path, PathBuf};

use crate::codec::{PresetDocument, PresetFormat};
use crate::error::PresetError;

/// A preset file location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetFile {
    path: PathBuf,
}

impl PresetFile {
    /// Points at `path`; nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the JSON form. Fails for presets carrying blobs.
    pub fn save_json(&self, preset: &PresetDocument) -> Result<(), PresetError> {
        self.write(preset, PresetFormat::Json)
    }

    /// Writes the binary container form.
    pub fn save_binary(&self, preset: &PresetDocument) -> Result<(), PresetError> {
        self.write(preset, PresetFormat::Container)
    }

    /// Writes whichever form the preset needs.
    pub fn save(&self, preset: &PresetDocument) -> Result<PresetFormat, PresetError> {
        let format = preset.preferred_format();
        self.write(preset, format)?;
        Ok(format)
    }

    fn write(&self, preset: &PresetDocument, format: PresetFormat) -> Result<(), PresetError> {
        let bytes = preset.encode(format)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| PresetError::write_file(parent, e))?;
        }
        std::fs::write(&self.path, &bytes).map_err(|e| PresetError::write_file(&self.path, e))?;
        tracing::info!(
            path = %self.path.display(),
            format = ?format,
            size = bytes.len(),
            "preset saved"
        );
        Ok(())
    }

    /// Reads either form.
    pub fn load(&self) -> Result<PresetDocument, PresetError> {
        let bytes = std::fs::read(&self.path).map_err(|e| PresetError::read_file(&self.path, e))?;
        let preset = PresetDocument::decode(&bytes)?;
        tracing::info!(
            path = %self.path.display(),
            root = preset.root_type_id.as_str(),
            "preset loaded"
        );
        Ok(preset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_core::Value;
    use tempfile::TempDir;

    #[test]
    fn test_save_picks_format() {
        let dir = TempDir::new().unwrap();

        let plain = PresetDocument::new("clock", Value::map().with("tempo", 100.0));
        let file = PresetFile::new(dir.path().join("clock.json"));
        assert_eq!(file.save(&plain).unwrap(), PresetFormat::Json);
        assert!(std::fs::read_to_string(file.path()).unwrap().starts_with('{'));
        assert_eq!(file.load().unwrap(), plain);

        let heavy = PresetDocument::new("sampler", Value::map().with("sample", vec![1u8; 16]));
        let file = PresetFile::new(dir.path().join("sub").join("sampler.patch"));
        assert_eq!(file.save(&heavy).unwrap(), PresetFormat::Container);
        assert_eq!(file.load().unwrap(), heavy);
    }

    #[test]
    fn test_save_json_refuses_blobs() {
        let dir = TempDir::new().unwrap();
        let heavy = PresetDocument::new("sampler", Value::map().with("sample", vec![1u8; 16]));
        let file = PresetFile::new(dir.path().join("sampler.json"));
        assert!(matches!(
            file.save_json(&heavy),
            Err(PresetError::BlobsNeedContainer(1))
        ));
        assert!(!file.path().exists());
    }

    #[test]
    fn test_binary_holds_blob_free_presets_too() {
        let dir = TempDir::new().unwrap();
        let plain = PresetDocument::new("gain", Value::map().with("gain", 0.25));
        let file = PresetFile::new(dir.path().join("gain.patch"));
        file.save_binary(&plain).unwrap();
        assert_eq!(file.load().unwrap(), plain);
    }

    #[test]
    fn test_missing_file() {
        let err = PresetFile::new("/nonexistent/x.patch").load().unwrap_err();
        assert!(matches!(err, PresetError::ReadFile { .. }));
    }
}
