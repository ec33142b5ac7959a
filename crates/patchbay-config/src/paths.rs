//! Platform-specific paths for presets and configuration.
//!
//! - **User config**: `~/.config/patchbay/` (Linux), `~/Library/Application Support/patchbay/` (macOS), `%APPDATA%\patchbay\` (Windows)
//! - **User presets**: `<user config>/presets/`

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Application name used for directory paths.
const APP_NAME: &str = "patchbay";

/// Subdirectory name for presets.
const PRESETS_SUBDIR: &str = "presets";

/// File name of the runtime configuration.
pub const CONFIG_FILE: &str = "config.toml";

/// Extensions recognized as presets.
pub const PRESET_EXTENSIONS: [&str; 2] = ["json", "patch"];

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the user-specific presets directory.
pub fn user_presets_dir() -> PathBuf {
    user_config_dir().join(PRESETS_SUBDIR)
}

/// Default location of the runtime configuration file.
pub fn default_config_path() -> PathBuf {
    user_config_dir().join(CONFIG_FILE)
}

/// Creates `dir` and its parents if missing.
pub fn ensure_dir(dir: &Path) -> Result<(), ConfigError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::create_dir(dir, e))?;
    }
    Ok(())
}

/// Returns true if `path` has a preset extension.
pub fn is_preset_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| PRESET_EXTENSIONS.contains(&e))
}

/// List preset files in a directory, sorted by path.
///
/// Returns an empty vector if the directory doesn't exist or can't be read.
pub fn list_presets_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut presets: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_preset_file(path))
        .collect();
    presets.sort();
    presets
}

/// Find a preset by file path or by name inside `dir`.
///
/// Names may omit the extension; `.patch` is tried before `.json`.
pub fn find_preset(name: &str, dir: &Path) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }
    let candidate = dir.join(name);
    if candidate.is_file() {
        return Some(candidate);
    }
    PRESET_EXTENSIONS
        .iter()
        .rev()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .find(|p| p.is_file())
}

/// Get the preset name (file stem) from a path.
pub fn preset_name_from_path(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_user_dirs_end_with_app_name() {
        assert!(user_config_dir().ends_with(APP_NAME));
        assert!(user_presets_dir().ends_with("patchbay/presets"));
        assert!(default_config_path().ends_with("patchbay/config.toml"));
    }

    #[test]
    fn test_list_and_find() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.json"), "{}").unwrap();
        std::fs::write(dir.path().join("a.patch"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let presets = list_presets_in(dir.path());
        let names: Vec<String> = presets.iter().filter_map(|p| preset_name_from_path(p)).collect();
        assert_eq!(names, vec!["a", "b"]);

        assert_eq!(find_preset("a", dir.path()), Some(dir.path().join("a.patch")));
        assert_eq!(find_preset("b.json", dir.path()), Some(dir.path().join("b.json")));
        assert_eq!(find_preset("notes", dir.path()), None);
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        assert!(list_presets_in(Path::new("/nonexistent/patchbay/presets")).is_empty());
    }

    #[test]
    fn test_ensure_dir_creates_parents() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("x").join("y");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
