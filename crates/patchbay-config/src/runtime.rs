//! Runtime configuration file.
//!
//! ```toml
//! [scheduler]
//! poll_interval_ms = 50
//! buffer_depth_ms = 300
//!
//! [clock]
//! default_tempo = 120.0
//! min_tempo = 10.0
//! lead_in_ms = 100
//!
//! [presets]
//! directory = "/home/me/patches"
//! ```
//!
//! Every key is optional; missing keys take the defaults above.

use std::path::{Path, PathBuf};

use patchbay_core::SchedulerConfig;
use patchbay_units::ClockConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths;

/// `[scheduler]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    /// Milliseconds between polls.
    pub poll_interval_ms: u64,
    /// Milliseconds of lookahead buffered per poll.
    pub buffer_depth_ms: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            buffer_depth_ms: 300,
        }
    }
}

/// `[clock]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSection {
    /// Tempo of clocks created without one, in BPM.
    pub default_tempo: f64,
    /// Lowest tempo a clock accepts, in BPM.
    pub min_tempo: f64,
    /// Delay of the first tick after a clock starts.
    pub lead_in_ms: u64,
}

impl Default for ClockSection {
    fn default() -> Self {
        Self {
            default_tempo: 120.0,
            min_tempo: 10.0,
            lead_in_ms: 100,
        }
    }
}

/// `[presets]` section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetsSection {
    /// Overrides the platform presets directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

/// Host-wide settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Lookahead scheduler timing.
    pub scheduler: SchedulerSection,
    /// Clock unit defaults.
    pub clock: ClockSection,
    /// Preset storage.
    pub presets: PresetsSection,
}

impl RuntimeConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Load from the platform config directory.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(paths::default_config_path())
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Convert to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }
        std::fs::write(path, self.to_toml()?).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Rejects values the scheduler or clocks cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        if s.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "scheduler.poll_interval_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if s.buffer_depth_ms <= s.poll_interval_ms {
            return Err(ConfigError::Invalid {
                field: "scheduler.buffer_depth_ms",
                reason: format!(
                    "must exceed the poll interval ({} ms), got {} ms",
                    s.poll_interval_ms, s.buffer_depth_ms
                ),
            });
        }
        let c = &self.clock;
        if !(c.min_tempo.is_finite() && c.min_tempo > 0.0) {
            return Err(ConfigError::Invalid {
                field: "clock.min_tempo",
                reason: "must be positive".into(),
            });
        }
        if !(c.default_tempo.is_finite() && c.default_tempo > 0.0) {
            return Err(ConfigError::Invalid {
                field: "clock.default_tempo",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }

    /// Scheduler timing in seconds.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            poll_interval: self.scheduler.poll_interval_ms as f64 / 1000.0,
            buffer_depth: self.scheduler.buffer_depth_ms as f64 / 1000.0,
        }
    }

    /// Clock defaults in seconds and BPM.
    pub fn clock_config(&self) -> ClockConfig {
        ClockConfig {
            default_tempo: self.clock.default_tempo,
            min_tempo: self.clock.min_tempo,
            lead_in: self.clock.lead_in_ms as f64 / 1000.0,
        }
    }

    /// Directory presets are listed from.
    pub fn presets_dir(&self) -> PathBuf {
        self.presets
            .directory
            .clone()
            .unwrap_or_else(paths::user_presets_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_engine_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.scheduler_config(), SchedulerConfig::default());
        assert_eq!(config.clock_config(), ClockConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = RuntimeConfig::from_toml("[clock]\ndefault_tempo = 90.0\n").unwrap();
        assert_eq!(config.clock.default_tempo, 90.0);
        assert_eq!(config.clock.min_tempo, 10.0);
        assert_eq!(config.scheduler.poll_interval_ms, 50);
    }

    #[test]
    fn test_validation_rejects_bad_timing() {
        assert!(matches!(
            RuntimeConfig::from_toml("[scheduler]\npoll_interval_ms = 0\n"),
            Err(ConfigError::Invalid { field: "scheduler.poll_interval_ms", .. })
        ));
        assert!(matches!(
            RuntimeConfig::from_toml("[scheduler]\npoll_interval_ms = 100\nbuffer_depth_ms = 100\n"),
            Err(ConfigError::Invalid { field: "scheduler.buffer_depth_ms", .. })
        ));
        assert!(matches!(
            RuntimeConfig::from_toml("[clock]\nmin_tempo = -1.0\n"),
            Err(ConfigError::Invalid { field: "clock.min_tempo", .. })
        ));
        assert!(matches!(
            RuntimeConfig::from_toml("[clock]\ndefault_tempo = 0.0\n"),
            Err(ConfigError::Invalid { field: "clock.default_tempo", .. })
        ));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = RuntimeConfig::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = RuntimeConfig::default();
        config.scheduler.buffer_depth_ms = 500;
        config.presets.directory = Some(dir.path().join("presets"));
        config.save(&path).unwrap();

        let loaded = RuntimeConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.presets_dir(), dir.path().join("presets"));
        assert_eq!(loaded.scheduler_config().buffer_depth, 0.5);
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            RuntimeConfig::from_toml("[scheduler\n"),
            Err(ConfigError::TomlParse(_))
        ));
    }
}
