//! Persisted shell settings and threshold entry parsing.

use crate::automation::TriggerKey;
use crate::guard::GuardConfig;
use crate::vision::template::GaugeKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Threshold used when the entry is not a usable number.
pub const DEFAULT_THRESHOLD: u32 = 10;

const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardSettings {
    pub gauge: GaugeKind,
    pub threshold_percent: u32,
    pub trigger_key: TriggerKey,
    /// Directory holding `mana_template.png` and `life_template.png`,
    /// searched before the default locations.
    pub assets_dir: Option<PathBuf>,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            gauge: GaugeKind::Mana,
            threshold_percent: DEFAULT_THRESHOLD,
            trigger_key: TriggerKey::Esc,
            assets_dir: None,
        }
    }
}

impl GuardSettings {
    pub fn config(&self) -> GuardConfig {
        GuardConfig {
            gauge: self.gauge,
            threshold_percent: self.threshold_percent,
            trigger_key: self.trigger_key,
        }
    }

    /// Default location: `<config dir>/orb_guard/settings.json`, or the
    /// working directory when the platform has no config dir.
    pub fn default_path() -> PathBuf {
        match dirs::config_dir() {
            Some(dir) => dir.join("orb_guard").join(SETTINGS_FILE),
            None => PathBuf::from(SETTINGS_FILE),
        }
    }

    /// Load settings, falling back to defaults on any problem.
    pub fn load(path: &Path) -> Self {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) => {
                log::debug!("No settings at {:?} ({}), using defaults", path, e);
                return Self::default();
            }
        };
        match serde_json::from_str(&json) {
            Ok(settings) => {
                log::info!("Settings loaded from {:?}", path);
                settings
            }
            Err(e) => {
                log::warn!("Ignoring malformed settings {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Result of parsing the threshold entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdInput {
    pub percent: u32,
    /// The entry was replaced and should be written back to the user.
    pub corrected: bool,
}

/// Parse a user-entered threshold percentage.
///
/// Non-numeric or negative input becomes [`DEFAULT_THRESHOLD`]; values above
/// 100 are clamped. Either way `corrected` is set.
pub fn parse_threshold(input: &str) -> ThresholdInput {
    match input.trim().parse::<i64>() {
        Ok(value) if value < 0 => ThresholdInput {
            percent: DEFAULT_THRESHOLD,
            corrected: true,
        },
        Ok(value) if value > 100 => ThresholdInput {
            percent: 100,
            corrected: true,
        },
        Ok(value) => ThresholdInput {
            percent: value as u32,
            corrected: input != value.to_string(),
        },
        Err(_) => ThresholdInput {
            percent: DEFAULT_THRESHOLD,
            corrected: true,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_numbers_pass_through() {
        assert_eq!(parse_threshold("25"), ThresholdInput { percent: 25, corrected: false });
        assert_eq!(parse_threshold("0"), ThresholdInput { percent: 0, corrected: false });
        assert_eq!(parse_threshold("100"), ThresholdInput { percent: 100, corrected: false });
    }

    #[test]
    fn garbage_falls_back_to_default() {
        for input in ["", "abc", "12.5", "ten"] {
            assert_eq!(
                parse_threshold(input),
                ThresholdInput { percent: DEFAULT_THRESHOLD, corrected: true },
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn out_of_range_is_corrected() {
        assert_eq!(parse_threshold("-5"), ThresholdInput { percent: 10, corrected: true });
        assert_eq!(parse_threshold("250"), ThresholdInput { percent: 100, corrected: true });
    }

    #[test]
    fn whitespace_is_trimmed_and_reflected() {
        assert_eq!(parse_threshold(" 15 "), ThresholdInput { percent: 15, corrected: true });
        assert_eq!(parse_threshold("015"), ThresholdInput { percent: 15, corrected: true });
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: GuardSettings = serde_json::from_str(r#"{"gauge":"life"}"#).unwrap();
        assert_eq!(settings.gauge, GaugeKind::Life);
        assert_eq!(settings.threshold_percent, DEFAULT_THRESHOLD);
        assert_eq!(settings.trigger_key, TriggerKey::Esc);
        assert_eq!(settings.assets_dir, None);
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir()
            .join(format!("orb_guard_settings_{}", std::process::id()))
            .join("settings.json");
        let settings = GuardSettings {
            gauge: GaugeKind::Life,
            threshold_percent: 35,
            trigger_key: TriggerKey::F9,
            assets_dir: Some(PathBuf::from("/opt/orbs")),
        };
        settings.save(&path).unwrap();
        assert_eq!(GuardSettings::load(&path), settings);
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn malformed_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("orb_guard_bad_{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(GuardSettings::load(&path), GuardSettings::default());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn config_mirrors_settings() {
        let settings = GuardSettings {
            threshold_percent: 42,
            ..GuardSettings::default()
        };
        assert_eq!(settings.config().threshold_percent, 42);
        assert_eq!(settings.config().gauge, GaugeKind::Mana);
    }
}
