use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GameError, Result};
use crate::input::GestureMapper;

/// Largest value a gesture or call domain may hold.
pub const MAX_DOMAIN_VALUE: u32 = 100;

/// Closed interval of spoken call values the number extractor accepts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallRange {
    pub min: u32,
    pub max: u32,
}

impl CallRange {
    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl Default for CallRange {
    fn default() -> Self {
        Self { min: 0, max: 5 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub target_valid_rounds: u32,
    pub ready_delay_ms: u64,
    pub round_timeout_ms: u64,
    pub stillness_ms: u64,
    pub result_pause_ms: u64,
    pub call_range: CallRange,
    pub call_domain: Vec<u32>,
    pub gesture_domain: Vec<u32>,
    pub gesture_confidence: f32,
    pub history_len: usize,
    pub voice_commands: bool,
    pub record_results: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            target_valid_rounds: 5,
            ready_delay_ms: 3000,
            round_timeout_ms: 15000,
            stillness_ms: 1000,
            result_pause_ms: 2000,
            call_range: CallRange::default(),
            call_domain: vec![15, 20],
            gesture_domain: vec![0, 5],
            gesture_confidence: 0.5,
            history_len: 3,
            voice_commands: true,
            record_results: false,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_valid_rounds == 0 {
            return Err(GameError::Config(
                "target_valid_rounds must be at least 1".into(),
            ));
        }
        if self.call_range.min > self.call_range.max {
            return Err(GameError::Config(format!(
                "call_range is inverted: {}..={}",
                self.call_range.min, self.call_range.max
            )));
        }
        if self.call_domain.is_empty() {
            return Err(GameError::Config("call_domain must not be empty".into()));
        }
        if self.gesture_domain.is_empty() {
            return Err(GameError::Config("gesture_domain must not be empty".into()));
        }
        if let Some(v) = self
            .gesture_domain
            .iter()
            .chain(&self.call_domain)
            .find(|v| **v > MAX_DOMAIN_VALUE)
        {
            return Err(GameError::Config(format!(
                "domain value {} exceeds {}",
                v, MAX_DOMAIN_VALUE
            )));
        }
        if let Some(v) = GestureMapper::VALUES
            .iter()
            .find(|v| !self.gesture_domain.contains(*v))
        {
            return Err(GameError::Config(format!(
                "gesture_domain must contain {} to accept recognized gestures",
                v
            )));
        }
        if self.history_len == 0 {
            return Err(GameError::Config("history_len must be at least 1".into()));
        }
        Ok(())
    }

    pub fn ready_delay(&self) -> Duration {
        Duration::from_millis(self.ready_delay_ms)
    }

    pub fn round_timeout(&self) -> Duration {
        Duration::from_millis(self.round_timeout_ms)
    }

    pub fn stillness(&self) -> Duration {
        Duration::from_millis(self.stillness_ms)
    }

    pub fn result_pause(&self) -> Duration {
        Duration::from_millis(self.result_pause_ms)
    }
}

pub trait ConfigStore {
    fn load(&self) -> GameConfig;
    fn save(&self, cfg: &GameConfig) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "fifteen-twenty") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("fifteen_twenty_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> GameConfig {
        if let Ok(bytes) = fs::read(&self.path) {
            match serde_json::from_slice::<GameConfig>(&bytes) {
                Ok(cfg) => return cfg,
                Err(e) => log::warn!(
                    "ignoring unreadable config {}: {}",
                    self.path.display(),
                    e
                ),
            }
        }
        GameConfig::default()
    }

    fn save(&self, cfg: &GameConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = GameConfig::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("absent.json"));
        assert_eq!(store.load(), GameConfig::default());
    }

    #[test]
    fn partial_file_fills_remaining_fields_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{"target_valid_rounds": 3, "stillness_ms": 10}"#).unwrap();
        let loaded = FileConfigStore::with_path(&path).load();
        assert_eq!(loaded.target_valid_rounds, 3);
        assert_eq!(loaded.stillness_ms, 10);
        assert_eq!(loaded.round_timeout_ms, 15000);
        assert_eq!(loaded.call_domain, vec![15, 20]);
    }

    #[test]
    fn garbage_file_loads_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), GameConfig::default());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_domains_and_bad_ranges() {
        let cfg = GameConfig {
            gesture_domain: vec![],
            ..GameConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(GameError::Config(_))));

        let cfg = GameConfig {
            call_domain: vec![],
            ..GameConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = GameConfig {
            call_range: CallRange { min: 6, max: 2 },
            ..GameConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = GameConfig {
            target_valid_rounds: 0,
            ..GameConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_domain_values() {
        let cfg = GameConfig {
            gesture_domain: vec![0, 5, u32::MAX],
            ..GameConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(GameError::Config(msg)) if msg.contains("exceeds")));

        let cfg = GameConfig {
            call_domain: vec![15, 101],
            ..GameConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = GameConfig {
            gesture_domain: vec![0, 5, 100],
            call_domain: vec![100],
            ..GameConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_requires_recognizable_gestures_in_domain() {
        let cfg = GameConfig {
            gesture_domain: vec![0, 10],
            ..GameConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(GameError::Config(msg)) if msg.contains("contain 5")));

        let cfg = GameConfig {
            gesture_domain: vec![5],
            ..GameConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = GameConfig {
            gesture_domain: vec![0, 5, 10],
            ..GameConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn call_range_is_inclusive() {
        let range = CallRange::default();
        assert!(range.contains(0));
        assert!(range.contains(5));
        assert!(!range.contains(6));
    }
}
