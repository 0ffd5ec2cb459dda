// src/config.rs - Tracker settings and live configuration channel
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::filter::FilterParams;
use crate::tracker::SlotPolicy;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Ticks per second.
    #[serde(default = "default_update_rate")]
    pub update_rate: u32,
    #[serde(default = "default_process_noise")]
    pub process_noise: f64,
    #[serde(default = "default_observation_noise")]
    pub observation_noise: f64,
    /// Variance a joint filter is seeded with on acquisition.
    #[serde(default)]
    pub initial_uncertainty: f64,
    /// Added to every slot index before frames reach the rig.
    #[serde(default)]
    pub body_offset: u32,
    /// Forwarded to the rig; the tracker itself ignores it.
    #[serde(default)]
    pub insert_keyframes: bool,
    /// Rotate observations into the floor frame when the sensor reports one.
    #[serde(default = "default_align_to_floor")]
    pub align_to_floor: bool,
    #[serde(default)]
    pub slot_policy: SlotPolicy,
}

fn default_update_rate() -> u32 {
    60
}

fn default_process_noise() -> f64 {
    1.0
}

fn default_observation_noise() -> f64 {
    0.02
}

fn default_align_to_floor() -> bool {
    true
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            update_rate: default_update_rate(),
            process_noise: default_process_noise(),
            observation_noise: default_observation_noise(),
            initial_uncertainty: 0.0,
            body_offset: 0,
            insert_keyframes: false,
            align_to_floor: default_align_to_floor(),
            slot_policy: SlotPolicy::default(),
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_rate < 1 {
            return Err(ConfigError::InvalidUpdateRate(self.update_rate));
        }
        // written as !(x > 0) so NaN is rejected too
        if !(self.process_noise > 0.0) {
            return Err(ConfigError::NonPositiveNoise {
                name: "process_noise",
                value: self.process_noise,
            });
        }
        if !(self.observation_noise > 0.0) {
            return Err(ConfigError::NonPositiveNoise {
                name: "observation_noise",
                value: self.observation_noise,
            });
        }
        if !(self.initial_uncertainty >= 0.0) {
            return Err(ConfigError::NegativeUncertainty(self.initial_uncertainty));
        }
        Ok(())
    }

    pub fn filter_params(&self) -> FilterParams {
        FilterParams {
            process_noise: self.process_noise,
            observation_noise: self.observation_noise,
            initial_uncertainty: self.initial_uncertainty,
        }
    }

    /// Delay until the next tick.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.update_rate.max(1)))
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: TrackerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Loads `path`, falling back to defaults when it is missing or invalid.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring config file");
                Self::default()
            }
        }
    }

    /// Per-user config location, e.g. `~/.config/skeletal-stream/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "skeletal-stream")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }
}

/// Owner side of the live configuration.
///
/// The tracking loop holds a receiver and borrows the latest value at the
/// start of every tick, so changes land on the next tick without a restart.
pub struct ConfigHandle {
    tx: watch::Sender<TrackerConfig>,
}

impl ConfigHandle {
    pub fn new(config: TrackerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (tx, _rx) = watch::channel(config);
        Ok(Self { tx })
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerConfig> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> TrackerConfig {
        self.tx.borrow().clone()
    }

    /// Publishes `config` if it is valid; an invalid one leaves the live value untouched.
    pub fn set(&self, config: TrackerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.tx.send_replace(config);
        Ok(())
    }

    pub fn modify(&self, f: impl FnOnce(&mut TrackerConfig)) -> Result<(), ConfigError> {
        let mut config = self.current();
        f(&mut config);
        self.set(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.update_rate, 60);
        assert_eq!(config.process_noise, 1.0);
        assert_eq!(config.observation_noise, 0.02);
        assert_eq!(config.body_offset, 0);
        assert!(!config.insert_keyframes);
        assert_eq!(config.slot_policy, SlotPolicy::Compact);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            TrackerConfig::from_json(r#"{ "update_rate": 30, "slot_policy": "hold" }"#).unwrap();
        assert_eq!(config.update_rate, 30);
        assert_eq!(config.slot_policy, SlotPolicy::Hold);
        assert_eq!(config.observation_noise, 0.02);
        assert!(config.align_to_floor);
    }

    #[test]
    fn test_validation() {
        let bad_rate = TrackerConfig {
            update_rate: 0,
            ..Default::default()
        };
        assert!(matches!(bad_rate.validate(), Err(ConfigError::InvalidUpdateRate(0))));

        let bad_noise = TrackerConfig {
            observation_noise: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            bad_noise.validate(),
            Err(ConfigError::NonPositiveNoise { name: "observation_noise", .. })
        ));

        let nan_noise = TrackerConfig {
            process_noise: f64::NAN,
            ..Default::default()
        };
        assert!(nan_noise.validate().is_err());

        let bad_seed = TrackerConfig {
            initial_uncertainty: -0.5,
            ..Default::default()
        };
        assert!(matches!(bad_seed.validate(), Err(ConfigError::NegativeUncertainty(_))));

        assert!(matches!(
            TrackerConfig::from_json(r#"{ "process_noise": -1 }"#),
            Err(ConfigError::NonPositiveNoise { .. })
        ));
        assert!(matches!(TrackerConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_tick_interval() {
        let config = TrackerConfig {
            update_rate: 50,
            ..Default::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(20));
    }

    #[test]
    fn test_load_from_file() {
        let name = format!("skeletal_stream_{}.json", uuid::Uuid::new_v4());
        let path = std::env::temp_dir().join(name);
        fs::write(&path, r#"{ "body_offset": 2, "insert_keyframes": true }"#).unwrap();

        let config = TrackerConfig::load(&path).unwrap();
        assert_eq!(config.body_offset, 2);
        assert!(config.insert_keyframes);

        let _ = fs::remove_file(&path);
        assert!(matches!(TrackerConfig::load(&path), Err(ConfigError::Io { .. })));
        assert_eq!(
            TrackerConfig::load_or_default(&path),
            TrackerConfig::default()
        );
    }

    #[test]
    fn test_handle_rejects_invalid_updates() {
        let handle = ConfigHandle::new(TrackerConfig::default()).unwrap();
        let rx = handle.subscribe();

        handle.modify(|c| c.update_rate = 30).unwrap();
        assert_eq!(rx.borrow().update_rate, 30);

        assert!(handle.modify(|c| c.update_rate = 0).is_err());
        assert_eq!(rx.borrow().update_rate, 30);
        assert_eq!(handle.current().update_rate, 30);
    }
}
