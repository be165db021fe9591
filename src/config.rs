//! Engine Configuration
//!
//! Loaded from a JSON file; every field is optional and falls back to the
//! default below.

use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use crate::timer::gate::{PrejumpRule, PrespeedLimits};
use crate::{MAX_PLAYER_SLOTS, TICK_RATE};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the file failed.
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid JSON for this config.
    #[error("Config is malformed: {0}")]
    Json(#[from] serde_json::Error),

    /// A value is outside its allowed range.
    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simulation rate the host runs at (Hz)
    pub tick_rate: u32,
    /// Player slot capacity
    pub max_players: usize,
    /// Jumps allowed in a start zone before take-off is cancelled (1-10)
    pub max_prejump: u32,
    /// Horizontal speed cap when leaving a start zone
    pub max_prespeed: f32,
    /// Upward speed cap when leaving a start zone (0-3500)
    pub max_prespeed_z: f32,
    /// Steepest ground normal Z that still counts as standable
    pub standable_normal: f32,
    /// Ground ticks after landing that still count as a bunnyhop
    pub prejump_ground_ticks: u32,
    /// Smallest yaw change (degrees) counted for sync
    pub yaw_epsilon: f32,
    /// How far below the player the surf trace reaches
    pub ground_trace_distance: f32,
    /// Directory of per-map zone files
    pub zone_dir: PathBuf,
    /// JSON style list; the default style only when unset
    pub styles_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: TICK_RATE,
            max_players: MAX_PLAYER_SLOTS,
            max_prejump: 1,
            max_prespeed: 375.0,
            max_prespeed_z: 500.0,
            standable_normal: 0.7,
            prejump_ground_ticks: 10,
            yaw_epsilon: 0.01,
            ground_trace_distance: 54.0,
            zone_dir: PathBuf::from("zones"),
            styles_path: None,
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse and validate JSON config text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid { field, reason: reason.into() })
        }

        if self.tick_rate != TICK_RATE {
            return invalid("tick_rate", format!("timing runs at {} Hz", TICK_RATE));
        }
        if self.max_players == 0 || self.max_players > MAX_PLAYER_SLOTS {
            return invalid("max_players", format!("must be in 1..={}", MAX_PLAYER_SLOTS));
        }
        if !(1..=10).contains(&self.max_prejump) {
            return invalid("max_prejump", "must be in 1..=10");
        }
        if self.max_prespeed.is_nan() || self.max_prespeed <= 0.0 {
            return invalid("max_prespeed", "must be positive");
        }
        if !(0.0..=3500.0).contains(&self.max_prespeed_z) {
            return invalid("max_prespeed_z", "must be in 0..=3500");
        }
        if !(0.0..=1.0).contains(&self.standable_normal) {
            return invalid("standable_normal", "must be in 0..=1");
        }
        if self.yaw_epsilon.is_nan() || self.yaw_epsilon < 0.0 {
            return invalid("yaw_epsilon", "must not be negative");
        }
        if self.ground_trace_distance.is_nan() || self.ground_trace_distance <= 0.0 {
            return invalid("ground_trace_distance", "must be positive");
        }
        Ok(())
    }

    /// Start-zone exit caps.
    pub fn prespeed_limits(&self) -> PrespeedLimits {
        PrespeedLimits {
            max_2d: self.max_prespeed,
            max_z: self.max_prespeed_z,
        }
    }

    /// Prejump cap.
    pub fn prejump_rule(&self) -> PrejumpRule {
        PrejumpRule {
            max_jumps: self.max_prejump,
            ground_window: self.prejump_ground_ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.prespeed_limits(), PrespeedLimits { max_2d: 375.0, max_z: 500.0 });
        assert_eq!(config.prejump_rule(), PrejumpRule { max_jumps: 1, ground_window: 10 });
    }

    #[test]
    fn test_partial_json() {
        let config = EngineConfig::from_json(r#"{ "max_prespeed": 290.0, "zone_dir": "/srv/zones" }"#).unwrap();
        assert_eq!(config.max_prespeed, 290.0);
        assert_eq!(config.zone_dir, PathBuf::from("/srv/zones"));
        assert_eq!(config.max_prejump, 1);
    }

    #[test]
    fn test_out_of_range_rejected() {
        for json in [
            r#"{ "max_prejump": 0 }"#,
            r#"{ "max_prejump": 11 }"#,
            r#"{ "max_prespeed_z": 4000.0 }"#,
            r#"{ "max_players": 0 }"#,
            r#"{ "tick_rate": 128 }"#,
            r#"{ "max_prespeed": -1.0 }"#,
        ] {
            assert!(matches!(EngineConfig::from_json(json), Err(ConfigError::Invalid { .. })), "{}", json);
        }
        assert!(matches!(EngineConfig::from_json(r#"{ "max_prejump": "three" }"#), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timer.json");
        std::fs::write(&path, r#"{ "max_prejump": 3 }"#).unwrap();

        assert_eq!(EngineConfig::from_file(&path).unwrap().max_prejump, 3);
        assert!(matches!(EngineConfig::from_file(&dir.path().join("nope.json")), Err(ConfigError::Io(_))));
    }
}
