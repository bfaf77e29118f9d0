use anyhow::{Context, Result};
use rps_game::GameConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Which game-flow controller the booth runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Timed,
    Freestyle,
}

/// Actuator link settings. An empty port list means every port the host
/// enumerates is a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub enabled: bool,
    pub ports: Vec<String>,
    pub baudrate: u32,
    pub timeout_secs: f64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ports: Vec::new(),
            baudrate: rps_link::DEFAULT_BAUDRATE,
            timeout_secs: 1.0,
        }
    }
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs.max(0.0))
    }
}

/// Thresholds handed through to the external landmark-detector
/// integration; the core never interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub model_complexity: u32,
    pub min_detection_confidence: f64,
    pub min_tracking_confidence: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_complexity: 1,
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

/// Full application configuration. Each mode keeps its own game section
/// so the angle cutoff and timings can differ between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mode: Mode,
    pub frame_interval_ms: u64,
    pub game: GameConfig,
    pub freestyle: GameConfig,
    pub serial: SerialConfig,
    pub detector: DetectorConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Timed,
            frame_interval_ms: 33,
            game: GameConfig::default(),
            freestyle: GameConfig::default(),
            serial: SerialConfig::default(),
            detector: DetectorConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a JSON file, falling back to defaults
    /// when no file exists at the path.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("No config at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// The game section for the configured mode
    pub fn controller_config(&self) -> &GameConfig {
        match self.mode {
            Mode::Timed => &self.game,
            Mode::Freestyle => &self.freestyle,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_nonexistent_uses_defaults() {
        let config = AppConfig::load(Path::new("/nonexistent/rps.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_partial_config_fills_in_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "mode": "freestyle",
                "freestyle": { "angle_cutoff": 100.0, "cache_secs": 2.0 },
                "serial": { "enabled": true, "ports": ["/dev/ttyUSB0"] }
            }"#,
        )
        .unwrap();
        assert_eq!(config.mode, Mode::Freestyle);
        assert_eq!(config.controller_config().angle_cutoff, 100.0);
        assert_eq!(config.controller_config().cache_secs, 2.0);
        assert_eq!(config.controller_config().round_secs, 3.0);
        assert!(config.serial.enabled);
        assert_eq!(config.serial.baudrate, 9600);
        assert_eq!(config.frame_interval_ms, 33);
    }

    #[test]
    fn test_config_round_trips() {
        let config = AppConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
