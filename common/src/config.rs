use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::source::FacingMode;

/// Largest accepted moving-average window. At the fastest useful check
/// interval this is still several minutes of history.
pub const MAX_WINDOW_SIZE: usize = 10_000;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub detection: DetectionConfig,
    pub camera: CameraConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Calibration for one detection session.
///
/// The threshold is environment-specific: recalibrate it whenever the camera
/// or the lighting changes.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Smoothed center brightness below this value means "object approaching".
    #[serde(default = "default_brightness_threshold")]
    pub brightness_threshold: f64,
    /// Number of samples in the moving average. Larger is smoother but slower to react.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
    /// Fraction of each frame dimension analysed, centered. 0.5 = middle 50% x 50%.
    #[serde(default = "default_zone_ratio")]
    pub zone_ratio: f64,
}

/// Where frames come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraSource {
    /// HTTP `multipart/x-mixed-replace` stream at `camera.url`.
    #[default]
    Mjpeg,
    /// Still images from the directory at `camera.path`, played in a loop.
    Replay,
}

impl fmt::Display for CameraSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraSource::Mjpeg => f.write_str("mjpeg"),
            CameraSource::Replay => f.write_str("replay"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub source: CameraSource,
    /// MJPEG endpoint, required when `source = "mjpeg"`.
    pub url: Option<String>,
    /// Image directory, required when `source = "replay"`.
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub facing_mode: FacingMode,
    /// Ask the camera to disable autofocus. Best-effort; devices may ignore it.
    #[serde(default = "default_manual_focus")]
    pub manual_focus: bool,
    /// Give up on camera acquisition after this long. Unset waits indefinitely.
    pub acquire_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            brightness_threshold: default_brightness_threshold(),
            window_size: default_window_size(),
            check_interval_ms: default_check_interval_ms(),
            zone_ratio: default_zone_ratio(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DetectionConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.brightness_threshold.is_finite() {
            return Err(ConfigError::Invalid(
                "detection.brightness_threshold must be a finite number".into(),
            ));
        }
        if !(1..=MAX_WINDOW_SIZE).contains(&self.window_size) {
            return Err(ConfigError::Invalid(format!(
                "detection.window_size must be between 1 and {MAX_WINDOW_SIZE}, got {}",
                self.window_size
            )));
        }
        if self.check_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "detection.check_interval_ms must be positive".into(),
            ));
        }
        if !(self.zone_ratio > 0.0 && self.zone_ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "detection.zone_ratio must be in (0, 1], got {}",
                self.zone_ratio
            )));
        }
        Ok(())
    }
}

impl CameraConfig {
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.source {
            CameraSource::Mjpeg if self.url.is_none() => Err(ConfigError::Invalid(
                "camera.url is required for the mjpeg source".into(),
            )),
            CameraSource::Replay if self.path.is_none() => Err(ConfigError::Invalid(
                "camera.path is required for the replay source".into(),
            )),
            CameraSource::Mjpeg | CameraSource::Replay => Ok(()),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config = Self::from_toml(&content)?;
        debug!(path = %path.display(), source = %config.camera.source, "config loaded");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.detection.validate()?;
        config.camera.validate()?;
        Ok(config)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_brightness_threshold() -> f64 {
    90.0
}
fn default_window_size() -> usize {
    10
}
fn default_check_interval_ms() -> u64 {
    100
}
fn default_zone_ratio() -> f64 {
    0.5
}
fn default_manual_focus() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}
