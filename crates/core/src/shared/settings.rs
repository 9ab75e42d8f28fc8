use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::expression_aggregator::EmptyDetectionPolicy;
use crate::overlay::overlay_style::OverlayStyle;
use crate::shared::constants::{
    APP_DIR_NAME, DEFAULT_DISPLAY_HEIGHT, DEFAULT_DISPLAY_WIDTH, DEFAULT_POLL_INTERVAL_MS,
    MAX_LABEL_HEIGHT, MAX_LINE_WIDTH,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to access settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Tunables for a detection session, persisted as JSON.
///
/// Missing fields fall back to their defaults so older settings files keep
/// loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub poll_interval_ms: u64,
    pub display_width: u32,
    pub display_height: u32,
    pub empty_detections: EmptyDetectionPolicy,
    /// Detections scored below this by the face detector are dropped.
    pub min_detection_score: f64,
    pub overlay: OverlayStyle,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            display_width: DEFAULT_DISPLAY_WIDTH,
            display_height: DEFAULT_DISPLAY_HEIGHT,
            empty_detections: EmptyDetectionPolicy::Hold,
            min_detection_score: 0.0,
            overlay: OverlayStyle::default(),
        }
    }
}

impl SessionSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.poll_interval_ms == 0 {
            return Err(SettingsError::Invalid(
                "poll interval must be at least 1 ms".into(),
            ));
        }
        if self.display_width == 0 || self.display_height == 0 {
            return Err(SettingsError::Invalid(format!(
                "display size must be non-zero, got {}x{}",
                self.display_width, self.display_height
            )));
        }
        if !(1..=MAX_LINE_WIDTH).contains(&self.overlay.line_width) {
            return Err(SettingsError::Invalid(format!(
                "line width must be between 1 and {MAX_LINE_WIDTH}, got {}",
                self.overlay.line_width
            )));
        }
        if self.overlay.label_height > MAX_LABEL_HEIGHT {
            return Err(SettingsError::Invalid(format!(
                "label height must be at most {MAX_LABEL_HEIGHT}, got {}",
                self.overlay.label_height
            )));
        }
        if !(0.0..=1.0).contains(&self.min_detection_score) {
            return Err(SettingsError::Invalid(format!(
                "minimum detection score must be between 0.0 and 1.0, got {}",
                self.min_detection_score
            )));
        }
        Ok(())
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    /// Loads the user's settings, falling back to defaults when the file is
    /// missing or unusable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring settings file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|e| SettingsError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let settings: Self = serde_json::from_str(&json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::config_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SettingsError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| SettingsError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
