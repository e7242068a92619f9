//! Clock configuration.
//!
//! Defaults reproduce the stock clock; an optional JSON file in the user's
//! config directory overrides individual fields.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::format::{Item, StrftimeItems};
use clockface::FontFlags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("invalid {field} {format:?}")]
    InvalidFormat { field: &'static str, format: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Font family name.
    pub font_name: String,
    /// Font size in points.
    pub font_size: u32,
    /// Dots per inch used to convert points to pixels.
    pub dpi: f32,
    pub bold: bool,
    pub italic: bool,
    /// Clock window size in logical pixels.
    pub window_width: u32,
    pub window_height: u32,
    /// Gap between the text's right edge and the window edge.
    pub margin: u32,
    /// Vertical gap between the time and date lines.
    pub line_gap: u32,
    /// Taskbar height in logical pixels, used where the platform does not
    /// report the monitor's work area.
    pub taskbar_height: u32,
    pub poll_interval_ms: u64,
    /// chrono strftime pattern for the time line.
    pub time_format: String,
    /// chrono strftime pattern for the date line.
    pub date_format: String,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            font_name: String::from("Segoe UI Variable"),
            font_size: 9,
            dpi: clockface::atlas::DEFAULT_DPI,
            bold: false,
            italic: false,
            window_width: 120,
            window_height: 50,
            margin: 10,
            line_gap: 2,
            taskbar_height: 48,
            poll_interval_ms: 100,
            time_format: String::from("%H:%M"),
            date_format: String::from("%d.%m.%Y"),
        }
    }
}

impl ClockConfig {
    /// `<config_dir>/clockface/config.json`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("clockface").join("config.json"))
    }

    /// Load from the default path, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("No config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {:?}", path))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse config {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("invalid config {:?}", path))?;

        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("font_size", self.font_size as u64),
            ("window_width", self.window_width as u64),
            ("window_height", self.window_height as u64),
            ("poll_interval_ms", self.poll_interval_ms),
        ];
        if let Some((field, _)) = positive.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero { field });
        }
        if !(self.dpi > 0.0) {
            return Err(ConfigError::Zero { field: "dpi" });
        }

        check_format("time_format", &self.time_format)?;
        check_format("date_format", &self.date_format)?;
        Ok(())
    }

    pub fn font_flags(&self) -> FontFlags {
        let mut flags = FontFlags::empty();
        if self.bold {
            flags = flags | FontFlags::BOLD;
        }
        if self.italic {
            flags = flags | FontFlags::ITALIC;
        }
        flags
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn check_format(field: &'static str, format: &str) -> Result<(), ConfigError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::InvalidFormat {
            field,
            format: format.to_string(),
        });
    }
    Ok(())
}
