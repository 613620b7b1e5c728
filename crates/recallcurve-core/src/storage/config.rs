//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Scheduler defaults (retention target, learning/relearning steps)
//! - Retention slider bounds
//! - Chart sampling and size
//!
//! Configuration is stored at `~/.config/recallcurve/config.toml`.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::data_dir;
use crate::curve::CurveOptions;
use crate::error::{ConfigError, CoreError};
use crate::render::AsciiChart;
use crate::scheduler::{SchedulerConfig, DEFAULT_MAXIMUM_INTERVAL, DEFAULT_RETENTION};

/// Scheduler defaults used when a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    #[serde(default = "default_retention")]
    pub desired_retention: f64,
    #[serde(default = "default_learning_steps")]
    pub learning_steps_secs: Vec<u64>,
    #[serde(default = "default_relearning_steps")]
    pub relearning_steps_secs: Vec<u64>,
    /// 0 means unbounded.
    #[serde(default = "default_maximum_interval")]
    pub maximum_interval_days: u32,
    #[serde(default)]
    pub enable_fuzzing: bool,
}

/// Bounds of the retention input. Values are clamped and snapped to this
/// grid before they reach the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderConfig {
    #[serde(default = "default_slider_min")]
    pub min: f64,
    #[serde(default = "default_slider_max")]
    pub max: f64,
    #[serde(default = "default_slider_step")]
    pub step: f64,
}

/// Chart sampling and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_coarse_step_days")]
    pub coarse_step_days: u32,
    #[serde(default = "default_width")]
    pub width: usize,
    #[serde(default = "default_height")]
    pub height: usize,
    #[serde(default = "default_y_min")]
    pub y_min: f64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/recallcurve/config.toml`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub slider: SliderConfig,
    #[serde(default)]
    pub chart: ChartConfig,
}

// Default functions
fn default_retention() -> f64 {
    DEFAULT_RETENTION
}
fn default_learning_steps() -> Vec<u64> {
    vec![60, 600]
}
fn default_relearning_steps() -> Vec<u64> {
    vec![600]
}
fn default_maximum_interval() -> u32 {
    DEFAULT_MAXIMUM_INTERVAL
}
fn default_slider_min() -> f64 {
    0.5
}
fn default_slider_max() -> f64 {
    0.95
}
fn default_slider_step() -> f64 {
    0.05
}
fn default_window_days() -> u32 {
    1000
}
fn default_coarse_step_days() -> u32 {
    10
}
fn default_width() -> usize {
    72
}
fn default_height() -> usize {
    16
}
fn default_y_min() -> f64 {
    0.4
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            desired_retention: default_retention(),
            learning_steps_secs: default_learning_steps(),
            relearning_steps_secs: default_relearning_steps(),
            maximum_interval_days: default_maximum_interval(),
            enable_fuzzing: false,
        }
    }
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            min: default_slider_min(),
            max: default_slider_max(),
            step: default_slider_step(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
            coarse_step_days: default_coarse_step_days(),
            width: default_width(),
            height: default_height(),
            y_min: default_y_min(),
        }
    }
}

impl SliderConfig {
    /// Clamp `value` into the slider range and snap it to the step grid.
    pub fn snap(&self, value: f64) -> f64 {
        let clamped = value.clamp(self.min, self.max);
        let steps = ((clamped - self.min) / self.step).round();
        // Drop float noise so 0.7 stays 0.7 for equality checks downstream.
        let snapped = ((self.min + steps * self.step) * 1e6).round() / 1e6;
        snapped.min(self.max)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min > 0.0 && self.max < 1.0 && self.min < self.max) {
            return Err(ConfigError::invalid(
                "slider",
                "bounds must satisfy 0 < min < max < 1",
            ));
        }
        if !(self.step > 0.0) {
            return Err(ConfigError::invalid("slider.step", "must be positive"));
        }
        Ok(())
    }
}

impl SchedulerSettings {
    /// Build the scheduler snapshot these settings describe.
    ///
    /// # Errors
    /// Returns the first invalid setting.
    pub fn to_scheduler_config(&self) -> Result<SchedulerConfig, ConfigError> {
        let maximum = match self.maximum_interval_days {
            0 => None,
            days => Some(days),
        };
        SchedulerConfig::new(self.desired_retention)?
            .with_learning_steps(to_durations(&self.learning_steps_secs))?
            .with_relearning_steps(to_durations(&self.relearning_steps_secs))?
            .with_maximum_interval(maximum)
            .map(|cfg| cfg.with_fuzzing(self.enable_fuzzing))
    }
}

fn to_durations(secs: &[u64]) -> Vec<Duration> {
    const MAX_SECS: u64 = (i64::MAX / 1000) as u64;
    secs.iter()
        .map(|s| Duration::seconds((*s).min(MAX_SECS) as i64))
        .collect()
}

impl ChartConfig {
    pub fn curve_options(&self) -> CurveOptions {
        CurveOptions {
            window_days: self.window_days,
            coarse_step_days: self.coarse_step_days,
        }
    }

    pub fn ascii_chart(&self) -> AsciiChart {
        AsciiChart {
            width: self.width,
            height: self.height,
            y_min: self.y_min,
            ..AsciiChart::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.window_days == 0 {
            return Err(ConfigError::invalid("chart.window_days", "must be positive"));
        }
        if self.coarse_step_days == 0 {
            return Err(ConfigError::invalid("chart.coarse_step_days", "must be positive"));
        }
        if self.width < 2 || self.height < 2 {
            return Err(ConfigError::invalid("chart", "width and height must be at least 2"));
        }
        if !(0.0..1.0).contains(&self.y_min) {
            return Err(ConfigError::invalid("chart.y_min", "must lie in [0, 1)"));
        }
        Ok(())
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => value
                    .parse::<bool>()
                    .map(serde_json::Value::Bool)
                    .map_err(|e| ConfigError::invalid(key, e.to_string()))?,
                serde_json::Value::Number(_) => {
                    if let Ok(n) = value.parse::<u64>() {
                        serde_json::Value::Number(n.into())
                    } else {
                        value
                            .parse::<f64>()
                            .ok()
                            .and_then(serde_json::Number::from_f64)
                            .map(serde_json::Value::Number)
                            .ok_or_else(|| {
                                ConfigError::invalid(key, format!("cannot parse '{value}' as number"))
                            })?
                    }
                }
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value)
                        .map_err(|e| ConfigError::invalid(key, e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// `<data_dir>/config.toml`.
    ///
    /// # Errors
    /// Fails if the configuration directory cannot be created.
    pub fn path() -> Result<PathBuf, CoreError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults first if no file exists yet.
    ///
    /// # Errors
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, CoreError> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            debug!(path = %path.display(), "wrote default config");
            Ok(cfg)
        }
    }

    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg: Config = toml::from_str(&content).map_err(ConfigError::from)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            warn!(error = %e, "falling back to default config");
            Self::default()
        })
    }

    /// Persist to disk.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), CoreError> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), CoreError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value by dot-separated key without saving.
    ///
    /// The result is validated as a whole; on error `self` is unchanged.
    ///
    /// # Errors
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting configuration is invalid.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)
            .map_err(|e| ConfigError::invalid(key, e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist it.
    ///
    /// # Errors
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        self.apply(key, value)?;
        self.save()
    }

    /// # Errors
    /// Returns the first invalid section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scheduler.to_scheduler_config()?;
        self.slider.validate()?;
        self.chart.validate()
    }

    /// Scheduler snapshot for a new session.
    ///
    /// # Errors
    /// Returns the first invalid scheduler setting.
    pub fn scheduler_config(&self) -> Result<SchedulerConfig, ConfigError> {
        self.scheduler.to_scheduler_config()
    }
}
