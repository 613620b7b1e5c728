//! Immutable scheduler configuration snapshots.
//!
//! A [`SchedulerConfig`] is never edited after construction. Changing the
//! desired retention produces a new snapshot that supersedes the old one.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// FSRS-6 default model weights (w0..w20).
pub const DEFAULT_PARAMETERS: [f64; 21] = [
    0.212, 1.2931, 2.3065, 8.2956, 6.4133, 0.8334, 3.0194, 0.001, 1.8722, 0.1666, 0.796, 1.4835,
    0.0614, 0.2629, 1.6483, 0.6014, 1.8729, 0.5425, 0.0912, 0.0658, 0.1542,
];

pub const DEFAULT_RETENTION: f64 = 0.9;
pub const DEFAULT_MAXIMUM_INTERVAL: u32 = 36_500;

/// Parameters handed to the scheduling engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    desired_retention: f64,
    #[serde(with = "duration_secs")]
    learning_steps: Vec<Duration>,
    #[serde(with = "duration_secs")]
    relearning_steps: Vec<Duration>,
    /// Longest interval in days; `None` is unbounded.
    maximum_interval: Option<u32>,
    enable_fuzzing: bool,
    parameters: [f64; 21],
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            desired_retention: DEFAULT_RETENTION,
            learning_steps: vec![Duration::minutes(1), Duration::minutes(10)],
            relearning_steps: vec![Duration::minutes(10)],
            maximum_interval: Some(DEFAULT_MAXIMUM_INTERVAL),
            enable_fuzzing: false,
            parameters: DEFAULT_PARAMETERS,
        }
    }
}

impl SchedulerConfig {
    /// Default configuration targeting `desired_retention`.
    ///
    /// # Errors
    /// Returns [`ConfigError::RetentionOutOfRange`] unless `0 < r < 1`.
    pub fn new(desired_retention: f64) -> Result<Self, ConfigError> {
        Self::default().with_desired_retention(desired_retention)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn desired_retention(&self) -> f64 {
        self.desired_retention
    }

    pub fn learning_steps(&self) -> &[Duration] {
        &self.learning_steps
    }

    pub fn relearning_steps(&self) -> &[Duration] {
        &self.relearning_steps
    }

    pub fn maximum_interval(&self) -> Option<u32> {
        self.maximum_interval
    }

    pub fn enable_fuzzing(&self) -> bool {
        self.enable_fuzzing
    }

    pub fn parameters(&self) -> &[f64; 21] {
        &self.parameters
    }

    /// Forgetting-curve decay exponent (negative).
    pub fn decay(&self) -> f64 {
        -self.parameters[20]
    }

    // ── Derived snapshots ────────────────────────────────────────────

    /// Same parameters, different retention target.
    ///
    /// # Errors
    /// Returns [`ConfigError::RetentionOutOfRange`] unless `0 < r < 1`.
    pub fn with_desired_retention(&self, desired_retention: f64) -> Result<Self, ConfigError> {
        validate_retention(desired_retention)?;
        Ok(Self {
            desired_retention,
            ..self.clone()
        })
    }

    /// # Errors
    /// Rejects zero or negative step durations.
    pub fn with_learning_steps(&self, steps: Vec<Duration>) -> Result<Self, ConfigError> {
        validate_steps("learning_steps", &steps)?;
        Ok(Self {
            learning_steps: steps,
            ..self.clone()
        })
    }

    /// # Errors
    /// Rejects zero or negative step durations.
    pub fn with_relearning_steps(&self, steps: Vec<Duration>) -> Result<Self, ConfigError> {
        validate_steps("relearning_steps", &steps)?;
        Ok(Self {
            relearning_steps: steps,
            ..self.clone()
        })
    }

    /// # Errors
    /// Rejects a bounded maximum of zero days.
    pub fn with_maximum_interval(&self, days: Option<u32>) -> Result<Self, ConfigError> {
        if days == Some(0) {
            return Err(ConfigError::invalid(
                "maximum_interval",
                "must be at least one day",
            ));
        }
        Ok(Self {
            maximum_interval: days,
            ..self.clone()
        })
    }

    /// # Errors
    /// Rejects non-finite weights and a non-positive decay weight (w20).
    pub fn with_parameters(&self, parameters: [f64; 21]) -> Result<Self, ConfigError> {
        if parameters.iter().any(|w| !w.is_finite()) {
            return Err(ConfigError::invalid("parameters", "weights must be finite"));
        }
        if parameters[20] <= 0.0 {
            return Err(ConfigError::invalid("parameters", "decay weight w20 must be positive"));
        }
        Ok(Self {
            parameters,
            ..self.clone()
        })
    }

    pub fn with_fuzzing(&self, enable_fuzzing: bool) -> Self {
        Self {
            enable_fuzzing,
            ..self.clone()
        }
    }

    pub fn without_fuzzing(&self) -> Self {
        self.with_fuzzing(false)
    }
}

fn validate_retention(value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::RetentionOutOfRange(value))
    }
}

fn validate_steps(key: &str, steps: &[Duration]) -> Result<(), ConfigError> {
    match steps.iter().position(|s| *s <= Duration::zero()) {
        Some(i) => Err(ConfigError::invalid(
            key,
            format!("step {i} must be a positive duration"),
        )),
        None => Ok(()),
    }
}

/// Serde helper storing step durations as whole seconds.
mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(steps: &[Duration], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(steps.iter().map(Duration::num_seconds))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Duration>, D::Error> {
        let secs = Vec::<i64>::deserialize(d)?;
        Ok(secs.into_iter().map(Duration::seconds).collect())
    }
}
