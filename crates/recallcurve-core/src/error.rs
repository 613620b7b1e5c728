//! Core error types for recallcurve-core.
//!
//! This module defines the error hierarchy using thiserror so that card
//! invariant violations and configuration problems stay distinguishable
//! all the way up to the CLI.

use std::path::PathBuf;
use thiserror::Error;

use crate::card::State;

/// Core error type for recallcurve-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A card violated the data-model invariants
    #[error("Invalid card state: {0}")]
    InvalidState(#[from] InvalidStateError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The engine could not schedule the review (e.g. due date out of range)
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Card invariant violations.
///
/// These are defensive: a card produced by the review flow never trips them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidStateError {
    /// Reviewed states must remember when the last review happened.
    #[error("card in {state:?} state has no last review timestamp")]
    MissingLastReview { state: State },

    /// Learning and Relearning cards must carry a step index.
    #[error("card in {state:?} state has no step index")]
    MissingStep { state: State },

    /// The step index does not exist in the configured step list.
    #[error("{state:?} step {step} is out of range for {len} configured steps")]
    StepOutOfRange { state: State, step: usize, len: usize },

    /// Due must not precede the last review.
    #[error("card is due before its last review")]
    DueBeforeLastReview,

    /// Review and Relearning cards need stability and difficulty.
    #[error("card in {state:?} state has no memory state (stability/difficulty)")]
    MissingMemoryState { state: State },
}

/// Configuration-specific errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Desired retention must lie strictly between 0 and 1
    #[error("desired retention {0} is outside (0, 1)")]
    RetentionOutOfRange(f64),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
