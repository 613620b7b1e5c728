//! Scheduling engine seam.
//!
//! Everything that knows how memory decays or how intervals grow lives
//! behind [`ReviewScheduler`]. The rest of the crate only wires cards,
//! ratings and configuration snapshots through it.

mod config;
mod fsrs;

use chrono::{DateTime, Utc};

use crate::card::{Card, Rating};
use crate::error::Result;

pub use config::{SchedulerConfig, DEFAULT_MAXIMUM_INTERVAL, DEFAULT_PARAMETERS, DEFAULT_RETENTION};
pub use fsrs::FsrsScheduler;

/// A spaced-repetition engine bound to one configuration snapshot.
///
/// Implementations must be deterministic when fuzzing is disabled: the
/// same card, rating and timestamp always yield the same card.
pub trait ReviewScheduler {
    /// Build an engine for `config`.
    fn from_config(config: SchedulerConfig) -> Self
    where
        Self: Sized;

    /// The snapshot this engine was built from.
    fn config(&self) -> &SchedulerConfig;

    /// Apply `rating` to `card` as if reviewed at `at`, returning the
    /// replacement card.
    fn review(&self, card: &Card, rating: Rating, at: DateTime<Utc>) -> Result<Card>;

    /// Probability in `[0, 1]` that `card` is recalled at `at`.
    ///
    /// Zero for cards without a memory state.
    fn retrievability(&self, card: &Card, at: DateTime<Utc>) -> f64;
}
