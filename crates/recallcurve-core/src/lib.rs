//! # recallcurve Core Library
//!
//! This library provides the logic behind the recallcurve forgetting-curve
//! explorer: one flashcard is stepped through review ratings, and its
//! retrievability curve is redrawn after every action. The CLI is a thin
//! layer over the same library.
//!
//! ## Architecture
//!
//! - **Scheduler**: the [`ReviewScheduler`] seam plus the built-in FSRS-6
//!   engine ([`FsrsScheduler`])
//! - **Curve**: pure state-to-plot mapping ([`build_curve`])
//! - **Session**: rating, retention-change replay and reset handlers
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`Session`]: per-user card, scheduler and replay record
//! - [`CurvePlot`]: plot descriptor consumed by renderers
//! - [`AsciiChart`]: terminal renderer
//! - [`Config`]: application configuration management

pub mod card;
pub mod curve;
pub mod error;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod storage;

pub use card::{Card, Rating, State};
pub use curve::{build_curve, CurveOptions, CurvePlot, CurvePoint, DayDomain, DueMarker, StepProgress};
pub use error::{ConfigError, CoreError, InvalidStateError};
pub use render::{status_lines, AsciiChart, ChartLabels};
pub use scheduler::{FsrsScheduler, ReviewScheduler, SchedulerConfig};
pub use session::{
    apply_rating, apply_retention_change, reset, ReplayOutcome, RetentionChange, ReviewEvent,
    Session,
};
pub use storage::Config;
