//! Forgetting-curve plot construction.
//!
//! [`build_curve`] maps a card's state to a plot descriptor: the day axis,
//! where the due marker goes, and the sampled retrievability curve. It never
//! touches the card, the scheduler does all of the modelling.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::card::{Card, State};
use crate::error::{InvalidStateError, Result};
use crate::scheduler::ReviewScheduler;

pub const DEFAULT_WINDOW_DAYS: u32 = 1000;
pub const DEFAULT_COARSE_STEP_DAYS: u32 = 10;
/// Upper bound on sampled points for far-off due dates.
pub const MAX_SAMPLES: u32 = 2_000;

/// Sampling options for the day axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurveOptions {
    /// Default horizon of the x axis, in days.
    pub window_days: u32,
    /// Sample spacing once the due date lies beyond `window_days`.
    pub coarse_step_days: u32,
}

impl Default for CurveOptions {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            coarse_step_days: DEFAULT_COARSE_STEP_DAYS,
        }
    }
}

/// Inclusive day range on the x axis, sampled every `step` days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayDomain {
    pub start: u32,
    pub end: u32,
    pub step: u32,
}

impl DayDomain {
    /// Sample offsets from `start` to `end`, always including `end`.
    pub fn offsets(&self) -> Vec<u32> {
        let step = self.step.max(1) as usize;
        let mut offsets: Vec<u32> = (self.start..=self.end).step_by(step).collect();
        if offsets.last() != Some(&self.end) {
            offsets.push(self.end);
        }
        offsets
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Position in the Learning/Relearning step list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepProgress {
    /// 1-based step number.
    pub step_number: usize,
    pub step_count: usize,
    pub minutes_till_due: i64,
}

impl StepProgress {
    /// "1 minute" or "N minutes".
    pub fn minutes_label(&self) -> String {
        if self.minutes_till_due == 1 {
            "1 minute".to_string()
        } else {
            format!("{} minutes", self.minutes_till_due)
        }
    }
}

/// Where the due line sits on the day axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DueMarker {
    /// Never reviewed, nothing is scheduled.
    None,
    /// Review card due this many whole days after its last review.
    Days { days: u32 },
    /// Stepped card due within the day; drawn at day 0.
    Now { progress: StepProgress },
}

impl DueMarker {
    /// Day coordinate of the marker, if one is drawn.
    pub fn day(&self) -> Option<u32> {
        match self {
            DueMarker::None => None,
            DueMarker::Days { days } => Some(*days),
            DueMarker::Now { .. } => Some(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub day: u32,
    pub retrievability: f64,
}

/// Everything a renderer needs to draw one forgetting curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePlot {
    pub state: State,
    pub domain: DayDomain,
    pub due_marker: DueMarker,
    /// Empty when the card has no stability yet.
    pub points: Vec<CurvePoint>,
    /// Horizontal reference line.
    pub desired_retention: f64,
}

/// Build the plot descriptor for `card` under `scheduler`'s configuration.
///
/// A Learning or Relearning card that has no stability yet may also lack
/// `last_review`; it gets a due marker and an empty curve. Once stability is
/// set, `last_review` is required in every state.
///
/// # Errors
/// Returns [`InvalidStateError`] when the card breaks the data-model
/// invariants (a reviewed state without `last_review`, a stepped state
/// without a valid step, due before the last review).
pub fn build_curve<S: ReviewScheduler>(
    card: &Card,
    scheduler: &S,
    options: &CurveOptions,
) -> Result<CurvePlot> {
    let config = scheduler.config();
    let window = DayDomain {
        start: 0,
        end: options.window_days,
        step: 1,
    };

    let (domain, due_marker) = match card.state {
        State::New => (window, DueMarker::None),
        State::Review => {
            let days = review_due_days(card)?;
            let domain = if days > options.window_days {
                DayDomain {
                    start: 0,
                    end: days,
                    step: options
                        .coarse_step_days
                        .max(days.div_ceil(MAX_SAMPLES))
                        .max(1),
                }
            } else {
                window
            };
            (domain, DueMarker::Days { days })
        }
        State::Learning | State::Relearning => {
            let steps = match card.state {
                State::Learning => config.learning_steps(),
                _ => config.relearning_steps(),
            };
            let progress = step_progress(card, steps)?;
            (window, DueMarker::Now { progress })
        }
    };

    let points = match card.stability {
        Some(_) => {
            let last = card.last_review.ok_or(InvalidStateError::MissingLastReview {
                state: card.state,
            })?;
            domain
                .offsets()
                .into_iter()
                .map(|day| CurvePoint {
                    day,
                    retrievability: scheduler
                        .retrievability(card, last + Duration::days(i64::from(day))),
                })
                .collect()
        }
        None => Vec::new(),
    };

    Ok(CurvePlot {
        state: card.state,
        domain,
        due_marker,
        points,
        desired_retention: config.desired_retention(),
    })
}

fn review_due_days(card: &Card) -> Result<u32> {
    let days = card
        .scheduled_days()
        .ok_or(InvalidStateError::MissingLastReview { state: card.state })?;
    u32::try_from(days).map_err(|_| InvalidStateError::DueBeforeLastReview.into())
}

fn step_progress(card: &Card, steps: &[Duration]) -> Result<StepProgress> {
    let step = card
        .step
        .ok_or(InvalidStateError::MissingStep { state: card.state })?;
    let duration = steps.get(step).ok_or(InvalidStateError::StepOutOfRange {
        state: card.state,
        step,
        len: steps.len(),
    })?;
    let secs = duration.num_seconds();
    Ok(StepProgress {
        step_number: step + 1,
        step_count: steps.len(),
        minutes_till_due: (secs + 59).div_euclid(60),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Rating;
    use crate::error::CoreError;
    use crate::scheduler::{FsrsScheduler, SchedulerConfig};
    use chrono::{DateTime, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn scheduler() -> FsrsScheduler {
        FsrsScheduler::new(SchedulerConfig::default())
    }

    fn review_card(due_days: i64, stability: f64) -> Card {
        let mut card = Card::new(t0() + Duration::days(due_days));
        card.state = State::Review;
        card.stability = Some(stability);
        card.difficulty = Some(5.0);
        card.last_review = Some(t0());
        card
    }

    #[test]
    fn new_card_has_window_but_no_marker_or_points() {
        let plot = build_curve(&Card::new(t0()), &scheduler(), &CurveOptions::default()).unwrap();
        assert_eq!(plot.state, State::New);
        assert_eq!(plot.due_marker, DueMarker::None);
        assert!(plot.points.is_empty());
        assert_eq!(plot.domain, DayDomain { start: 0, end: 1000, step: 1 });
        assert_eq!(plot.desired_retention, 0.9);
    }

    #[test]
    fn learning_step_without_stability_reports_minutes() {
        let mut card = Card::new(t0());
        card.state = State::Learning;
        card.step = Some(1);
        card.last_review = Some(t0());
        let plot = build_curve(&card, &scheduler(), &CurveOptions::default()).unwrap();
        let DueMarker::Now { progress } = plot.due_marker else {
            panic!("expected a due-now marker, got {:?}", plot.due_marker);
        };
        assert_eq!(progress.minutes_till_due, 10);
        assert_eq!(progress.step_number, 2);
        assert_eq!(progress.step_count, 2);
        assert_eq!(progress.minutes_label(), "10 minutes");
        assert_eq!(plot.due_marker.day(), Some(0));
        assert!(plot.points.is_empty());
    }

    #[test]
    fn single_minute_step_label_is_singular() {
        let mut card = Card::new(t0());
        card.state = State::Learning;
        card.step = Some(0);
        let plot = build_curve(&card, &scheduler(), &CurveOptions::default()).unwrap();
        let DueMarker::Now { progress } = plot.due_marker else {
            panic!("expected a due-now marker");
        };
        assert_eq!(progress.minutes_label(), "1 minute");
    }

    #[test]
    fn partial_minutes_round_up() {
        let config = SchedulerConfig::default()
            .with_relearning_steps(vec![Duration::seconds(90)])
            .unwrap();
        let mut card = review_card(0, 3.0);
        card.state = State::Relearning;
        card.step = Some(0);
        let plot =
            build_curve(&card, &FsrsScheduler::new(config), &CurveOptions::default()).unwrap();
        let DueMarker::Now { progress } = plot.due_marker else {
            panic!("expected a due-now marker");
        };
        assert_eq!(progress.minutes_till_due, 2);
        assert!(!plot.points.is_empty());
    }

    #[test]
    fn review_card_marks_whole_days_and_decays() {
        let plot = build_curve(&review_card(20, 5.0), &scheduler(), &CurveOptions::default())
            .unwrap();
        assert_eq!(plot.due_marker, DueMarker::Days { days: 20 });
        assert_eq!(plot.points.len(), 1001);
        assert_eq!(plot.points[0].retrievability, 1.0);
        assert!(plot
            .points
            .windows(2)
            .all(|w| w[1].retrievability <= w[0].retrievability));
    }

    #[test]
    fn far_due_date_extends_domain_with_coarse_sampling() {
        let plot = build_curve(&review_card(2345, 900.0), &scheduler(), &CurveOptions::default())
            .unwrap();
        assert_eq!(plot.domain, DayDomain { start: 0, end: 2345, step: 10 });
        assert_eq!(plot.points.first().map(|p| p.day), Some(0));
        assert_eq!(plot.points.last().map(|p| p.day), Some(2345));
        assert_eq!(plot.points[1].day, 10);
    }

    #[test]
    fn very_far_due_date_caps_sample_count() {
        let plot = build_curve(
            &review_card(3_000_000, 36_500.0),
            &scheduler(),
            &CurveOptions::default(),
        )
        .unwrap();
        assert_eq!(plot.domain.step, 1_500);
        assert!(plot.points.len() <= MAX_SAMPLES as usize + 1);
        assert_eq!(plot.points.last().map(|p| p.day), Some(3_000_000));
    }

    #[test]
    fn stepped_card_with_stability_but_no_last_review_is_invalid() {
        for state in [State::Learning, State::Relearning] {
            let mut card = Card::new(t0());
            card.state = state;
            card.step = Some(0);
            card.stability = Some(2.3);
            card.difficulty = Some(5.0);
            let err = build_curve(&card, &scheduler(), &CurveOptions::default()).unwrap_err();
            assert!(
                matches!(
                    err,
                    CoreError::InvalidState(InvalidStateError::MissingLastReview { state: s })
                        if s == state
                ),
                "{state}: {err}"
            );
        }
    }

    #[test]
    fn reviewed_card_without_last_review_is_invalid() {
        let mut card = review_card(20, 5.0);
        card.last_review = None;
        let err = build_curve(&card, &scheduler(), &CurveOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidState(InvalidStateError::MissingLastReview { state: State::Review })
        ));
    }

    #[test]
    fn stepped_card_with_stale_step_index_is_invalid() {
        let mut card = review_card(0, 3.0);
        card.state = State::Relearning;
        card.step = Some(3);
        let err = build_curve(&card, &scheduler(), &CurveOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidState(InvalidStateError::StepOutOfRange { step: 3, len: 1, .. })
        ));
    }

    #[test]
    fn due_before_last_review_is_invalid() {
        let card = review_card(-2, 3.0);
        let err = build_curve(&card, &scheduler(), &CurveOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidState(InvalidStateError::DueBeforeLastReview)
        ));
    }

    #[test]
    fn every_state_maps_to_a_marker() {
        let s = scheduler();
        let reviewed = s.review(&Card::new(t0()), Rating::Easy, t0()).unwrap();
        for state in State::ALL {
            let mut card = reviewed.clone();
            card.state = state;
            card.step = state.is_stepped().then_some(0);
            let plot = build_curve(&card, &s, &CurveOptions::default()).unwrap();
            let expected = match state {
                State::New => None,
                State::Learning | State::Relearning => Some(0),
                State::Review => Some(8),
            };
            assert_eq!(plot.due_marker.day(), expected, "{state}");
        }
    }

    #[test]
    fn domain_offsets_include_both_ends() {
        let domain = DayDomain { start: 0, end: 25, step: 10 };
        assert_eq!(domain.offsets(), vec![0, 10, 20, 25]);
        assert_eq!(domain.len(), 25);
        assert!(!domain.is_empty());
    }
}
