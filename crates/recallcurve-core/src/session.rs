//! Per-session review state and the actions that replace it.
//!
//! The free functions are pure: they take the current values and hand back
//! new ones. [`Session`] strings them together for one interactive user and
//! only commits a result once the whole action has succeeded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::card::{Card, Rating};
use crate::curve::{build_curve, CurveOptions, CurvePlot};
use crate::error::Result;
use crate::scheduler::{FsrsScheduler, ReviewScheduler, SchedulerConfig};

/// The last rating applied in this session, kept so it can be replayed
/// under a different configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub prior_card: Card,
    pub rating: Rating,
    pub review_datetime: DateTime<Utc>,
}

/// What a retention change actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayOutcome {
    /// Same retention as before; nothing was rebuilt.
    Unchanged,
    /// New configuration, card left as is (no review to replay).
    ConfigOnly,
    /// New configuration and the last review re-derived under it.
    Replayed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetentionChange {
    pub config: SchedulerConfig,
    pub card: Card,
    pub outcome: ReplayOutcome,
}

/// Review `card` at its due time.
///
/// Returns the replacement card and the event needed to replay the review.
///
/// # Errors
/// Propagates scheduler failures; nothing is captured in that case.
pub fn apply_rating<S: ReviewScheduler>(
    card: &Card,
    rating: Rating,
    scheduler: &S,
) -> Result<(Card, ReviewEvent)> {
    let event = ReviewEvent {
        prior_card: card.clone(),
        rating,
        review_datetime: card.due,
    };
    let next = scheduler.review(card, rating, event.review_datetime)?;
    Ok((next, event))
}

/// Rebuild the configuration for `new_retention` and, if a review happened
/// in this session, replay it so the card matches the new target.
///
/// Equal retention (compared by value) is a no-op that returns the inputs.
/// The new configuration always has fuzzing disabled.
///
/// # Errors
/// Returns a configuration error for retention outside (0, 1) and
/// propagates replay failures.
pub fn apply_retention_change<S: ReviewScheduler>(
    old_config: &SchedulerConfig,
    new_retention: f64,
    current_card: &Card,
    last_event: Option<&ReviewEvent>,
) -> Result<RetentionChange> {
    if new_retention == old_config.desired_retention() {
        debug!(retention = new_retention, "retention unchanged, skipping rebuild");
        return Ok(RetentionChange {
            config: old_config.clone(),
            card: current_card.clone(),
            outcome: ReplayOutcome::Unchanged,
        });
    }

    let config = old_config
        .with_desired_retention(new_retention)?
        .without_fuzzing();

    let Some(event) = last_event else {
        debug!(retention = new_retention, "no review to replay");
        return Ok(RetentionChange {
            config,
            card: current_card.clone(),
            outcome: ReplayOutcome::ConfigOnly,
        });
    };

    let scheduler = S::from_config(config);
    let card = scheduler.review(&event.prior_card, event.rating, event.review_datetime)?;
    info!(
        from = old_config.desired_retention(),
        to = new_retention,
        rating = %event.rating,
        due = %card.due,
        "replayed last review under new retention"
    );
    Ok(RetentionChange {
        config: scheduler.config().clone(),
        card,
        outcome: ReplayOutcome::Replayed,
    })
}

/// A brand-new card due at `now`, with no review history to replay.
pub fn reset(now: DateTime<Utc>) -> (Card, Option<ReviewEvent>) {
    (Card::new(now), None)
}

/// One user's card, scheduler and replay record.
#[derive(Debug, Clone)]
pub struct Session<S: ReviewScheduler = FsrsScheduler> {
    scheduler: S,
    card: Card,
    last_event: Option<ReviewEvent>,
    review_count: u32,
}

impl<S: ReviewScheduler> Session<S> {
    /// Start a session with a fresh card due at `now`.
    ///
    /// Fuzzing is switched off so every curve is reproducible.
    pub fn new(config: SchedulerConfig, now: DateTime<Utc>) -> Self {
        let (card, last_event) = reset(now);
        Self {
            scheduler: S::from_config(config.without_fuzzing()),
            card,
            last_event,
            review_count: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn card(&self) -> &Card {
        &self.card
    }

    pub fn config(&self) -> &SchedulerConfig {
        self.scheduler.config()
    }

    pub fn last_event(&self) -> Option<&ReviewEvent> {
        self.last_event.as_ref()
    }

    /// Ratings applied since the last reset.
    pub fn review_count(&self) -> u32 {
        self.review_count
    }

    /// # Errors
    /// Fails when the held card breaks the data-model invariants.
    pub fn curve(&self, options: &CurveOptions) -> Result<CurvePlot> {
        build_curve(&self.card, &self.scheduler, options)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// # Errors
    /// Leaves the session untouched if the scheduler fails.
    pub fn rate(&mut self, rating: Rating) -> Result<&Card> {
        let (card, event) = apply_rating(&self.card, rating, &self.scheduler)?;
        self.card = card;
        self.last_event = Some(event);
        self.review_count += 1;
        Ok(&self.card)
    }

    /// # Errors
    /// Leaves the session untouched on invalid retention or replay failure.
    pub fn set_desired_retention(&mut self, retention: f64) -> Result<ReplayOutcome> {
        let change = apply_retention_change::<S>(
            self.scheduler.config(),
            retention,
            &self.card,
            self.last_event.as_ref(),
        )?;
        if change.outcome != ReplayOutcome::Unchanged {
            self.scheduler = S::from_config(change.config);
            self.card = change.card;
        }
        Ok(change.outcome)
    }

    pub fn reset(&mut self, now: DateTime<Utc>) {
        let (card, last_event) = reset(now);
        self.card = card;
        self.last_event = last_event;
        self.review_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::State;
    use crate::error::{ConfigError, CoreError};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn apply_rating_captures_event_before_review() {
        let s = FsrsScheduler::new(SchedulerConfig::default());
        let card = Card::new(t0());
        let (next, event) = apply_rating(&card, Rating::Good, &s).unwrap();
        assert_eq!(event.prior_card, card);
        assert_eq!(event.rating, Rating::Good);
        assert_eq!(event.review_datetime, card.due);
        assert_eq!(next.last_review, Some(card.due));
    }

    #[test]
    fn review_happens_at_due_time_not_wall_clock() {
        let s = FsrsScheduler::new(SchedulerConfig::default());
        let (learning, _) = apply_rating(&Card::new(t0()), Rating::Good, &s).unwrap();
        let (graduated, event) = apply_rating(&learning, Rating::Good, &s).unwrap();
        assert_eq!(event.review_datetime, t0() + Duration::minutes(10));
        assert_eq!(graduated.last_review, Some(t0() + Duration::minutes(10)));
    }

    #[test]
    fn same_retention_is_a_no_op() {
        let config = SchedulerConfig::default();
        let card = Card::new(t0());
        let change =
            apply_retention_change::<FsrsScheduler>(&config, 0.9, &card, None).unwrap();
        assert_eq!(change.outcome, ReplayOutcome::Unchanged);
        assert_eq!(change.config, config);
        assert_eq!(change.card, card);
    }

    #[test]
    fn retention_change_without_event_only_swaps_config() {
        let config = SchedulerConfig::default().with_fuzzing(true);
        let card = Card::new(t0());
        let change =
            apply_retention_change::<FsrsScheduler>(&config, 0.8, &card, None).unwrap();
        assert_eq!(change.outcome, ReplayOutcome::ConfigOnly);
        assert_eq!(change.card, card);
        assert_eq!(change.config.desired_retention(), 0.8);
        assert!(!change.config.enable_fuzzing());
        assert_eq!(change.config.learning_steps(), config.learning_steps());
    }

    #[test]
    fn out_of_range_retention_is_rejected() {
        let err = apply_retention_change::<FsrsScheduler>(
            &SchedulerConfig::default(),
            1.5,
            &Card::new(t0()),
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ConfigError::RetentionOutOfRange(r)) if r == 1.5
        ));
    }

    #[test]
    fn replay_rederives_card_under_new_retention() {
        let s = FsrsScheduler::new(SchedulerConfig::default());
        let (card, event) = apply_rating(&Card::new(t0()), Rating::Easy, &s).unwrap();
        assert_eq!(card.due, t0() + Duration::days(8));

        let change = apply_retention_change::<FsrsScheduler>(
            s.config(),
            0.7,
            &card,
            Some(&event),
        )
        .unwrap();
        assert_eq!(change.outcome, ReplayOutcome::Replayed);

        let direct = FsrsScheduler::new(SchedulerConfig::new(0.7).unwrap())
            .review(&event.prior_card, Rating::Easy, t0())
            .unwrap();
        assert_eq!(change.card, direct);
        assert!(change.card.due > card.due);
    }

    #[test]
    fn replay_is_deterministic() {
        let s = FsrsScheduler::new(SchedulerConfig::default());
        let (card, event) = apply_rating(&Card::new(t0()), Rating::Good, &s).unwrap();
        let a = apply_retention_change::<FsrsScheduler>(s.config(), 0.75, &card, Some(&event))
            .unwrap();
        let b = apply_retention_change::<FsrsScheduler>(s.config(), 0.75, &card, Some(&event))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn session_second_identical_change_is_a_no_op() {
        let mut session: Session = Session::new(SchedulerConfig::default(), t0());
        session.rate(Rating::Easy).unwrap();
        assert_eq!(session.set_desired_retention(0.8).unwrap(), ReplayOutcome::Replayed);
        let card = session.card().clone();
        assert_eq!(session.set_desired_retention(0.8).unwrap(), ReplayOutcome::Unchanged);
        assert_eq!(session.card(), &card);
    }

    #[test]
    fn session_failed_change_keeps_prior_state() {
        let mut session: Session = Session::new(SchedulerConfig::default(), t0());
        session.rate(Rating::Good).unwrap();
        let card = session.card().clone();
        assert!(session.set_desired_retention(0.0).is_err());
        assert_eq!(session.card(), &card);
        assert_eq!(session.config().desired_retention(), 0.9);
    }

    #[test]
    fn session_reset_clears_history() {
        let mut session: Session = Session::new(SchedulerConfig::default(), t0());
        session.rate(Rating::Good).unwrap();
        session.rate(Rating::Good).unwrap();
        assert_eq!(session.review_count(), 2);

        session.reset(t0() + Duration::days(1));
        assert_eq!(session.card().state, State::New);
        assert!(session.card().stability.is_none());
        assert!(session.card().step.is_none());
        assert!(session.last_event().is_none());
        assert_eq!(session.review_count(), 0);

        let before = session.card().clone();
        assert_eq!(session.set_desired_retention(0.7).unwrap(), ReplayOutcome::ConfigOnly);
        assert_eq!(session.card(), &before);
    }

    #[test]
    fn replay_does_not_count_as_a_review() {
        let mut session: Session = Session::new(SchedulerConfig::default(), t0());
        session.rate(Rating::Hard).unwrap();
        session.set_desired_retention(0.85).unwrap();
        assert_eq!(session.review_count(), 1);
    }

    #[test]
    fn session_disables_fuzzing() {
        let session: Session =
            Session::new(SchedulerConfig::default().with_fuzzing(true), t0());
        assert!(!session.config().enable_fuzzing());
    }
}
