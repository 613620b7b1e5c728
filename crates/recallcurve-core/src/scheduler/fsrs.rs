//! Built-in FSRS-6 scheduling engine.
//!
//! ## Core Formulas
//! - Retrievability: R = (1 + FACTOR * t / S)^DECAY with DECAY = -w20 and
//!   FACTOR = 0.9^(1/DECAY) - 1, so R(S) = 0.9 for any stability
//! - Interval: t = S / FACTOR * (r^(1/DECAY) - 1) for desired retention r
//!
//! Learning and Relearning cards walk through the configured sub-day steps
//! before graduating to Review.

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;
use tracing::debug;

use super::{ReviewScheduler, SchedulerConfig};
use crate::card::{Card, Rating, State};
use crate::error::{CoreError, InvalidStateError, Result};

const MIN_STABILITY: f64 = 0.001;
const MAX_STABILITY: f64 = 36_500.0;
/// Hard ceiling for unbounded intervals; keeps `Duration::days` in range.
const INTERVAL_CEILING_DAYS: i64 = u32::MAX as i64;
const MIN_DIFFICULTY: f64 = 1.0;
const MAX_DIFFICULTY: f64 = 10.0;

/// (start day, end day, factor) bands for interval fuzzing.
const FUZZ_RANGES: [(f64, f64, f64); 3] = [
    (2.5, 7.0, 0.15),
    (7.0, 20.0, 0.1),
    (20.0, f64::INFINITY, 0.05),
];

/// FSRS-6 scheduler.
#[derive(Debug, Clone)]
pub struct FsrsScheduler {
    config: SchedulerConfig,
    decay: f64,
    factor: f64,
    fuzz_seed: u64,
}

impl FsrsScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let decay = config.decay();
        let factor = 0.9f64.powf(1.0 / decay) - 1.0;
        Self {
            config,
            decay,
            factor,
            fuzz_seed: 0,
        }
    }

    /// Seed for the fuzz generator. Only matters when fuzzing is enabled.
    pub fn with_fuzz_seed(mut self, seed: u64) -> Self {
        self.fuzz_seed = seed;
        self
    }

    fn w(&self, i: usize) -> f64 {
        self.config.parameters()[i]
    }

    // ── Memory model ─────────────────────────────────────────────────

    fn initial_stability(&self, rating: Rating) -> f64 {
        let index = match rating {
            Rating::Again => 0,
            Rating::Hard => 1,
            Rating::Good => 2,
            Rating::Easy => 3,
        };
        self.w(index).max(MIN_STABILITY)
    }

    fn initial_difficulty(&self, rating: Rating) -> f64 {
        self.w(4) - (self.w(5) * (rating.value() - 1.0)).exp() + 1.0
    }

    fn next_difficulty(&self, difficulty: f64, rating: Rating) -> f64 {
        let delta = -(self.w(6) * (rating.value() - 3.0));
        let damped = difficulty + (10.0 - difficulty) * delta / 9.0;
        let reverted =
            self.w(7) * self.initial_difficulty(Rating::Easy) + (1.0 - self.w(7)) * damped;
        reverted.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
    }

    fn short_term_stability(&self, stability: f64, rating: Rating) -> f64 {
        let mut increase = (self.w(17) * (rating.value() - 3.0 + self.w(18))).exp()
            * stability.powf(-self.w(19));
        if matches!(rating, Rating::Good | Rating::Easy) {
            increase = increase.max(1.0);
        }
        stability * increase
    }

    fn next_recall_stability(&self, d: f64, s: f64, r: f64, rating: Rating) -> f64 {
        let hard_penalty = if rating == Rating::Hard { self.w(15) } else { 1.0 };
        let easy_bonus = if rating == Rating::Easy { self.w(16) } else { 1.0 };
        s * (1.0
            + self.w(8).exp()
                * (11.0 - d)
                * s.powf(-self.w(9))
                * (((1.0 - r) * self.w(10)).exp() - 1.0)
                * hard_penalty
                * easy_bonus)
    }

    fn next_forget_stability(&self, d: f64, s: f64, r: f64) -> f64 {
        let long_term = self.w(11)
            * d.powf(-self.w(12))
            * ((s + 1.0).powf(self.w(13)) - 1.0)
            * ((1.0 - r) * self.w(14)).exp();
        let short_term = s / (self.w(17) * self.w(18)).exp();
        long_term.min(short_term)
    }

    /// Updates stability and difficulty on `next`, returning the new stability.
    fn update_memory(
        &self,
        card: &Card,
        next: &mut Card,
        rating: Rating,
        at: DateTime<Utc>,
    ) -> Result<f64> {
        let stability = match (card.stability, card.difficulty) {
            (Some(s), Some(d)) => {
                let same_day = card
                    .last_review
                    .is_some_and(|last| (at - last).num_days() < 1);
                let stability = if same_day {
                    self.short_term_stability(s, rating)
                } else {
                    let r = self.retrievability(card, at);
                    match rating {
                        Rating::Again => self.next_forget_stability(d, s, r),
                        _ => self.next_recall_stability(d, s, r, rating),
                    }
                };
                next.difficulty = Some(self.next_difficulty(d, rating));
                stability
            }
            _ if matches!(card.state, State::New | State::Learning) => {
                next.difficulty = Some(
                    self.initial_difficulty(rating)
                        .clamp(MIN_DIFFICULTY, MAX_DIFFICULTY),
                );
                self.initial_stability(rating)
            }
            _ => {
                return Err(InvalidStateError::MissingMemoryState { state: card.state }.into());
            }
        };
        let stability = stability.clamp(MIN_STABILITY, MAX_STABILITY);
        next.stability = Some(stability);
        Ok(stability)
    }

    // ── Intervals ────────────────────────────────────────────────────

    fn next_interval_days(&self, stability: f64) -> i64 {
        let raw = stability / self.factor
            * (self.config.desired_retention().powf(1.0 / self.decay) - 1.0);
        let days = (raw.round() as i64).clamp(1, INTERVAL_CEILING_DAYS);
        match self.config.maximum_interval() {
            Some(max) => days.min(i64::from(max)),
            None => days,
        }
    }

    fn graduate(&self, next: &mut Card, stability: f64) -> Duration {
        next.state = State::Review;
        next.step = None;
        Duration::days(self.next_interval_days(stability))
    }

    /// Step handling shared by Learning and Relearning.
    fn walk_steps(
        &self,
        next: &mut Card,
        rating: Rating,
        stability: f64,
        steps: &[Duration],
        stepped: State,
    ) -> Duration {
        let step = next.step.unwrap_or(0);
        if steps.is_empty() || (step >= steps.len() && rating.is_success()) {
            return self.graduate(next, stability);
        }

        match rating {
            Rating::Again => {
                next.state = stepped;
                next.step = Some(0);
                steps[0]
            }
            Rating::Hard => {
                next.state = stepped;
                next.step = Some(step);
                match (step, steps.len()) {
                    (0, 1) => scale(steps[0], 1.5),
                    (0, _) => (steps[0] + steps[1]) / 2,
                    _ => steps[step],
                }
            }
            Rating::Good if step + 1 < steps.len() => {
                next.state = stepped;
                next.step = Some(step + 1);
                steps[step + 1]
            }
            Rating::Good | Rating::Easy => self.graduate(next, stability),
        }
    }

    fn fuzz(&self, interval: Duration, at: DateTime<Utc>) -> Duration {
        let days = interval.num_days() as f64;
        if days < 2.5 {
            return interval;
        }

        let delta = FUZZ_RANGES
            .iter()
            .fold(1.0, |acc, (start, end, factor)| {
                acc + factor * (days.min(*end) - start).max(0.0)
            });
        let max_days = match self.config.maximum_interval() {
            Some(max) => ((days + delta).round() as i64).min(i64::from(max)),
            None => (days + delta).round() as i64,
        };
        let min_days = ((days - delta).round() as i64).max(2).min(max_days);

        let mut rng = Mcg128Xsl64::seed_from_u64(self.fuzz_seed ^ at.timestamp() as u64);
        Duration::days(rng.gen_range(min_days..=max_days))
    }
}

fn scale(duration: Duration, factor: f64) -> Duration {
    Duration::milliseconds((duration.num_milliseconds() as f64 * factor).round() as i64)
}

impl ReviewScheduler for FsrsScheduler {
    fn from_config(config: SchedulerConfig) -> Self {
        Self::new(config)
    }

    fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn review(&self, card: &Card, rating: Rating, at: DateTime<Utc>) -> Result<Card> {
        if card.state.is_stepped() && card.step.is_none() {
            return Err(InvalidStateError::MissingStep { state: card.state }.into());
        }

        let mut next = card.clone();
        let stability = self.update_memory(card, &mut next, rating, at)?;

        let interval = match card.state {
            State::New | State::Learning => self.walk_steps(
                &mut next,
                rating,
                stability,
                self.config.learning_steps(),
                State::Learning,
            ),
            State::Relearning => self.walk_steps(
                &mut next,
                rating,
                stability,
                self.config.relearning_steps(),
                State::Relearning,
            ),
            State::Review => match self.config.relearning_steps().first() {
                Some(first) if rating == Rating::Again => {
                    next.state = State::Relearning;
                    next.step = Some(0);
                    *first
                }
                _ => Duration::days(self.next_interval_days(stability)),
            },
        };

        let interval = if self.config.enable_fuzzing() && next.state == State::Review {
            self.fuzz(interval, at)
        } else {
            interval
        };

        next.due = at.checked_add_signed(interval).ok_or_else(|| {
            CoreError::Scheduler(format!(
                "next due date is out of range: {} days after {at}",
                interval.num_days()
            ))
        })?;
        next.last_review = Some(at);

        debug!(
            card = %card.id,
            %rating,
            from = %card.state,
            to = %next.state,
            stability,
            due = %next.due,
            "reviewed card"
        );
        Ok(next)
    }

    fn retrievability(&self, card: &Card, at: DateTime<Utc>) -> f64 {
        match (card.stability, card.last_review) {
            (Some(stability), Some(last)) => {
                let elapsed = (at - last).num_days().max(0) as f64;
                (1.0 + self.factor * elapsed / stability).powf(self.decay)
            }
            _ => 0.0,
        }
    }
}
