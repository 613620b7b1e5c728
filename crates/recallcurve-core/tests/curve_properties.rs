//! Property tests for curve construction and retention replay.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use recallcurve_core::{
    apply_rating, apply_retention_change, build_curve, Card, CurveOptions, DueMarker,
    FsrsScheduler, Rating, ReplayOutcome, ReviewScheduler, SchedulerConfig, State,
};

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn rating() -> impl Strategy<Value = Rating> {
    prop::sample::select(Rating::ALL.to_vec())
}

fn retention() -> impl Strategy<Value = f64> {
    (50u32..=95).prop_map(|pct| f64::from(pct) / 100.0)
}

proptest! {
    #[test]
    fn cards_without_stability_have_no_points(
        state in prop::sample::select(vec![State::New, State::Learning, State::Relearning]),
        step in 0usize..1,
        offset_min in 0i64..10_000,
    ) {
        let mut card = Card::new(epoch() + Duration::minutes(offset_min));
        card.state = state;
        card.step = state.is_stepped().then_some(step);
        let scheduler = FsrsScheduler::new(SchedulerConfig::default());
        let plot = build_curve(&card, &scheduler, &CurveOptions::default()).unwrap();
        prop_assert!(plot.points.is_empty());
    }

    #[test]
    fn review_marker_is_truncated_day_difference(
        due_secs in 0i64..(3_000 * 86_400),
        stability in 0.5f64..500.0,
    ) {
        let mut card = Card::new(epoch() + Duration::seconds(due_secs));
        card.state = State::Review;
        card.stability = Some(stability);
        card.difficulty = Some(5.0);
        card.last_review = Some(epoch());
        let scheduler = FsrsScheduler::new(SchedulerConfig::default());
        let plot = build_curve(&card, &scheduler, &CurveOptions::default()).unwrap();

        let expected = u32::try_from(due_secs / 86_400).unwrap();
        prop_assert_eq!(plot.due_marker, DueMarker::Days { days: expected });
        prop_assert!(plot.domain.end >= expected);
        prop_assert!(plot
            .points
            .windows(2)
            .all(|w| w[1].retrievability <= w[0].retrievability));
    }

    #[test]
    fn unchanged_retention_returns_inputs(r in retention(), first in rating()) {
        let config = SchedulerConfig::new(r).unwrap();
        let scheduler = FsrsScheduler::new(config.clone());
        let (card, event) = apply_rating(&Card::new(epoch()), first, &scheduler).unwrap();

        let change =
            apply_retention_change::<FsrsScheduler>(&config, r, &card, Some(&event)).unwrap();
        prop_assert_eq!(change.outcome, ReplayOutcome::Unchanged);
        prop_assert_eq!(change.config, config);
        prop_assert_eq!(change.card, card);
    }

    #[test]
    fn replay_is_deterministic(
        ratings in prop::collection::vec(rating(), 1..6),
        new_retention in retention(),
    ) {
        let scheduler = FsrsScheduler::new(SchedulerConfig::default());
        let mut card = Card::new(epoch());
        let mut event = None;
        for r in ratings {
            let (next, captured) = apply_rating(&card, r, &scheduler).unwrap();
            card = next;
            event = Some(captured);
        }

        let a = apply_retention_change::<FsrsScheduler>(
            scheduler.config(), new_retention, &card, event.as_ref(),
        ).unwrap();
        let b = apply_retention_change::<FsrsScheduler>(
            scheduler.config(), new_retention, &card, event.as_ref(),
        ).unwrap();
        prop_assert_eq!(a, b);
    }
}
