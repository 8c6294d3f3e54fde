//! Property-based checks on the review scheduler:
//! - ease factor never drops below its floor
//! - failed reviews always collapse to a one-day interval without touching ease
//! - successful reviews always advance the repetition count
//! - the due date is always the review time plus the computed interval

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use deckrest_backend::services::scheduler::{
    compute_next_state, SchedulingState, MIN_EASE_FACTOR, QUALITY_PASS_THRESHOLD,
};

fn arb_state() -> impl Strategy<Value = SchedulingState> {
    (
        0i32..=50,
        (130u32..=400u32).prop_map(|v| v as f64 / 100.0),
        1i32..=3650,
    )
        .prop_map(|(repetition, ease_factor, interval_days)| SchedulingState {
            repetition,
            ease_factor,
            interval_days,
        })
}

fn arb_now() -> impl Strategy<Value = chrono::DateTime<Utc>> {
    (0i64..=4_000_000_000i64).prop_map(|secs| Utc.timestamp_opt(secs, 0).unwrap())
}

proptest! {
    #[test]
    fn ease_factor_never_below_floor(state in arb_state(), quality in 0i32..=5, now in arb_now()) {
        let update = compute_next_state(&state, quality, now).unwrap();
        prop_assert!(update.ease_factor >= MIN_EASE_FACTOR - 1e-9);
    }

    #[test]
    fn lapse_resets_schedule_and_keeps_ease(state in arb_state(), quality in 0i32..QUALITY_PASS_THRESHOLD, now in arb_now()) {
        let update = compute_next_state(&state, quality, now).unwrap();
        prop_assert_eq!(update.repetition, 0);
        prop_assert_eq!(update.interval_days, 1);
        prop_assert_eq!(update.ease_factor, state.ease_factor);
    }

    #[test]
    fn success_increments_repetition(state in arb_state(), quality in QUALITY_PASS_THRESHOLD..=5, now in arb_now()) {
        let update = compute_next_state(&state, quality, now).unwrap();
        prop_assert_eq!(update.repetition, state.repetition + 1);
        prop_assert!(update.interval_days >= 1);
    }

    #[test]
    fn due_date_is_now_plus_interval(state in arb_state(), quality in 0i32..=5, now in arb_now()) {
        let update = compute_next_state(&state, quality, now).unwrap();
        prop_assert_eq!(update.due_date, now + Duration::days(update.interval_days as i64));
    }

    #[test]
    fn out_of_range_quality_is_rejected(state in arb_state(), quality in prop_oneof![-100i32..0, 6i32..100], now in arb_now()) {
        prop_assert!(compute_next_state(&state, quality, now).is_err());
    }

    #[test]
    fn mature_success_never_shrinks_interval(state in arb_state(), quality in QUALITY_PASS_THRESHOLD..=5, now in arb_now()) {
        prop_assume!(state.repetition >= 2);
        let update = compute_next_state(&state, quality, now).unwrap();
        prop_assert!(update.interval_days >= state.interval_days);
    }
}
