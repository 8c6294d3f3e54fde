use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const INITIAL_EASE_FACTOR: f64 = 2.5;
pub const FIRST_INTERVAL_DAYS: i32 = 1;
pub const SECOND_INTERVAL_DAYS: i32 = 6;

/// Quality ratings at or above this value count as a successful recall.
pub const QUALITY_PASS_THRESHOLD: i32 = 3;
pub const QUALITY_MAX: i32 = 5;

/// The mutable scheduling fields of a flashcard, as read from storage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingState {
    pub repetition: i32,
    pub ease_factor: f64,
    pub interval_days: i32,
}

impl Default for SchedulingState {
    fn default() -> Self {
        Self {
            repetition: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            interval_days: FIRST_INTERVAL_DAYS,
        }
    }
}

/// The complete next scheduling state produced by a review. Nothing else
/// on the card is touched by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleUpdate {
    pub repetition: i32,
    pub ease_factor: f64,
    pub interval_days: i32,
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("quality must be an integer between 0 and {QUALITY_MAX}, got {0}")]
    QualityOutOfRange(i32),
    #[error("invalid scheduling state: {0}")]
    InvalidState(&'static str),
}

/// SM-2 transition: maps the current scheduling state and a quality rating
/// to the next state. Pure and total over valid inputs; `now` is passed in
/// so callers (and tests) control the clock.
///
/// A lapse (quality < 3) collapses the schedule back to a one-day interval
/// and resets the repetition count, leaving the ease factor untouched. A
/// success grows the interval: 1 day, then 6 days, then multiplicatively by
/// the updated ease factor, which never drops below 1.3.
pub fn compute_next_state(
    state: &SchedulingState,
    quality: i32,
    now: DateTime<Utc>,
) -> Result<ScheduleUpdate, SchedulerError> {
    if !(0..=QUALITY_MAX).contains(&quality) {
        return Err(SchedulerError::QualityOutOfRange(quality));
    }
    if state.repetition < 0 {
        return Err(SchedulerError::InvalidState("repetition must be non-negative"));
    }
    if state.ease_factor < MIN_EASE_FACTOR {
        return Err(SchedulerError::InvalidState("ease factor below minimum"));
    }
    if state.interval_days < 1 {
        return Err(SchedulerError::InvalidState("interval must be at least one day"));
    }

    let (repetition, ease_factor, interval_days) = if quality < QUALITY_PASS_THRESHOLD {
        (0, state.ease_factor, FIRST_INTERVAL_DAYS)
    } else {
        let spread = (QUALITY_MAX - quality) as f64;
        let ease_factor =
            (state.ease_factor + 0.1 - spread * (0.08 + spread * 0.02)).max(MIN_EASE_FACTOR);

        // The interval schedule keys off the repetition count *before* this
        // review, while the growth step uses the freshly updated ease factor.
        let interval_days = match state.repetition {
            0 => FIRST_INTERVAL_DAYS,
            1 => SECOND_INTERVAL_DAYS,
            _ => (state.interval_days as f64 * ease_factor).ceil() as i32,
        };

        (state.repetition + 1, ease_factor, interval_days)
    };

    // Whole days are added to the current moment, so the due date keeps the
    // time-of-day of the review rather than snapping to midnight.
    let due_date = now + Duration::days(interval_days as i64);

    Ok(ScheduleUpdate {
        repetition,
        ease_factor,
        interval_days,
        due_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(repetition: i32, ease_factor: f64, interval_days: i32) -> SchedulingState {
        SchedulingState {
            repetition,
            ease_factor,
            interval_days,
        }
    }

    #[test]
    fn lapse_resets_schedule_but_keeps_ease() {
        let now = Utc::now();
        for quality in 0..QUALITY_PASS_THRESHOLD {
            let next = compute_next_state(&state(4, 2.1, 30), quality, now).unwrap();
            assert_eq!(next.repetition, 0);
            assert_eq!(next.interval_days, 1);
            assert_eq!(next.ease_factor, 2.1);
            assert_eq!(next.due_date, now + Duration::days(1));
        }
    }

    #[test]
    fn first_two_successes_use_fixed_intervals() {
        let now = Utc::now();
        let first = compute_next_state(&SchedulingState::default(), 4, now).unwrap();
        assert_eq!(first.repetition, 1);
        assert_eq!(first.interval_days, FIRST_INTERVAL_DAYS);

        let second = compute_next_state(
            &state(first.repetition, first.ease_factor, first.interval_days),
            4,
            now,
        )
        .unwrap();
        assert_eq!(second.repetition, 2);
        assert_eq!(second.interval_days, SECOND_INTERVAL_DAYS);
    }

    #[test]
    fn third_success_grows_multiplicatively() {
        let now = Utc::now();
        let next = compute_next_state(&state(2, 2.5, 6), 4, now).unwrap();
        // quality 4 leaves ease at exactly 2.5: 0.1 - 1*(0.08 + 1*0.02) = 0
        assert!((next.ease_factor - 2.5).abs() < 1e-9);
        assert_eq!(next.interval_days, 15);
        assert_eq!(next.repetition, 3);
    }

    #[test]
    fn perfect_review_raises_ease() {
        let now = Utc::now();
        let next = compute_next_state(&state(1, 2.5, 6), 5, now).unwrap();
        assert!((next.ease_factor - 2.6).abs() < 1e-9);
        assert_eq!(next.interval_days, SECOND_INTERVAL_DAYS);
    }

    #[test]
    fn ease_factor_never_drops_below_floor() {
        let now = Utc::now();
        // quality 3 subtracts 0.14 per review; starting at the floor it must stay there
        let next = compute_next_state(&state(5, MIN_EASE_FACTOR, 10), 3, now).unwrap();
        assert_eq!(next.ease_factor, MIN_EASE_FACTOR);
        assert!(next.interval_days >= 1);
    }

    #[test]
    fn due_date_tracks_interval() {
        let now = Utc::now();
        let short = compute_next_state(&state(0, 2.5, 1), 4, now).unwrap();
        let long = compute_next_state(&state(6, 2.5, 40), 4, now).unwrap();
        assert!(short.due_date >= now);
        assert!(long.due_date > short.due_date);
        assert_eq!(long.due_date, now + Duration::days(long.interval_days as i64));
    }

    #[test]
    fn out_of_range_quality_is_rejected() {
        let now = Utc::now();
        let valid = SchedulingState::default();
        assert_eq!(
            compute_next_state(&valid, -1, now),
            Err(SchedulerError::QualityOutOfRange(-1))
        );
        assert_eq!(
            compute_next_state(&valid, 6, now),
            Err(SchedulerError::QualityOutOfRange(6))
        );
    }

    #[test]
    fn malformed_state_is_rejected() {
        let now = Utc::now();
        assert!(compute_next_state(&state(-1, 2.5, 1), 4, now).is_err());
        assert!(compute_next_state(&state(0, 1.2, 1), 4, now).is_err());
        assert!(compute_next_state(&state(0, 2.5, 0), 4, now).is_err());
    }
}
