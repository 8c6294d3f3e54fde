use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Points awarded per qualifying review (quality >= 3). No cap.
pub const POINTS_PER_REVIEW: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub points: i64,
    pub current_streak: i32,
    pub last_studied_at: Option<DateTime<Utc>>,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            points: 0,
            current_streak: 0,
            last_studied_at: None,
        }
    }
}

/// Applies one qualifying review to a user's progress. Streaks compare UTC
/// calendar days: a second review on the same day holds the streak, a review
/// on the next day extends it, and any gap resets it to 1.
pub fn advance_progress(progress: &UserProgress, now: DateTime<Utc>) -> UserProgress {
    let today = now.date_naive();

    let current_streak = match progress.last_studied_at.map(|at| at.date_naive()) {
        None => 1,
        Some(last_day) => match (today - last_day).num_days() {
            0 => progress.current_streak,
            1 => progress.current_streak + 1,
            _ => 1,
        },
    };

    UserProgress {
        points: progress.points + POINTS_PER_REVIEW,
        current_streak,
        last_studied_at: Some(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn streak_lifecycle() {
        let day1 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();

        // first qualifying review ever
        let p1 = advance_progress(&UserProgress::default(), day1);
        assert_eq!(p1.points, 10);
        assert_eq!(p1.current_streak, 1);
        assert_eq!(p1.last_studied_at, Some(day1));

        // second review the same day: points accrue, streak holds
        let later_same_day = day1 + Duration::hours(8);
        let p2 = advance_progress(&p1, later_same_day);
        assert_eq!(p2.points, 20);
        assert_eq!(p2.current_streak, 1);

        // one calendar day later: streak extends
        let next_day = day1 + Duration::days(1);
        let p3 = advance_progress(&p2, next_day);
        assert_eq!(p3.current_streak, 2);

        // three-day gap: streak resets
        let after_gap = next_day + Duration::days(3);
        let p4 = advance_progress(&p3, after_gap);
        assert_eq!(p4.current_streak, 1);
        assert_eq!(p4.points, 40);
    }

    #[test]
    fn day_boundary_counts_as_consecutive() {
        // 23:50 followed by 00:10 the next day is still "yesterday -> today"
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 23, 50, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 3, 2, 0, 10, 0).unwrap();

        let p1 = advance_progress(&UserProgress::default(), late);
        let p2 = advance_progress(&p1, early);
        assert_eq!(p2.current_streak, 2);
    }
}
