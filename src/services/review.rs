use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db::operations::cards::Flashcard;
use crate::services::progress::{self, UserProgress};
use crate::services::scheduler::{
    self, ScheduleUpdate, SchedulerError, SchedulingState, QUALITY_MAX, QUALITY_PASS_THRESHOLD,
};

/// Persistence operations the review pipeline needs. `db::Database` is the
/// production implementation; tests supply an in-memory one.
///
/// The store is the only serialization point for concurrent reviews of the
/// same card: two submissions can both read the pre-review state and race to
/// write, and last-write-wins on the scheduling columns is the accepted
/// outcome. No version check is made on the write.
pub trait ReviewStore {
    fn get_card_with_owner(
        &self,
        card_id: &str,
    ) -> impl Future<Output = Result<Option<(Flashcard, String)>, sqlx::Error>> + Send;

    /// Must write all four scheduling fields atomically, or nothing.
    fn update_card_schedule(
        &self,
        card_id: &str,
        update: &ScheduleUpdate,
    ) -> impl Future<Output = Result<Flashcard, sqlx::Error>> + Send;

    fn get_progress(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<UserProgress, sqlx::Error>> + Send;

    fn update_progress(
        &self,
        user_id: &str,
        progress: &UserProgress,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    fn list_due_cards(
        &self,
        deck_id: &str,
        as_of: DateTime<Utc>,
        limit: i64,
    ) -> impl Future<Output = Result<Vec<Flashcard>, sqlx::Error>> + Send;
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("quality must be an integer between 0 and {QUALITY_MAX}")]
    InvalidInput,
    #[error("flashcard not found")]
    NotFound,
    #[error("flashcard belongs to another user")]
    Forbidden,
    #[error(transparent)]
    Persistence(#[from] sqlx::Error),
}

impl From<SchedulerError> for ReviewError {
    fn from(_: SchedulerError) -> Self {
        ReviewError::InvalidInput
    }
}

/// Runs one review submission end to end: fetch, authorize, schedule,
/// persist, and award study credit.
///
/// The credit update (points and streak) is strictly best-effort: it only
/// runs after the schedule write has committed and a failure in it is logged
/// and swallowed, never surfaced to the caller. The returned card always
/// reflects the persisted scheduling state.
pub async fn submit_review<S: ReviewStore + Sync>(
    store: &S,
    card_id: &str,
    user_id: &str,
    quality: i32,
    now: DateTime<Utc>,
) -> Result<Flashcard, ReviewError> {
    // Validated up front so an out-of-range rating cannot cause any reads or
    // writes; the scheduler re-checks as part of its own contract.
    if !(0..=QUALITY_MAX).contains(&quality) {
        return Err(ReviewError::InvalidInput);
    }

    let (card, owner_id) = store
        .get_card_with_owner(card_id)
        .await?
        .ok_or(ReviewError::NotFound)?;

    if owner_id != user_id {
        return Err(ReviewError::Forbidden);
    }

    let state = SchedulingState {
        repetition: card.repetition,
        ease_factor: card.ease_factor,
        interval_days: card.interval_days,
    };
    let update = scheduler::compute_next_state(&state, quality, now)?;

    let updated = store.update_card_schedule(card_id, &update).await?;

    if quality >= QUALITY_PASS_THRESHOLD {
        if let Err(err) = award_study_credit(store, user_id, now).await {
            tracing::warn!(error = %err, user_id, card_id, "study credit update failed");
        }
    }

    Ok(updated)
}

async fn award_study_credit<S: ReviewStore + Sync>(
    store: &S,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let current = store.get_progress(user_id).await?;
    let next = progress::advance_progress(&current, now);
    store.update_progress(user_id, &next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use chrono::Duration;
    use parking_lot::Mutex;

    use crate::services::scheduler::INITIAL_EASE_FACTOR;

    #[derive(Default)]
    struct MemoryStore {
        cards: Mutex<HashMap<String, (Flashcard, String)>>,
        progress: Mutex<HashMap<String, UserProgress>>,
        fail_schedule_writes: bool,
        fail_progress: bool,
    }

    impl MemoryStore {
        fn with_card(card: Flashcard, owner_id: &str) -> Self {
            let store = Self::default();
            store
                .cards
                .lock()
                .insert(card.id.clone(), (card, owner_id.to_string()));
            store
        }

        fn card(&self, card_id: &str) -> Flashcard {
            self.cards.lock().get(card_id).unwrap().0.clone()
        }

        fn stored_progress(&self, user_id: &str) -> Option<UserProgress> {
            self.progress.lock().get(user_id).cloned()
        }
    }

    impl ReviewStore for MemoryStore {
        async fn get_card_with_owner(
            &self,
            card_id: &str,
        ) -> Result<Option<(Flashcard, String)>, sqlx::Error> {
            Ok(self.cards.lock().get(card_id).cloned())
        }

        async fn update_card_schedule(
            &self,
            card_id: &str,
            update: &ScheduleUpdate,
        ) -> Result<Flashcard, sqlx::Error> {
            if self.fail_schedule_writes {
                return Err(sqlx::Error::PoolClosed);
            }
            let mut cards = self.cards.lock();
            let (card, _) = cards.get_mut(card_id).ok_or(sqlx::Error::RowNotFound)?;
            card.repetition = update.repetition;
            card.ease_factor = update.ease_factor;
            card.interval_days = update.interval_days;
            card.due_date = update.due_date;
            Ok(card.clone())
        }

        async fn get_progress(&self, user_id: &str) -> Result<UserProgress, sqlx::Error> {
            if self.fail_progress {
                return Err(sqlx::Error::PoolClosed);
            }
            Ok(self
                .progress
                .lock()
                .get(user_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn update_progress(
            &self,
            user_id: &str,
            progress: &UserProgress,
        ) -> Result<(), sqlx::Error> {
            if self.fail_progress {
                return Err(sqlx::Error::PoolClosed);
            }
            self.progress
                .lock()
                .insert(user_id.to_string(), progress.clone());
            Ok(())
        }

        async fn list_due_cards(
            &self,
            deck_id: &str,
            as_of: DateTime<Utc>,
            _limit: i64,
        ) -> Result<Vec<Flashcard>, sqlx::Error> {
            let mut due: Vec<Flashcard> = self
                .cards
                .lock()
                .values()
                .filter(|(card, _)| card.deck_id == deck_id && card.due_date <= as_of)
                .map(|(card, _)| card.clone())
                .collect();
            due.sort_by_key(|card| card.due_date);
            Ok(due)
        }
    }

    fn sample_card(repetition: i32, ease_factor: f64, interval_days: i32) -> Flashcard {
        let now = Utc::now();
        Flashcard {
            id: "card-1".to_string(),
            deck_id: "deck-1".to_string(),
            question: "capital of France?".to_string(),
            answer: "Paris".to_string(),
            card_type: "question-answer".to_string(),
            options: None,
            repetition,
            ease_factor,
            interval_days,
            due_date: now - Duration::days(1),
            created_at: now - Duration::days(30),
            updated_at: now - Duration::days(1),
        }
    }

    #[tokio::test]
    async fn successful_review_updates_schedule_and_awards_points() {
        let store = MemoryStore::with_card(sample_card(1, INITIAL_EASE_FACTOR, 6), "owner");
        let now = Utc::now();

        let updated = submit_review(&store, "card-1", "owner", 5, now).await.unwrap();

        assert_eq!(updated.repetition, 2);
        assert!((updated.ease_factor - 2.6).abs() < 1e-9);
        assert_eq!(updated.interval_days, 6);
        assert_eq!(updated.due_date, now + Duration::days(6));

        let progress = store.stored_progress("owner").unwrap();
        assert_eq!(progress.points, 10);
        assert_eq!(progress.current_streak, 1);
    }

    #[tokio::test]
    async fn lapse_is_recorded_without_points() {
        let store = MemoryStore::with_card(sample_card(4, 2.2, 20), "owner");

        let updated = submit_review(&store, "card-1", "owner", 1, Utc::now()).await.unwrap();

        assert_eq!(updated.repetition, 0);
        assert_eq!(updated.interval_days, 1);
        assert_eq!(updated.ease_factor, 2.2);
        assert!(store.stored_progress("owner").is_none());
    }

    #[tokio::test]
    async fn review_of_foreign_card_is_forbidden_and_writes_nothing() {
        let store = MemoryStore::with_card(sample_card(1, INITIAL_EASE_FACTOR, 6), "user-b");
        let before = store.card("card-1");

        let err = submit_review(&store, "card-1", "user-a", 4, Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, ReviewError::Forbidden));
        let after = store.card("card-1");
        assert_eq!(after.repetition, before.repetition);
        assert_eq!(after.due_date, before.due_date);
        assert!(store.stored_progress("user-a").is_none());
    }

    #[tokio::test]
    async fn unknown_card_is_not_found() {
        let store = MemoryStore::default();
        let err = submit_review(&store, "missing", "owner", 4, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ReviewError::NotFound));
    }

    #[tokio::test]
    async fn invalid_quality_is_rejected_before_any_read() {
        let store = MemoryStore::with_card(sample_card(0, INITIAL_EASE_FACTOR, 1), "owner");
        for quality in [-1, 6, 100] {
            let err = submit_review(&store, "card-1", "owner", quality, Utc::now())
                .await
                .unwrap_err();
            assert!(matches!(err, ReviewError::InvalidInput));
        }
        assert_eq!(store.card("card-1").repetition, 0);
    }

    #[tokio::test]
    async fn schedule_write_failure_propagates_and_skips_credit() {
        let mut store = MemoryStore::with_card(sample_card(1, INITIAL_EASE_FACTOR, 6), "owner");
        store.fail_schedule_writes = true;

        let err = submit_review(&store, "card-1", "owner", 5, Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, ReviewError::Persistence(_)));
        assert!(store.stored_progress("owner").is_none());
    }

    #[tokio::test]
    async fn credit_failure_does_not_fail_the_review() {
        let mut store = MemoryStore::with_card(sample_card(1, INITIAL_EASE_FACTOR, 6), "owner");
        store.fail_progress = true;

        let updated = submit_review(&store, "card-1", "owner", 5, Utc::now()).await.unwrap();

        // the schedule write committed even though the credit update failed
        assert_eq!(updated.repetition, 2);
        assert_eq!(store.card("card-1").repetition, 2);
    }

    #[tokio::test]
    async fn same_day_reviews_accrue_points_but_hold_streak() {
        let store = MemoryStore::with_card(sample_card(0, INITIAL_EASE_FACTOR, 1), "owner");
        let now = Utc::now();

        submit_review(&store, "card-1", "owner", 4, now).await.unwrap();
        submit_review(&store, "card-1", "owner", 4, now + Duration::hours(2))
            .await
            .unwrap();

        let progress = store.stored_progress("owner").unwrap();
        assert_eq!(progress.points, 20);
        assert_eq!(progress.current_streak, 1);
    }
}
