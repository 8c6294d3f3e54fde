pub mod cards;
pub mod decks;
pub mod profile;

use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::services::progress::UserProgress;
use crate::services::review::ReviewStore;
use crate::services::scheduler::ScheduleUpdate;

use self::cards::Flashcard;

/// The Postgres-backed persistence collaborator for the review pipeline.
impl ReviewStore for Database {
    async fn get_card_with_owner(
        &self,
        card_id: &str,
    ) -> Result<Option<(Flashcard, String)>, sqlx::Error> {
        cards::get_card_with_owner(self, card_id).await
    }

    async fn update_card_schedule(
        &self,
        card_id: &str,
        update: &ScheduleUpdate,
    ) -> Result<Flashcard, sqlx::Error> {
        cards::update_card_schedule(self, card_id, update).await
    }

    async fn get_progress(&self, user_id: &str) -> Result<UserProgress, sqlx::Error> {
        profile::get_progress(self, user_id).await
    }

    async fn update_progress(
        &self,
        user_id: &str,
        progress: &UserProgress,
    ) -> Result<(), sqlx::Error> {
        profile::upsert_progress(self, user_id, progress).await
    }

    async fn list_due_cards(
        &self,
        deck_id: &str,
        as_of: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Flashcard>, sqlx::Error> {
        cards::list_due_cards(self, deck_id, as_of, limit).await
    }
}
