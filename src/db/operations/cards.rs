use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::db::Database;
use crate::services::scheduler::{ScheduleUpdate, INITIAL_EASE_FACTOR};

pub const CARD_TYPE_QUESTION_ANSWER: &str = "question-answer";
pub const CARD_TYPE_MULTIPLE_CHOICE: &str = "multiple-choice";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: String,
    pub deck_id: String,
    pub question: String,
    pub answer: String,
    pub card_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub repetition: i32,
    pub ease_factor: f64,
    pub interval_days: i32,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFlashcard {
    pub deck_id: String,
    pub question: String,
    pub answer: String,
    pub card_type: String,
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct CardContentUpdate {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub card_type: Option<String>,
    pub options: Option<Option<Vec<String>>>,
}

const CARD_COLUMNS: &str = r#""id", "deckId", "question", "answer", "cardType", "options",
    "repetition", "easeFactor", "intervalDays", "dueDate", "createdAt", "updatedAt""#;

/// New cards are immediately due with a fresh one-day schedule.
pub async fn insert_card(db: &Database, card: &NewFlashcard) -> Result<Flashcard, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();
    let options = card
        .options
        .as_ref()
        .map(|values| serde_json::json!(values));

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO "flashcards" (
            "id", "deckId", "question", "answer", "cardType", "options",
            "repetition", "easeFactor", "intervalDays", "dueDate", "createdAt", "updatedAt"
        ) VALUES ($1, $2, $3, $4, $5, $6, 0, $7, 1, $8, $8, $8)
        RETURNING {CARD_COLUMNS}
        "#
    ))
    .bind(&id)
    .bind(&card.deck_id)
    .bind(&card.question)
    .bind(&card.answer)
    .bind(&card.card_type)
    .bind(options)
    .bind(INITIAL_EASE_FACTOR)
    .bind(now)
    .fetch_one(db.pool())
    .await?;

    Ok(map_card(&row))
}

pub async fn get_card(db: &Database, card_id: &str) -> Result<Option<Flashcard>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"SELECT {CARD_COLUMNS} FROM "flashcards" WHERE "id" = $1 LIMIT 1"#
    ))
    .bind(card_id)
    .fetch_optional(db.pool())
    .await?;

    Ok(row.map(|r| map_card(&r)))
}

/// Fetches a card together with the id of the user owning its deck, so the
/// caller can authorize before mutating anything.
pub async fn get_card_with_owner(
    db: &Database,
    card_id: &str,
) -> Result<Option<(Flashcard, String)>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT c."id", c."deckId", c."question", c."answer", c."cardType", c."options",
               c."repetition", c."easeFactor", c."intervalDays", c."dueDate",
               c."createdAt", c."updatedAt", d."ownerId"
        FROM "flashcards" c
        JOIN "decks" d ON d."id" = c."deckId"
        WHERE c."id" = $1
        LIMIT 1
        "#,
    )
    .bind(card_id)
    .fetch_optional(db.pool())
    .await?;

    Ok(row.map(|r| {
        let owner_id: String = r.try_get("ownerId").unwrap_or_default();
        (map_card(&r), owner_id)
    }))
}

pub async fn list_deck_cards(db: &Database, deck_id: &str) -> Result<Vec<Flashcard>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {CARD_COLUMNS} FROM "flashcards"
        WHERE "deckId" = $1
        ORDER BY "createdAt" ASC
        "#
    ))
    .bind(deck_id)
    .fetch_all(db.pool())
    .await?;

    Ok(rows.iter().map(map_card).collect())
}

pub async fn list_due_cards(
    db: &Database,
    deck_id: &str,
    as_of: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Flashcard>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {CARD_COLUMNS} FROM "flashcards"
        WHERE "deckId" = $1 AND "dueDate" <= $2
        ORDER BY "dueDate" ASC
        LIMIT $3
        "#
    ))
    .bind(deck_id)
    .bind(as_of.naive_utc())
    .bind(limit)
    .fetch_all(db.pool())
    .await?;

    Ok(rows.iter().map(map_card).collect())
}

pub async fn update_card_content(
    db: &Database,
    card_id: &str,
    update: &CardContentUpdate,
) -> Result<Option<Flashcard>, sqlx::Error> {
    let options = update
        .options
        .as_ref()
        .map(|value| value.as_ref().map(|values| serde_json::json!(values)));

    let row = sqlx::query(&format!(
        r#"
        UPDATE "flashcards" SET
            "question" = COALESCE($2, "question"),
            "answer" = COALESCE($3, "answer"),
            "cardType" = COALESCE($4, "cardType"),
            "options" = CASE WHEN $5 THEN $6 ELSE "options" END,
            "updatedAt" = $7
        WHERE "id" = $1
        RETURNING {CARD_COLUMNS}
        "#
    ))
    .bind(card_id)
    .bind(&update.question)
    .bind(&update.answer)
    .bind(&update.card_type)
    .bind(update.options.is_some())
    .bind(options.flatten())
    .bind(Utc::now().naive_utc())
    .fetch_optional(db.pool())
    .await?;

    Ok(row.map(|r| map_card(&r)))
}

/// Writes the four scheduling fields in one statement, so a failed review
/// leaves the card either fully updated or fully unchanged.
pub async fn update_card_schedule(
    db: &Database,
    card_id: &str,
    update: &ScheduleUpdate,
) -> Result<Flashcard, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE "flashcards" SET
            "repetition" = $2,
            "easeFactor" = $3,
            "intervalDays" = $4,
            "dueDate" = $5,
            "updatedAt" = $6
        WHERE "id" = $1
        RETURNING {CARD_COLUMNS}
        "#
    ))
    .bind(card_id)
    .bind(update.repetition)
    .bind(update.ease_factor)
    .bind(update.interval_days)
    .bind(update.due_date.naive_utc())
    .bind(Utc::now().naive_utc())
    .fetch_optional(db.pool())
    .await?;

    row.map(|r| map_card(&r)).ok_or(sqlx::Error::RowNotFound)
}

pub async fn delete_card(db: &Database, card_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "flashcards" WHERE "id" = $1"#)
        .bind(card_id)
        .execute(db.pool())
        .await?;

    Ok(result.rows_affected() > 0)
}

fn map_card(row: &PgRow) -> Flashcard {
    let due_date: NaiveDateTime = row
        .try_get("dueDate")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let created_at: NaiveDateTime = row
        .try_get("createdAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at: NaiveDateTime = row
        .try_get("updatedAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let options: Option<serde_json::Value> = row.try_get("options").ok();

    Flashcard {
        id: row.try_get("id").unwrap_or_default(),
        deck_id: row.try_get("deckId").unwrap_or_default(),
        question: row.try_get("question").unwrap_or_default(),
        answer: row.try_get("answer").unwrap_or_default(),
        card_type: row
            .try_get("cardType")
            .unwrap_or_else(|_| CARD_TYPE_QUESTION_ANSWER.to_string()),
        options: options.and_then(|value| serde_json::from_value(value).ok()),
        repetition: row.try_get("repetition").unwrap_or(0),
        ease_factor: row.try_get("easeFactor").unwrap_or(INITIAL_EASE_FACTOR),
        interval_days: row.try_get("intervalDays").unwrap_or(1),
        due_date: as_utc(due_date),
        created_at: as_utc(created_at),
        updated_at: as_utc(updated_at),
    }
}

pub(crate) fn as_utc(value: NaiveDateTime) -> DateTime<Utc> {
    DateTime::<Utc>::from_naive_utc_and_offset(value, Utc)
}
