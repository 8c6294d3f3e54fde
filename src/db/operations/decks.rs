use chrono::{DateTime, NaiveDateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::db::operations::cards::as_utc;
use crate::db::Database;

const SHARE_ID_LEN: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub is_shared: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDeck {
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DeckUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

const DECK_COLUMNS: &str = r#""id", "ownerId", "title", "description", "color",
    "isShared", "shareId", "createdAt", "updatedAt""#;

pub async fn insert_deck(db: &Database, deck: &NewDeck) -> Result<Deck, sqlx::Error> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();

    let row = sqlx::query(&format!(
        r#"
        INSERT INTO "decks" ("id", "ownerId", "title", "description", "color", "createdAt", "updatedAt")
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING {DECK_COLUMNS}
        "#
    ))
    .bind(&id)
    .bind(&deck.owner_id)
    .bind(&deck.title)
    .bind(&deck.description)
    .bind(&deck.color)
    .bind(now)
    .fetch_one(db.pool())
    .await?;

    Ok(map_deck(&row))
}

pub async fn get_deck(db: &Database, deck_id: &str) -> Result<Option<Deck>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"SELECT {DECK_COLUMNS} FROM "decks" WHERE "id" = $1 LIMIT 1"#
    ))
    .bind(deck_id)
    .fetch_optional(db.pool())
    .await?;

    Ok(row.map(|r| map_deck(&r)))
}

pub async fn list_user_decks(db: &Database, owner_id: &str) -> Result<Vec<Deck>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {DECK_COLUMNS} FROM "decks"
        WHERE "ownerId" = $1
        ORDER BY "createdAt" DESC
        "#
    ))
    .bind(owner_id)
    .fetch_all(db.pool())
    .await?;

    Ok(rows.iter().map(map_deck).collect())
}

pub async fn update_deck(
    db: &Database,
    deck_id: &str,
    update: &DeckUpdate,
) -> Result<Option<Deck>, sqlx::Error> {
    let row = sqlx::query(&format!(
        r#"
        UPDATE "decks" SET
            "title" = COALESCE($2, "title"),
            "description" = COALESCE($3, "description"),
            "color" = COALESCE($4, "color"),
            "updatedAt" = $5
        WHERE "id" = $1
        RETURNING {DECK_COLUMNS}
        "#
    ))
    .bind(deck_id)
    .bind(&update.title)
    .bind(&update.description)
    .bind(&update.color)
    .bind(Utc::now().naive_utc())
    .fetch_optional(db.pool())
    .await?;

    Ok(row.map(|r| map_deck(&r)))
}

/// Cards are owned by their deck; the ON DELETE CASCADE on "flashcards"
/// removes them with it.
pub async fn delete_deck(db: &Database, deck_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM "decks" WHERE "id" = $1"#)
        .bind(deck_id)
        .execute(db.pool())
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Enabling sharing mints a share id on first use and keeps it stable after
/// that, so previously distributed links survive a disable/enable cycle.
pub async fn set_deck_sharing(
    db: &Database,
    deck_id: &str,
    enabled: bool,
) -> Result<Option<Deck>, sqlx::Error> {
    let share_id = if enabled {
        Some(new_share_id())
    } else {
        None
    };

    let row = sqlx::query(&format!(
        r#"
        UPDATE "decks" SET
            "isShared" = $2,
            "shareId" = CASE
                WHEN NOT $2 THEN "shareId"
                WHEN "shareId" IS NULL THEN $3
                ELSE "shareId"
            END,
            "updatedAt" = $4
        WHERE "id" = $1
        RETURNING {DECK_COLUMNS}
        "#
    ))
    .bind(deck_id)
    .bind(enabled)
    .bind(share_id)
    .bind(Utc::now().naive_utc())
    .fetch_optional(db.pool())
    .await?;

    Ok(row.map(|r| map_deck(&r)))
}

fn new_share_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SHARE_ID_LEN)
        .map(char::from)
        .collect()
}

fn map_deck(row: &PgRow) -> Deck {
    let created_at: NaiveDateTime = row
        .try_get("createdAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at: NaiveDateTime = row
        .try_get("updatedAt")
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Deck {
        id: row.try_get("id").unwrap_or_default(),
        owner_id: row.try_get("ownerId").unwrap_or_default(),
        title: row.try_get("title").unwrap_or_default(),
        description: row.try_get("description").ok(),
        color: row.try_get("color").ok(),
        is_shared: row.try_get("isShared").unwrap_or(false),
        share_id: row.try_get("shareId").ok(),
        created_at: as_utc(created_at),
        updated_at: as_utc(updated_at),
    }
}
