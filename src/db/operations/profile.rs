use chrono::{NaiveDateTime, Utc};
use sqlx::Row;

use crate::db::operations::cards::as_utc;
use crate::db::Database;
use crate::services::progress::UserProgress;

/// Users with no row yet read as zero-initialized progress; the row is only
/// materialized by the first qualifying review.
pub async fn get_progress(db: &Database, user_id: &str) -> Result<UserProgress, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "points", "currentStreak", "lastStudiedAt"
        FROM "user_progress"
        WHERE "userId" = $1
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db.pool())
    .await?;

    let Some(row) = row else {
        return Ok(UserProgress::default());
    };

    let last_studied_at: Option<NaiveDateTime> = row.try_get("lastStudiedAt").ok();

    Ok(UserProgress {
        points: row.try_get("points").unwrap_or(0),
        current_streak: row.try_get("currentStreak").unwrap_or(0),
        last_studied_at: last_studied_at.map(as_utc),
    })
}

pub async fn upsert_progress(
    db: &Database,
    user_id: &str,
    progress: &UserProgress,
) -> Result<(), sqlx::Error> {
    let now = Utc::now().naive_utc();

    sqlx::query(
        r#"
        INSERT INTO "user_progress" ("userId", "points", "currentStreak", "lastStudiedAt", "updatedAt")
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT ("userId") DO UPDATE SET
            "points" = EXCLUDED."points",
            "currentStreak" = EXCLUDED."currentStreak",
            "lastStudiedAt" = EXCLUDED."lastStudiedAt",
            "updatedAt" = EXCLUDED."updatedAt"
        "#,
    )
    .bind(user_id)
    .bind(progress.points)
    .bind(progress.current_streak)
    .bind(progress.last_studied_at.map(|at| at.naive_utc()))
    .bind(now)
    .execute(db.pool())
    .await?;

    Ok(())
}
