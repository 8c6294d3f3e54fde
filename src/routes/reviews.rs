use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::db::operations::cards;
use crate::response::{json_error, success_json};
use crate::services::review::{self, ReviewError};
use crate::state::AppState;

use super::decks::{database_unavailable, fetch_owned_deck, persistence_error};

const DEFAULT_DUE_LIMIT: i64 = 50;
const MAX_DUE_LIMIT: i64 = 200;

/// Quality arrives as a raw JSON value so fractional ratings like 3.5 are
/// rejected instead of silently truncated.
pub async fn submit_review(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(card_id): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let Some(db) = state.database() else {
        return database_unavailable();
    };

    let quality = match payload.get("quality") {
        Some(value) if value.is_i64() || value.is_u64() => value.as_i64().unwrap_or(i64::MAX),
        _ => {
            return json_error(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "quality must be an integer between 0 and 5",
            )
            .into_response()
        }
    };
    let quality = i32::try_from(quality).unwrap_or(i32::MAX);

    match review::submit_review(db.as_ref(), &card_id, &user.id, quality, Utc::now()).await {
        Ok(card) => success_json(card),
        Err(err) => review_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct DueQuery {
    limit: Option<i64>,
}

pub async fn due_cards(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(deck_id): Path<String>,
    Query(query): Query<DueQuery>,
) -> Response {
    let Some(db) = state.database() else {
        return database_unavailable();
    };

    if let Err(response) = fetch_owned_deck(db.as_ref(), &deck_id, &user.id).await {
        return response;
    }

    let limit = query
        .limit
        .unwrap_or(DEFAULT_DUE_LIMIT)
        .clamp(1, MAX_DUE_LIMIT);

    match cards::list_due_cards(db.as_ref(), &deck_id, Utc::now(), limit).await {
        Ok(list) => success_json(list),
        Err(err) => persistence_error(err, "failed to list due cards"),
    }
}

fn review_error_response(err: ReviewError) -> Response {
    match err {
        ReviewError::InvalidInput => json_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            err.to_string(),
        )
        .into_response(),
        ReviewError::NotFound => {
            json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "card not found").into_response()
        }
        ReviewError::Forbidden => json_error(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "card belongs to another user",
        )
        .into_response(),
        ReviewError::Persistence(err) => persistence_error(err, "failed to record review"),
    }
}
