use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::db::operations::decks::{self, Deck, DeckUpdate, NewDeck};
use crate::db::Database;
use crate::response::{created_json, json_error, success_json};
use crate::state::AppState;

const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeckRequest {
    title: String,
    description: Option<String>,
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeckRequest {
    title: Option<String>,
    description: Option<String>,
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharingRequest {
    enabled: bool,
}

pub async fn create_deck(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateDeckRequest>,
) -> Response {
    let Some(db) = state.database() else {
        return database_unavailable();
    };

    let title = payload.title.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return json_error(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "title must be between 1 and 200 characters",
        )
        .into_response();
    }

    let new_deck = NewDeck {
        owner_id: user.id,
        title: title.to_string(),
        description: payload.description,
        color: payload.color,
    };

    match decks::insert_deck(db.as_ref(), &new_deck).await {
        Ok(deck) => created_json(deck),
        Err(err) => persistence_error(err, "failed to create deck"),
    }
}

pub async fn list_decks(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    let Some(db) = state.database() else {
        return database_unavailable();
    };

    match decks::list_user_decks(db.as_ref(), &user.id).await {
        Ok(list) => success_json(list),
        Err(err) => persistence_error(err, "failed to list decks"),
    }
}

pub async fn get_deck(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(deck_id): Path<String>,
) -> Response {
    let Some(db) = state.database() else {
        return database_unavailable();
    };

    match fetch_owned_deck(db.as_ref(), &deck_id, &user.id).await {
        Ok(deck) => success_json(deck),
        Err(response) => response,
    }
}

pub async fn update_deck(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(deck_id): Path<String>,
    Json(payload): Json<UpdateDeckRequest>,
) -> Response {
    let Some(db) = state.database() else {
        return database_unavailable();
    };

    if let Err(response) = fetch_owned_deck(db.as_ref(), &deck_id, &user.id).await {
        return response;
    }

    if let Some(title) = payload.title.as_deref() {
        let title = title.trim();
        if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
            return json_error(
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "title must be between 1 and 200 characters",
            )
            .into_response();
        }
    }

    let update = DeckUpdate {
        title: payload.title.map(|t| t.trim().to_string()),
        description: payload.description,
        color: payload.color,
    };

    match decks::update_deck(db.as_ref(), &deck_id, &update).await {
        Ok(Some(deck)) => success_json(deck),
        Ok(None) => deck_not_found(),
        Err(err) => persistence_error(err, "failed to update deck"),
    }
}

pub async fn delete_deck(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(deck_id): Path<String>,
) -> Response {
    let Some(db) = state.database() else {
        return database_unavailable();
    };

    if let Err(response) = fetch_owned_deck(db.as_ref(), &deck_id, &user.id).await {
        return response;
    }

    match decks::delete_deck(db.as_ref(), &deck_id).await {
        Ok(true) => success_json(serde_json::json!({ "deleted": true })),
        Ok(false) => deck_not_found(),
        Err(err) => persistence_error(err, "failed to delete deck"),
    }
}

pub async fn toggle_sharing(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(deck_id): Path<String>,
    Json(payload): Json<SharingRequest>,
) -> Response {
    let Some(db) = state.database() else {
        return database_unavailable();
    };

    if let Err(response) = fetch_owned_deck(db.as_ref(), &deck_id, &user.id).await {
        return response;
    }

    match decks::set_deck_sharing(db.as_ref(), &deck_id, payload.enabled).await {
        Ok(Some(deck)) => success_json(deck),
        Ok(None) => deck_not_found(),
        Err(err) => persistence_error(err, "failed to update sharing"),
    }
}

/// Loads a deck and enforces ownership; 404 before 403 so probing for
/// other users' deck ids leaks nothing beyond existence.
pub(crate) async fn fetch_owned_deck(
    db: &Database,
    deck_id: &str,
    user_id: &str,
) -> Result<Deck, Response> {
    match decks::get_deck(db, deck_id).await {
        Ok(Some(deck)) if deck.owner_id == user_id => Ok(deck),
        Ok(Some(_)) => Err(json_error(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "deck belongs to another user",
        )
        .into_response()),
        Ok(None) => Err(deck_not_found()),
        Err(err) => Err(persistence_error(err, "failed to load deck")),
    }
}

pub(crate) fn deck_not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "deck not found").into_response()
}

pub(crate) fn database_unavailable() -> Response {
    json_error(
        StatusCode::SERVICE_UNAVAILABLE,
        "SERVICE_UNAVAILABLE",
        "database unavailable",
    )
    .into_response()
}

pub(crate) fn persistence_error(err: sqlx::Error, context: &'static str) -> Response {
    tracing::error!(error = %err, context, "persistence error");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR", context).into_response()
}
