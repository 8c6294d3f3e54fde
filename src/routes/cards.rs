use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::db::operations::cards::{
    self, CardContentUpdate, Flashcard, NewFlashcard, CARD_TYPE_MULTIPLE_CHOICE,
    CARD_TYPE_QUESTION_ANSWER,
};
use crate::db::Database;
use crate::response::{created_json, json_error, success_json};
use crate::state::AppState;

use super::decks::{database_unavailable, fetch_owned_deck, persistence_error};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    question: String,
    answer: String,
    card_type: Option<String>,
    options: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardRequest {
    question: Option<String>,
    answer: Option<String>,
    card_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_explicit_null")]
    options: Option<Option<Vec<String>>>,
}

/// Distinguishes `"options": null` (clear the options) from the field
/// being absent (leave them alone).
fn deserialize_explicit_null<'de, D>(
    deserializer: D,
) -> Result<Option<Option<Vec<String>>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

pub async fn create_card(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(deck_id): Path<String>,
    Json(payload): Json<CreateCardRequest>,
) -> Response {
    let Some(db) = state.database() else {
        return database_unavailable();
    };

    if let Err(response) = fetch_owned_deck(db.as_ref(), &deck_id, &user.id).await {
        return response;
    }

    let question = payload.question.trim();
    let answer = payload.answer.trim();
    if question.is_empty() || answer.is_empty() {
        return validation("question and answer must not be empty");
    }

    let card_type = payload
        .card_type
        .unwrap_or_else(|| CARD_TYPE_QUESTION_ANSWER.to_string());
    if let Err(response) = check_card_type(&card_type, payload.options.as_deref()) {
        return response;
    }

    let new_card = NewFlashcard {
        deck_id,
        question: question.to_string(),
        answer: answer.to_string(),
        card_type,
        options: payload.options,
    };

    match cards::insert_card(db.as_ref(), &new_card).await {
        Ok(card) => created_json(card),
        Err(err) => persistence_error(err, "failed to create card"),
    }
}

pub async fn list_cards(
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

    match cards::list_deck_cards(db.as_ref(), &deck_id).await {
        Ok(list) => success_json(list),
        Err(err) => persistence_error(err, "failed to list cards"),
    }
}

pub async fn get_card(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(card_id): Path<String>,
) -> Response {
    let Some(db) = state.database() else {
        return database_unavailable();
    };

    match fetch_owned_card(db.as_ref(), &card_id, &user.id).await {
        Ok(card) => success_json(card),
        Err(response) => response,
    }
}

pub async fn update_card(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(card_id): Path<String>,
    Json(payload): Json<UpdateCardRequest>,
) -> Response {
    let Some(db) = state.database() else {
        return database_unavailable();
    };

    let current = match fetch_owned_card(db.as_ref(), &card_id, &user.id).await {
        Ok(card) => card,
        Err(response) => return response,
    };

    if let Some(question) = payload.question.as_deref() {
        if question.trim().is_empty() {
            return validation("question must not be empty");
        }
    }
    if let Some(answer) = payload.answer.as_deref() {
        if answer.trim().is_empty() {
            return validation("answer must not be empty");
        }
    }

    let effective_type = payload.card_type.as_deref().unwrap_or(&current.card_type);
    let effective_options = match &payload.options {
        Some(options) => options.as_deref(),
        None => current.options.as_deref(),
    };
    if let Err(response) = check_card_type(effective_type, effective_options) {
        return response;
    }

    let update = CardContentUpdate {
        question: payload.question.map(|q| q.trim().to_string()),
        answer: payload.answer.map(|a| a.trim().to_string()),
        card_type: payload.card_type,
        options: payload.options,
    };

    match cards::update_card_content(db.as_ref(), &card_id, &update).await {
        Ok(Some(card)) => success_json(card),
        Ok(None) => card_not_found(),
        Err(err) => persistence_error(err, "failed to update card"),
    }
}

pub async fn delete_card(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(card_id): Path<String>,
) -> Response {
    let Some(db) = state.database() else {
        return database_unavailable();
    };

    if let Err(response) = fetch_owned_card(db.as_ref(), &card_id, &user.id).await {
        return response;
    }

    match cards::delete_card(db.as_ref(), &card_id).await {
        Ok(true) => success_json(serde_json::json!({ "deleted": true })),
        Ok(false) => card_not_found(),
        Err(err) => persistence_error(err, "failed to delete card"),
    }
}

async fn fetch_owned_card(
    db: &Database,
    card_id: &str,
    user_id: &str,
) -> Result<Flashcard, Response> {
    match cards::get_card_with_owner(db, card_id).await {
        Ok(Some((card, owner_id))) if owner_id == user_id => Ok(card),
        Ok(Some(_)) => Err(json_error(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "card belongs to another user",
        )
        .into_response()),
        Ok(None) => Err(card_not_found()),
        Err(err) => Err(persistence_error(err, "failed to load card")),
    }
}

fn check_card_type(card_type: &str, options: Option<&[String]>) -> Result<(), Response> {
    match card_type {
        CARD_TYPE_QUESTION_ANSWER => Ok(()),
        CARD_TYPE_MULTIPLE_CHOICE => {
            let has_choices = options.map(|o| o.len() >= 2).unwrap_or(false);
            if has_choices {
                Ok(())
            } else {
                Err(validation(
                    "multiple-choice cards need at least two options",
                ))
            }
        }
        _ => Err(validation("unknown card type")),
    }
}

fn validation(message: &'static str) -> Response {
    json_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message).into_response()
}

fn card_not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "card not found").into_response()
}
