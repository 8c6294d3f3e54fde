use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::response::{created_json, json_error, success_json, SuccessResponse};
use crate::services::generation::{self, GenerationError, DEFAULT_CARD_COUNT};
use crate::services::jobs::DispatchMode;
use crate::services::llm::LlmError;
use crate::state::AppState;

use super::decks::database_unavailable;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    source_text: String,
    count: Option<usize>,
}

/// Kicks off card generation for a deck. In asynchronous mode the response
/// is a 202 with a job id to poll; in synchronous mode the cards come back
/// directly.
pub async fn generate_for_deck(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(deck_id): Path<String>,
    Json(payload): Json<GenerateRequest>,
) -> Response {
    let Some(db) = state.database() else {
        return database_unavailable();
    };

    let llm = state.llm();
    if !llm.is_available() {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "card generation is not configured",
        )
        .into_response();
    }

    let count = payload.count.unwrap_or(DEFAULT_CARD_COUNT);

    match state.generation_dispatch() {
        DispatchMode::Synchronous => {
            let result = generation::generate_cards(
                db.as_ref(),
                llm.as_ref(),
                &deck_id,
                &user.id,
                &payload.source_text,
                count,
            )
            .await;

            match result {
                Ok(cards) => created_json(serde_json::json!({ "cards": cards })),
                Err(err) => generation_error_response(err),
            }
        }
        DispatchMode::Asynchronous => {
            let jobs = state.jobs();
            let job_id = jobs.create();

            let task_db = db;
            let task_llm = llm;
            let task_jobs = jobs;
            let task_job_id = job_id.clone();
            let user_id = user.id.clone();
            tokio::spawn(async move {
                let result = generation::generate_cards(
                    task_db.as_ref(),
                    task_llm.as_ref(),
                    &deck_id,
                    &user_id,
                    &payload.source_text,
                    count,
                )
                .await;

                match result {
                    Ok(cards) => {
                        let card_ids = cards.into_iter().map(|card| card.id).collect();
                        task_jobs.complete(&task_job_id, card_ids);
                    }
                    Err(err) => {
                        tracing::error!(error = %err, job_id = %task_job_id, "generation job failed");
                        task_jobs.fail(&task_job_id, err.to_string());
                    }
                }
            });

            (
                StatusCode::ACCEPTED,
                Json(SuccessResponse {
                    success: true,
                    data: serde_json::json!({ "jobId": job_id }),
                }),
            )
                .into_response()
        }
    }
}

pub async fn job_status(
    State(state): State<AppState>,
    Extension(_user): Extension<AuthUser>,
    Path(job_id): Path<String>,
) -> Response {
    match state.jobs().get(&job_id) {
        Some(status) => success_json(status),
        None => json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "job not found").into_response(),
    }
}

fn generation_error_response(err: GenerationError) -> Response {
    match err {
        GenerationError::Validation(message) => {
            json_error(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message).into_response()
        }
        GenerationError::DeckNotFound => {
            json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "deck not found").into_response()
        }
        GenerationError::Forbidden => json_error(
            StatusCode::FORBIDDEN,
            "FORBIDDEN",
            "deck belongs to another user",
        )
        .into_response(),
        GenerationError::Llm(LlmError::NotConfigured(_)) => json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "card generation is not configured",
        )
        .into_response(),
        GenerationError::Llm(err) => {
            tracing::error!(error = %err, "model call failed");
            json_error(
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                "model call failed",
            )
            .into_response()
        }
        GenerationError::Parse(message) => {
            tracing::error!(error = %message, "model output unusable");
            json_error(
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_ERROR",
                "model returned unusable output",
            )
            .into_response()
        }
        GenerationError::Persistence(err) => {
            tracing::error!(error = %err, "failed to store generated cards");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_ERROR",
                "failed to store generated cards",
            )
            .into_response()
        }
    }
}
