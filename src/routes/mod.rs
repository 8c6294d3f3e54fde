use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::response::json_error;
use crate::state::AppState;

pub mod cards;
pub mod decks;
pub mod generate;
pub mod health;
pub mod profile;
pub mod reviews;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/decks", post(decks::create_deck).get(decks::list_decks))
        .route(
            "/api/decks/:id",
            get(decks::get_deck)
                .put(decks::update_deck)
                .delete(decks::delete_deck),
        )
        .route("/api/decks/:id/share", post(decks::toggle_sharing))
        .route(
            "/api/decks/:id/cards",
            post(cards::create_card).get(cards::list_cards),
        )
        .route("/api/decks/:id/due", get(reviews::due_cards))
        .route("/api/decks/:id/generate", post(generate::generate_for_deck))
        .route(
            "/api/cards/:id",
            get(cards::get_card)
                .put(cards::update_card)
                .delete(cards::delete_card),
        )
        .route("/api/cards/:id/review", post(reviews::submit_review))
        .route("/api/users/me/progress", get(profile::my_progress))
        .route("/api/jobs/:id", get(generate::job_status))
        .layer(from_fn_with_state(
            state.clone(),
            crate::middleware::auth::require_auth,
        ));

    Router::new()
        .nest("/health", health::router())
        .merge(protected)
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}
