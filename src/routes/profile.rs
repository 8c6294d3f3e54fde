use axum::extract::State;
use axum::response::Response;
use axum::Extension;

use crate::auth::AuthUser;
use crate::db::operations::profile;
use crate::response::success_json;
use crate::state::AppState;

use super::decks::{database_unavailable, persistence_error};

/// Users with no recorded reviews get the zeroed default rather than a 404.
pub async fn my_progress(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Response {
    let Some(db) = state.database() else {
        return database_unavailable();
    };

    match profile::get_progress(db.as_ref(), &user.id).await {
        Ok(progress) => success_json(progress),
        Err(err) => persistence_error(err, "failed to load progress"),
    }
}
