use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::response::json_error;
use crate::state::AppState;

/// Verifies the request token and stores the resolved `AuthUser` as a
/// request extension for the handlers behind it.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = crate::auth::extract_token(req.headers()) else {
        return json_error(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "authentication token missing",
        )
        .into_response();
    };

    let Some(database) = state.database() else {
        return json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "database unavailable",
        )
        .into_response();
    };

    match crate::auth::verify_request_token(database.as_ref(), &token).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(_err) => json_error(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "authentication failed",
        )
        .into_response(),
    }
}
