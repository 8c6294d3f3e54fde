use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/live", get(live))
        .route("/info", get(info))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthBody {
    status: &'static str,
    database: Option<crate::db::HealthSnapshot>,
}

async fn root(State(state): State<AppState>) -> Response {
    let Some(database) = state.database() else {
        let body = HealthBody {
            status: "degraded",
            database: None,
        };
        return (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response();
    };

    let snapshot = database.health_snapshot().await;
    let status_code = if snapshot.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let body = HealthBody {
        status: if snapshot.healthy { "ok" } else { "degraded" },
        database: Some(snapshot),
    };

    (status_code, Json(body)).into_response()
}

async fn live() -> Response {
    Json(serde_json::json!({ "status": "ok" })).into_response()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoBody {
    name: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

async fn info(State(state): State<AppState>) -> Response {
    Json(InfoBody {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
    })
    .into_response()
}
