#![allow(dead_code)]

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use std::sync::Arc;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub async fn create_app() -> axum::Router {
    let database = match db::Database::from_env().await {
        Ok(database) => Some(Arc::new(database)),
        Err(err) => {
            tracing::warn!(error = %err, "database not initialized, serving degraded");
            None
        }
    };

    let state = AppState::new(database);

    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
