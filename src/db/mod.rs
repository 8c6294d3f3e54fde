pub mod migrate;
pub mod operations;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;

const MAX_CONNECTIONS: u32 = 10;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum DbInitError {
    #[error("DATABASE_URL is not set")]
    MissingUrl,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub healthy: bool,
    pub latency_ms: Option<u64>,
    pub last_error: Option<String>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self {
            healthy: false,
            latency_ms: None,
            last_error: None,
            checked_at: None,
        }
    }
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    health: Arc<RwLock<HealthSnapshot>>,
}

impl Database {
    pub async fn from_env() -> Result<Self, DbInitError> {
        let url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(DbInitError::MissingUrl)?;
        Self::connect(&url).await
    }

    pub async fn connect(url: &str) -> Result<Self, DbInitError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(url)
            .await?;

        let database = Self {
            pool,
            health: Arc::new(RwLock::new(HealthSnapshot::default())),
        };
        database.start_health_monitor();

        Ok(database)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_snapshot(&self) -> HealthSnapshot {
        self.health.read().await.clone()
    }

    fn start_health_monitor(&self) {
        let pool = self.pool.clone();
        let health = Arc::clone(&self.health);

        tokio::spawn(async move {
            loop {
                let result = check_health(&pool).await;
                {
                    let mut snapshot = health.write().await;
                    *snapshot = result;
                }
                tokio::time::sleep(HEALTH_CHECK_INTERVAL).await;
            }
        });
    }
}

async fn check_health(pool: &PgPool) -> HealthSnapshot {
    let started = std::time::Instant::now();
    let result = tokio::time::timeout(HEALTH_CHECK_TIMEOUT, sqlx::query("SELECT 1").execute(pool)).await;

    match result {
        Ok(Ok(_)) => HealthSnapshot {
            healthy: true,
            latency_ms: Some(started.elapsed().as_millis() as u64),
            last_error: None,
            checked_at: Some(Utc::now()),
        },
        Ok(Err(err)) => HealthSnapshot {
            healthy: false,
            latency_ms: None,
            last_error: Some(err.to_string()),
            checked_at: Some(Utc::now()),
        },
        Err(_) => HealthSnapshot {
            healthy: false,
            latency_ms: None,
            last_error: Some("health check timeout".to_string()),
            checked_at: Some(Utc::now()),
        },
    }
}
