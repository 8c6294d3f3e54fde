use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::db::Database;
use crate::services::jobs::{DispatchMode, JobRegistry};
use crate::services::llm::LlmClient;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    database: Option<Arc<Database>>,
    llm: Arc<LlmClient>,
    jobs: Arc<JobRegistry>,
    generation_dispatch: DispatchMode,
}

impl AppState {
    pub fn new(database: Option<Arc<Database>>) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            database,
            llm: Arc::new(LlmClient::from_env()),
            jobs: Arc::new(JobRegistry::default()),
            generation_dispatch: DispatchMode::from_env(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn database(&self) -> Option<Arc<Database>> {
        self.database.clone()
    }

    pub fn llm(&self) -> Arc<LlmClient> {
        Arc::clone(&self.llm)
    }

    pub fn jobs(&self) -> Arc<JobRegistry> {
        Arc::clone(&self.jobs)
    }

    pub fn generation_dispatch(&self) -> DispatchMode {
        self.generation_dispatch
    }
}
