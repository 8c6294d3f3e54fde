use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

/// How card-generation work is dispatched. Picked once from configuration at
/// startup instead of probing a shared connection at request time: inline
/// execution for small deployments and tests, a spawned task otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Synchronous,
    Asynchronous,
}

impl DispatchMode {
    pub fn from_env() -> Self {
        match std::env::var("GENERATION_DISPATCH")
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "sync" | "inline" => Self::Synchronous,
            _ => Self::Asynchronous,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum JobStatus {
    Pending,
    Completed { card_ids: Vec<String> },
    Failed { error: String },
}

/// In-process registry of background generation jobs, keyed by job id.
/// Deliberately ephemeral: a restart forgets pending jobs, and the cards a
/// completed job produced are visible through the deck regardless.
#[derive(Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, JobStatus>>,
}

impl JobRegistry {
    pub fn create(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.jobs.write().insert(id.clone(), JobStatus::Pending);
        id
    }

    pub fn complete(&self, job_id: &str, card_ids: Vec<String>) {
        self.jobs
            .write()
            .insert(job_id.to_string(), JobStatus::Completed { card_ids });
    }

    pub fn fail(&self, job_id: &str, error: impl Into<String>) {
        self.jobs.write().insert(
            job_id.to_string(),
            JobStatus::Failed {
                error: error.into(),
            },
        );
    }

    pub fn get(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.read().get(job_id).cloned()
    }
}
