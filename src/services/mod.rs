pub mod generation;
pub mod jobs;
pub mod llm;
pub mod progress;
pub mod review;
pub mod scheduler;
