// Tue Jan 13 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskFailure {
    #[error("{0:#}")]
    Error(anyhow::Error),

    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskFailure {
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskFailure::Panicked(_))
    }
}

impl From<anyhow::Error> for TaskFailure {
    fn from(e: anyhow::Error) -> Self {
        TaskFailure::Error(e)
    }
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("at least one task must be queued, got 0")]
    EmptyQueue,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("run() was already called on this instance")]
    AlreadyStarted,

    #[error("Task {index} failed: {source}")]
    TaskFailed {
        index: usize,
        #[source]
        source: TaskFailure,
    },

    #[error("{} of {total} tasks never reported a completion (all workers exited): {lost:?}", lost.len())]
    LostTasks { lost: Vec<usize>, total: usize },

    #[error("Failed to spawn worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

pub type RunResult<T> = Result<T, RunError>;
