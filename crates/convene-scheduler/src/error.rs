use convene_sessions::{CoordinatorError, RepositoryError};
use thiserror::Error;

/// Errors that abort a whole job run. Per-session failures are counted in
/// the [`JobReport`](crate::types::JobReport) instead.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),

    /// The provided schedule definition is invalid.
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
