use convene_core::types::{InterviewerId, SessionId, SessionStatus};
use convene_core::CoreError;
use thiserror::Error;

/// Errors raised by an [`AvailabilityRepository`](crate::repository::AvailabilityRepository).
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A JSON column could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value no longer parses (bad timestamp, unknown status, …).
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("session not found: {id}")]
    SessionNotFound { id: SessionId },

    #[error("interviewer {interviewer_id} is not assigned to session {session_id}")]
    AssignmentNotFound {
        session_id: SessionId,
        interviewer_id: InterviewerId,
    },

    #[error("session already exists: {id}")]
    Duplicate { id: SessionId },

    /// A previous holder of the connection lock panicked.
    #[error("storage lock poisoned")]
    LockPoisoned,
}

impl From<CoreError> for RepositoryError {
    fn from(e: CoreError) -> Self {
        RepositoryError::Corrupt(e.to_string())
    }
}

pub type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// Errors surfaced to callers of the coordinator.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Malformed input: bad time range, empty range list, duplicate ids, …
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("session not found: {id}")]
    SessionNotFound { id: SessionId },

    #[error("interviewer {interviewer_id} is not assigned to session {session_id}")]
    InterviewerNotFound {
        session_id: SessionId,
        interviewer_id: InterviewerId,
    },

    /// The session is in a state that forbids the operation.
    #[error("session {id} is {status}: {reason}")]
    Conflict {
        id: SessionId,
        status: SessionStatus,
        reason: String,
    },

    #[error("repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CoordinatorError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::SessionNotFound { id } => CoordinatorError::SessionNotFound { id },
            RepositoryError::AssignmentNotFound {
                session_id,
                interviewer_id,
            } => CoordinatorError::InterviewerNotFound {
                session_id,
                interviewer_id,
            },
            other => CoordinatorError::Repository(other),
        }
    }
}

impl From<CoreError> for CoordinatorError {
    fn from(e: CoreError) -> Self {
        CoordinatorError::Validation(e.to_string())
    }
}

impl CoordinatorError {
    /// Short error code string returned to HTTP clients.
    pub fn code(&self) -> &'static str {
        match self {
            CoordinatorError::Validation(_) => "VALIDATION_ERROR",
            CoordinatorError::SessionNotFound { .. } => "SESSION_NOT_FOUND",
            CoordinatorError::InterviewerNotFound { .. } => "INTERVIEWER_NOT_FOUND",
            CoordinatorError::Conflict { .. } => "CONFLICT",
            CoordinatorError::Repository(_) => "REPOSITORY_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoordinatorError>;
