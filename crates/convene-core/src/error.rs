use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A wall-clock value could not be parsed as zero-padded `HH:mm`.
    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Invalid time range: {0}")]
    InvalidRange(String),

    #[error("Unknown session status: {0}")]
    InvalidStatus(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
