use thiserror::Error;

/// Errors raised while handing a notification to the delivery layer.
///
/// Always non-fatal for periodic jobs: the caller logs and retries on the
/// next tick.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The delivery backend refused or failed to accept the message.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The outbound queue is at capacity.
    #[error("Delivery queue full")]
    QueueFull,

    /// The consumer side of the outbound queue is gone.
    #[error("Delivery queue closed")]
    QueueClosed,
}
