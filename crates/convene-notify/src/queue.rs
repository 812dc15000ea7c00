use async_trait::async_trait;
use convene_core::types::{ConfirmedSchedule, InterviewSession, Interviewer};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use crate::{
    error::NotifyError,
    notifier::Notifier,
    types::{Notification, ReminderTier},
};

/// Forwards notifications to an mpsc channel drained by a delivery task.
///
/// `try_send` never blocks the caller; a full or closed queue surfaces as a
/// [`NotifyError`] so the job retries on its next tick.
#[derive(Debug, Clone)]
pub struct QueueNotifier {
    tx: mpsc::Sender<Notification>,
}

impl QueueNotifier {
    pub fn new(tx: mpsc::Sender<Notification>) -> Self {
        Self { tx }
    }

    /// Build a notifier together with the receiving end of its queue.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    fn enqueue(&self, notification: Notification) -> Result<(), NotifyError> {
        let kind = notification.kind();
        let session_id = notification.session_id().clone();
        match self.tx.try_send(notification) {
            Ok(()) => {
                debug!(kind, %session_id, "notification queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(NotifyError::QueueFull),
            Err(TrySendError::Closed(_)) => Err(NotifyError::QueueClosed),
        }
    }
}

#[async_trait]
impl Notifier for QueueNotifier {
    async fn send_reminder(
        &self,
        interviewer: &Interviewer,
        session: &InterviewSession,
        tier: ReminderTier,
    ) -> Result<(), NotifyError> {
        self.enqueue(Notification::reminder(interviewer, session, tier))
    }

    async fn send_confirmation(
        &self,
        recipients: &[String],
        _session: &InterviewSession,
        schedule: &ConfirmedSchedule,
    ) -> Result<(), NotifyError> {
        self.enqueue(Notification::confirmation(recipients, schedule))
    }

    async fn send_day_before(
        &self,
        interviewer: &Interviewer,
        session: &InterviewSession,
        schedule: &ConfirmedSchedule,
    ) -> Result<(), NotifyError> {
        self.enqueue(Notification::day_before(interviewer, session, schedule))
    }
}
