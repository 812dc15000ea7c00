use async_trait::async_trait;
use convene_core::types::{ConfirmedSchedule, InterviewSession, Interviewer};

use crate::{error::NotifyError, types::ReminderTier};

/// Delivery interface the coordinator and periodic jobs talk to.
///
/// An `Ok(())` is the only signal that a message was accepted; callers never
/// record a send without it.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Nudge an interviewer who has not submitted availability yet.
    async fn send_reminder(
        &self,
        interviewer: &Interviewer,
        session: &InterviewSession,
        tier: ReminderTier,
    ) -> Result<(), NotifyError>;

    /// Announce the agreed schedule to every participant address.
    async fn send_confirmation(
        &self,
        recipients: &[String],
        session: &InterviewSession,
        schedule: &ConfirmedSchedule,
    ) -> Result<(), NotifyError>;

    /// Remind an interviewer the day before a confirmed interview.
    async fn send_day_before(
        &self,
        interviewer: &Interviewer,
        session: &InterviewSession,
        schedule: &ConfirmedSchedule,
    ) -> Result<(), NotifyError>;
}
