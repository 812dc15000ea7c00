use chrono::{DateTime, NaiveDate, Utc};
use convene_core::types::{
    Assignment, AvailabilitySubmission, ConfirmedSchedule, InterviewSession, Interviewer,
    InterviewerId, SessionId, SessionStatus, TimeRange,
};

use crate::error::RepoResult;

/// Persistence seam for sessions, assignments, submissions and schedules.
///
/// Calls are blocking I/O. Implementations must be `Send + Sync` so one
/// instance can be shared by the coordinator and every periodic job.
pub trait AvailabilityRepository: Send + Sync {
    /// Store a new session together with one assignment per interviewer.
    fn insert_session(&self, session: &InterviewSession, interviewers: &[Interviewer])
        -> RepoResult<()>;

    fn get_session(&self, id: &SessionId) -> RepoResult<Option<InterviewSession>>;

    fn set_status(&self, id: &SessionId, status: SessionStatus) -> RepoResult<()>;

    /// Assignments in the order interviewers were given at creation.
    fn get_assignments(&self, id: &SessionId) -> RepoResult<Vec<Assignment>>;

    /// Latest submission per interviewer, in assignment order.
    fn get_submissions(&self, id: &SessionId) -> RepoResult<Vec<AvailabilitySubmission>>;

    /// Store `ranges`, replacing any earlier submission by the same interviewer.
    fn record_submission(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        ranges: &[TimeRange],
        at: DateTime<Utc>,
    ) -> RepoResult<()>;

    fn mark_responded(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        at: DateTime<Utc>,
    ) -> RepoResult<()>;

    /// Increment `reminder_count` and set `last_reminder_at`.
    fn mark_reminder_sent(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        at: DateTime<Utc>,
    ) -> RepoResult<()>;

    fn set_confirmed_schedule(&self, schedule: &ConfirmedSchedule) -> RepoResult<()>;

    fn get_confirmed_schedule(&self, id: &SessionId) -> RepoResult<Option<ConfirmedSchedule>>;

    /// Sessions with `status`, oldest first.
    fn list_sessions_by_status(&self, status: SessionStatus) -> RepoResult<Vec<InterviewSession>>;

    fn mark_accepted(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        at: DateTime<Utc>,
    ) -> RepoResult<()>;

    fn mark_day_before_sent(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        on: NaiveDate,
    ) -> RepoResult<()>;

    /// Submission plus responded mark. Transactional backends override this
    /// so both land together.
    fn record_response(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        ranges: &[TimeRange],
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        self.record_submission(id, interviewer_id, ranges, at)?;
        self.mark_responded(id, interviewer_id, at)
    }

    /// Schedule plus `CONFIRMED` status. Transactional backends override this
    /// so the status never disagrees with the schedule row.
    fn confirm(&self, schedule: &ConfirmedSchedule) -> RepoResult<()> {
        self.set_confirmed_schedule(schedule)?;
        self.set_status(&schedule.session_id, SessionStatus::Confirmed)
    }
}
