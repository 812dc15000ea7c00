use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use convene_core::types::{
    Assignment, AvailabilitySubmission, ConfirmedSchedule, InterviewSession, Interviewer,
    InterviewerId, SessionId, SessionStatus, TimeRange,
};

use crate::error::{RepoResult, RepositoryError};
use crate::repository::AvailabilityRepository;

#[derive(Default)]
struct State {
    sessions: HashMap<SessionId, InterviewSession>,
    /// Kept in interviewer order.
    assignments: HashMap<SessionId, Vec<Assignment>>,
    submissions: HashMap<(SessionId, InterviewerId), AvailabilitySubmission>,
    schedules: HashMap<SessionId, ConfirmedSchedule>,
}

/// Map-backed repository for tests and single-process demos.
///
/// Every call holds one mutex for its whole duration, so multi-step writes
/// are as atomic as the SQLite transactions.
#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> RepoResult<MutexGuard<'_, State>> {
        self.state.lock().map_err(|_| RepositoryError::LockPoisoned)
    }
}

impl State {
    fn assignment_mut(
        &mut self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
    ) -> RepoResult<&mut Assignment> {
        self.assignments
            .get_mut(id)
            .and_then(|list| list.iter_mut().find(|a| &a.interviewer.id == interviewer_id))
            .ok_or_else(|| RepositoryError::AssignmentNotFound {
                session_id: id.clone(),
                interviewer_id: interviewer_id.clone(),
            })
    }
}

impl AvailabilityRepository for MemoryRepository {
    fn insert_session(
        &self,
        session: &InterviewSession,
        interviewers: &[Interviewer],
    ) -> RepoResult<()> {
        let mut state = self.state()?;
        if state.sessions.contains_key(&session.id) {
            return Err(RepositoryError::Duplicate {
                id: session.id.clone(),
            });
        }
        state.sessions.insert(session.id.clone(), session.clone());
        state.assignments.insert(
            session.id.clone(),
            interviewers
                .iter()
                .map(|i| Assignment::new(session.id.clone(), i.clone()))
                .collect(),
        );
        Ok(())
    }

    fn get_session(&self, id: &SessionId) -> RepoResult<Option<InterviewSession>> {
        Ok(self.state()?.sessions.get(id).cloned())
    }

    fn set_status(&self, id: &SessionId, status: SessionStatus) -> RepoResult<()> {
        let mut state = self.state()?;
        let session = state
            .sessions
            .get_mut(id)
            .ok_or_else(|| RepositoryError::SessionNotFound { id: id.clone() })?;
        session.status = status;
        Ok(())
    }

    fn get_assignments(&self, id: &SessionId) -> RepoResult<Vec<Assignment>> {
        Ok(self
            .state()?
            .assignments
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    fn get_submissions(&self, id: &SessionId) -> RepoResult<Vec<AvailabilitySubmission>> {
        let state = self.state()?;
        let Some(assignments) = state.assignments.get(id) else {
            return Ok(Vec::new());
        };
        Ok(assignments
            .iter()
            .filter_map(|a| {
                state
                    .submissions
                    .get(&(id.clone(), a.interviewer.id.clone()))
                    .cloned()
            })
            .collect())
    }

    fn record_submission(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        ranges: &[TimeRange],
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut state = self.state()?;
        state.assignment_mut(id, interviewer_id)?;
        state.submissions.insert(
            (id.clone(), interviewer_id.clone()),
            AvailabilitySubmission {
                session_id: id.clone(),
                interviewer_id: interviewer_id.clone(),
                ranges: ranges.to_vec(),
                submitted_at: at,
            },
        );
        Ok(())
    }

    fn mark_responded(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut state = self.state()?;
        state.assignment_mut(id, interviewer_id)?.responded_at = Some(at);
        Ok(())
    }

    fn mark_reminder_sent(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut state = self.state()?;
        let assignment = state.assignment_mut(id, interviewer_id)?;
        assignment.reminder_count += 1;
        assignment.last_reminder_at = Some(at);
        Ok(())
    }

    fn set_confirmed_schedule(&self, schedule: &ConfirmedSchedule) -> RepoResult<()> {
        let mut state = self.state()?;
        if !state.sessions.contains_key(&schedule.session_id) {
            return Err(RepositoryError::SessionNotFound {
                id: schedule.session_id.clone(),
            });
        }
        if state.schedules.contains_key(&schedule.session_id) {
            return Err(RepositoryError::Duplicate {
                id: schedule.session_id.clone(),
            });
        }
        state
            .schedules
            .insert(schedule.session_id.clone(), schedule.clone());
        Ok(())
    }

    fn get_confirmed_schedule(&self, id: &SessionId) -> RepoResult<Option<ConfirmedSchedule>> {
        Ok(self.state()?.schedules.get(id).cloned())
    }

    fn list_sessions_by_status(&self, status: SessionStatus) -> RepoResult<Vec<InterviewSession>> {
        let state = self.state()?;
        let mut sessions: Vec<InterviewSession> = state
            .sessions
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(sessions)
    }

    fn mark_accepted(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut state = self.state()?;
        state.assignment_mut(id, interviewer_id)?.accepted_at = Some(at);
        Ok(())
    }

    fn mark_day_before_sent(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        on: NaiveDate,
    ) -> RepoResult<()> {
        let mut state = self.state()?;
        state.assignment_mut(id, interviewer_id)?.day_before_sent_on = Some(on);
        Ok(())
    }

    fn record_response(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        ranges: &[TimeRange],
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut state = self.state()?;
        state.assignment_mut(id, interviewer_id)?.responded_at = Some(at);
        state.submissions.insert(
            (id.clone(), interviewer_id.clone()),
            AvailabilitySubmission {
                session_id: id.clone(),
                interviewer_id: interviewer_id.clone(),
                ranges: ranges.to_vec(),
                submitted_at: at,
            },
        );
        Ok(())
    }

    fn confirm(&self, schedule: &ConfirmedSchedule) -> RepoResult<()> {
        let mut state = self.state()?;
        if state.schedules.contains_key(&schedule.session_id) {
            return Err(RepositoryError::Duplicate {
                id: schedule.session_id.clone(),
            });
        }
        let session = state
            .sessions
            .get_mut(&schedule.session_id)
            .ok_or_else(|| RepositoryError::SessionNotFound {
                id: schedule.session_id.clone(),
            })?;
        session.status = SessionStatus::Confirmed;
        state
            .schedules
            .insert(schedule.session_id.clone(), schedule.clone());
        Ok(())
    }
}
