use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use convene_core::config::EngineConfig;
use convene_core::types::{
    responded_count, Assignment, CandidateId, ConfirmedSchedule, InterviewSession, InterviewerId,
    SessionId, SessionStatus, TimeRange,
};
use convene_core::Clock;
use convene_notify::Notifier;
use convene_slots::{compute_candidate_slots, compute_end_time, CommonSlotResolver};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::error::{CoordinatorError, Result};
use crate::repository::AvailabilityRepository;
use crate::types::{NewSession, SessionView, SubmitOutcome};

/// Owns every status transition of an interview session.
///
/// Submissions and sweeps for the same session are serialised by a
/// per-session async mutex, which closes the window where two near-
/// simultaneous last submissions both see `responded < total` and neither
/// confirms. The reconciliation sweep still covers crashes between writes.
/// A lock entry lives only while someone holds or waits on it.
pub struct SessionCoordinator {
    repo: Arc<dyn AvailabilityRepository>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    resolver: CommonSlotResolver,
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
}

impl SessionCoordinator {
    pub fn new(
        repo: Arc<dyn AvailabilityRepository>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            resolver: CommonSlotResolver::new(config.granularity_minutes),
            repo,
            notifier,
            clock,
            config,
            locks: DashMap::new(),
        }
    }

    pub fn repository(&self) -> &dyn AvailabilityRepository {
        self.repo.as_ref()
    }

    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create a `PENDING` session with one assignment per interviewer.
    ///
    /// Candidates get back-to-back blocks from the proposed start; the
    /// window end covers all of them (one block when there are none).
    #[instrument(skip_all, fields(date = %req.proposed_date, start = %req.proposed_start))]
    pub fn create_session(&self, req: NewSession) -> Result<InterviewSession> {
        if req.interviewers.is_empty() {
            return Err(CoordinatorError::Validation(
                "at least one interviewer is required".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = req.interviewers.iter().find(|i| !seen.insert(&i.id)) {
            return Err(CoordinatorError::Validation(format!(
                "interviewer {} listed twice",
                dup.id
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = req.candidates.iter().find(|c| !seen.insert(&c.id)) {
            return Err(CoordinatorError::Validation(format!(
                "candidate {} listed twice",
                dup.id
            )));
        }

        let duration = req
            .duration_minutes
            .unwrap_or(self.config.interview_duration_minutes);
        if duration == 0 {
            return Err(CoordinatorError::Validation(
                "duration_minutes must be positive".to_string(),
            ));
        }

        let candidate_ids: Vec<CandidateId> = req.candidates.iter().map(|c| c.id.clone()).collect();
        let candidate_slots = compute_candidate_slots(req.proposed_start, &candidate_ids, duration);
        let proposed_end = compute_end_time(req.proposed_start, candidate_ids.len().max(1), duration);

        let session = InterviewSession {
            id: SessionId::new(),
            proposed_date: req.proposed_date,
            proposed_start: req.proposed_start,
            proposed_end,
            duration_minutes: duration,
            candidates: req.candidates,
            candidate_slots,
            status: SessionStatus::Pending,
            created_at: self.clock.now(),
        };
        self.repo.insert_session(&session, &req.interviewers)?;

        info!(
            session_id = %session.id,
            interviewers = req.interviewers.len(),
            candidates = session.candidates.len(),
            end = %session.proposed_end,
            "session created"
        );
        Ok(session)
    }

    pub fn get_session_view(&self, session_id: &SessionId) -> Result<SessionView> {
        let session = self.load(session_id)?;
        let assignments = self.repo.get_assignments(session_id)?;
        let schedule = self.repo.get_confirmed_schedule(session_id)?;
        Ok(SessionView {
            responded_count: responded_count(&assignments),
            total_assigned: assignments.len(),
            session,
            assignments,
            schedule,
        })
    }

    /// Record an interviewer's availability and advance the session.
    ///
    /// A resubmission before the session is decided replaces the earlier one.
    /// The last outstanding response triggers resolution: the session is
    /// confirmed on the earliest common slot or marked `NO_COMMON`.
    #[instrument(skip_all, fields(session_id = %session_id, interviewer_id = %interviewer_id, ranges = ranges.len()))]
    pub async fn submit_availability(
        &self,
        session_id: &SessionId,
        interviewer_id: &InterviewerId,
        ranges: Vec<TimeRange>,
    ) -> Result<SubmitOutcome> {
        validate_ranges(&ranges)?;

        let _guard = self.lock_session(session_id).await;

        let session = self.load(session_id)?;
        if session.status.is_terminal() {
            return Err(conflict(&session, "availability can no longer be submitted"));
        }

        let assignments = self.repo.get_assignments(session_id)?;
        let Some(assignment) = assignments
            .iter()
            .find(|a| &a.interviewer.id == interviewer_id)
        else {
            return Err(CoordinatorError::InterviewerNotFound {
                session_id: session_id.clone(),
                interviewer_id: interviewer_id.clone(),
            });
        };
        if assignment.has_responded() {
            debug!("replacing earlier submission");
        }

        let now = self.clock.now();
        self.repo
            .record_response(session_id, interviewer_id, &ranges, now)?;

        let assignments = self.repo.get_assignments(session_id)?;
        self.advance(&session, &assignments, now).await
    }

    /// Force a resolution attempt for an undecided session.
    ///
    /// Terminal sessions are rejected, so a `CONFIRMED` session is never
    /// confirmed a second time.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn evaluate(&self, session_id: &SessionId) -> Result<SubmitOutcome> {
        let _guard = self.lock_session(session_id).await;

        let session = self.load(session_id)?;
        if session.status.is_terminal() {
            return Err(conflict(&session, "session is already decided"));
        }
        let assignments = self.repo.get_assignments(session_id)?;
        self.advance(&session, &assignments, self.clock.now()).await
    }

    /// Sweep entry point: finish sessions whose last response was recorded
    /// but whose transition never ran.
    ///
    /// Only `PARTIAL` sessions (plus `PENDING` ones when
    /// `reconcile_pending` is set) with every response in are touched;
    /// everything else yields `Ok(None)`, so repeated runs are no-ops.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn reconcile(
        &self,
        session_id: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<Option<SubmitOutcome>> {
        let _guard = self.lock_session(session_id).await;

        let session = self.load(session_id)?;
        let eligible = match session.status {
            SessionStatus::Partial => true,
            SessionStatus::Pending => self.config.reconcile_pending,
            _ => false,
        };
        if !eligible {
            return Ok(None);
        }

        let assignments = self.repo.get_assignments(session_id)?;
        if assignments.is_empty() || responded_count(&assignments) < assignments.len() {
            return Ok(None);
        }
        self.finalize(&session, &assignments, now).await.map(Some)
    }

    /// Cancel an undecided session. Terminal sessions are rejected.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn cancel_session(&self, session_id: &SessionId) -> Result<InterviewSession> {
        let _guard = self.lock_session(session_id).await;

        let mut session = self.load(session_id)?;
        if session.status.is_terminal() {
            return Err(conflict(&session, "session is already decided"));
        }
        self.repo.set_status(session_id, SessionStatus::Cancelled)?;
        session.status = SessionStatus::Cancelled;
        info!("session cancelled");
        Ok(session)
    }

    /// Record an interviewer's acknowledgement of the confirmed schedule.
    #[instrument(skip_all, fields(session_id = %session_id, interviewer_id = %interviewer_id))]
    pub async fn acknowledge(
        &self,
        session_id: &SessionId,
        interviewer_id: &InterviewerId,
    ) -> Result<Assignment> {
        let session = self.load(session_id)?;
        if session.status != SessionStatus::Confirmed {
            return Err(conflict(&session, "only confirmed sessions can be acknowledged"));
        }
        self.repo
            .mark_accepted(session_id, interviewer_id, self.clock.now())?;

        self.repo
            .get_assignments(session_id)?
            .into_iter()
            .find(|a| &a.interviewer.id == interviewer_id)
            .ok_or_else(|| CoordinatorError::InterviewerNotFound {
                session_id: session_id.clone(),
                interviewer_id: interviewer_id.clone(),
            })
    }

    /// Serialise work on one session with submissions and sweeps.
    ///
    /// Callers outside the coordinator (the reminder job) take this before
    /// re-reading assignments they are about to act on.
    pub async fn lock_session(&self, session_id: &SessionId) -> SessionGuard<'_> {
        let lock = Arc::clone(&self.locks.entry(session_id.clone()).or_default());
        SessionGuard {
            locks: &self.locks,
            session_id: session_id.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    // --- private helpers ---------------------------------------------------

    /// Status step after the response count changed.
    async fn advance(
        &self,
        session: &InterviewSession,
        assignments: &[Assignment],
        now: DateTime<Utc>,
    ) -> Result<SubmitOutcome> {
        let total = assignments.len();
        let responded = responded_count(assignments);

        if responded < total {
            if responded > 0 && session.status != SessionStatus::Partial {
                self.repo.set_status(&session.id, SessionStatus::Partial)?;
            }
            debug!(responded, total, "waiting on remaining interviewers");
            return Ok(SubmitOutcome::Partial { responded, total });
        }

        self.finalize(session, assignments, now).await
    }

    /// Resolve a fully answered session into `CONFIRMED` or `NO_COMMON`.
    async fn finalize(
        &self,
        session: &InterviewSession,
        assignments: &[Assignment],
        now: DateTime<Utc>,
    ) -> Result<SubmitOutcome> {
        if session.status == SessionStatus::Confirmed {
            return Err(conflict(session, "session is already confirmed"));
        }

        let submissions = self.repo.get_submissions(&session.id)?;
        let resolution =
            self.resolver
                .resolve(&submissions, responded_count(assignments), assignments.len());

        let Some(slot) = resolution.earliest() else {
            self.repo.set_status(&session.id, SessionStatus::NoCommon)?;
            info!(session_id = %session.id, "no common slot; session closed");
            return Ok(SubmitOutcome::NoCommon);
        };

        // Only the date of the common slot governs; candidates keep the
        // blocks computed at creation.
        let schedule = ConfirmedSchedule {
            session_id: session.id.clone(),
            date: slot.date,
            start: session.proposed_start,
            end: session.proposed_end,
            common_slot: slot.clone(),
            candidate_slots: session.candidate_slots.clone(),
            confirmed_at: now,
        };
        self.repo.confirm(&schedule)?;
        info!(
            session_id = %session.id,
            date = %schedule.date,
            common_slots = resolution.common_slots.len(),
            "session confirmed"
        );

        let recipients = confirmation_recipients(session, assignments);
        if let Err(e) = self
            .notifier
            .send_confirmation(&recipients, session, &schedule)
            .await
        {
            // The schedule stands; delivery is the notifier's concern.
            warn!(session_id = %session.id, error = %e, "confirmation notification failed");
        }

        Ok(SubmitOutcome::Confirmed { schedule })
    }

    fn load(&self, session_id: &SessionId) -> Result<InterviewSession> {
        self.repo
            .get_session(session_id)?
            .ok_or_else(|| CoordinatorError::SessionNotFound {
                id: session_id.clone(),
            })
    }
}

/// Held lock on one session. Dropping the last holder evicts the map entry,
/// so unknown ids and long-lived sessions leave nothing behind.
pub struct SessionGuard<'a> {
    locks: &'a DashMap<SessionId, Arc<Mutex<()>>>,
    session_id: SessionId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Waiters hold their own clone of the Arc, so the count is 1 only
        // when nobody else is queued on this session.
        self.locks
            .remove_if(&self.session_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

fn conflict(session: &InterviewSession, reason: &str) -> CoordinatorError {
    CoordinatorError::Conflict {
        id: session.id.clone(),
        status: session.status,
        reason: reason.to_string(),
    }
}

fn validate_ranges(ranges: &[TimeRange]) -> Result<()> {
    if ranges.is_empty() {
        return Err(CoordinatorError::Validation(
            "at least one time range is required".to_string(),
        ));
    }
    for range in ranges {
        range.validate()?;
    }
    Ok(())
}

/// Interviewer contacts followed by candidate contacts, deduplicated
/// case-insensitively; blanks are skipped.
fn confirmation_recipients(session: &InterviewSession, assignments: &[Assignment]) -> Vec<String> {
    let mut seen = HashSet::new();
    assignments
        .iter()
        .map(|a| a.interviewer.contact.trim())
        .chain(
            session
                .candidates
                .iter()
                .filter_map(|c| c.contact.as_deref().map(str::trim)),
        )
        .filter(|c| !c.is_empty() && seen.insert(c.to_ascii_lowercase()))
        .map(String::from)
        .collect()
}
