use chrono::NaiveDate;
use convene_core::types::{
    Assignment, Candidate, ClockTime, ConfirmedSchedule, InterviewSession, Interviewer,
};
use serde::{Deserialize, Serialize};

/// Input of [`SessionCoordinator::create_session`](crate::SessionCoordinator::create_session),
/// as produced by the booking flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
    pub proposed_date: NaiveDate,
    pub proposed_start: ClockTime,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub interviewers: Vec<Interviewer>,
    /// Per-candidate length; falls back to the engine default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

/// Result of a submission or a sweep re-evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Still waiting on other interviewers.
    Partial { responded: usize, total: usize },
    Confirmed { schedule: ConfirmedSchedule },
    /// Everyone answered and nothing overlaps.
    NoCommon,
}

/// Read model of a session for callers and the HTTP surface.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session: InterviewSession,
    pub assignments: Vec<Assignment>,
    pub responded_count: usize,
    pub total_assigned: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ConfirmedSchedule>,
}
