use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// Unique identifier for an interview session (UUIDv7, time-sortable for log correlation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier of an interviewer, supplied by the booking flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterviewerId(pub String);

impl InterviewerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterviewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for InterviewerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a candidate, supplied by the booking flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub String);

impl CandidateId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Time of day with minute precision, rendered as zero-padded `HH:mm`.
///
/// Stored as minutes since midnight so ordering is chronological, which also
/// matches the lexical order of the rendered string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTime(u16);

impl ClockTime {
    pub const MINUTES_PER_DAY: u32 = 24 * 60;

    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self((hour * 60 + minute) as u16))
        } else {
            None
        }
    }

    pub fn from_minutes(minutes: u32) -> Option<Self> {
        (minutes < Self::MINUTES_PER_DAY).then_some(Self(minutes as u16))
    }

    pub fn minutes(self) -> u32 {
        self.0 as u32
    }

    pub fn hour(self) -> u32 {
        self.minutes() / 60
    }

    pub fn minute(self) -> u32 {
        self.minutes() % 60
    }

    /// Add minutes on a 24h clock face: `23:30 + 60` is `00:30`.
    pub fn wrapping_add_minutes(self, minutes: u64) -> Self {
        let total = (self.0 as u64 + minutes) % Self::MINUTES_PER_DAY as u64;
        Self(total as u16)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for ClockTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidTime(s.to_string()))?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(CoreError::InvalidTime(s.to_string()));
        }
        let hour: u32 = h.parse().map_err(|_| CoreError::InvalidTime(s.to_string()))?;
        let minute: u32 = m.parse().map_err(|_| CoreError::InvalidTime(s.to_string()))?;
        Self::new(hour, minute).ok_or_else(|| CoreError::InvalidTime(s.to_string()))
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A same-day window of availability: `[start, end)` on `date`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub date: NaiveDate,
    pub start: ClockTime,
    pub end: ClockTime,
}

impl TimeRange {
    pub fn new(date: NaiveDate, start: ClockTime, end: ClockTime) -> Self {
        Self { date, start, end }
    }

    /// Ranges must end strictly after they start; overnight ranges are not supported.
    pub fn validate(&self) -> Result<()> {
        if self.end <= self.start {
            return Err(CoreError::InvalidRange(format!(
                "{} {}-{}: end must be after start",
                self.date, self.start, self.end
            )));
        }
        Ok(())
    }

    pub fn duration_minutes(&self) -> u32 {
        self.end.minutes().saturating_sub(self.start.minutes())
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}-{}", self.date, self.start, self.end)
    }
}

/// Lifecycle of an interview session.
///
/// `NoCommon` and `Cancelled` are terminal; `Confirmed` is terminal for
/// scheduling (only acceptance bookkeeping changes afterwards).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Pending,
    Partial,
    Confirmed,
    NoCommon,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Confirmed | SessionStatus::NoCommon | SessionStatus::Cancelled
        )
    }

    /// Sessions still waiting on interviewer responses.
    pub fn is_open(self) -> bool {
        matches!(self, SessionStatus::Pending | SessionStatus::Partial)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Pending => "PENDING",
            SessionStatus::Partial => "PARTIAL",
            SessionStatus::Confirmed => "CONFIRMED",
            SessionStatus::NoCommon => "NO_COMMON",
            SessionStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SessionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(SessionStatus::Pending),
            "PARTIAL" => Ok(SessionStatus::Partial),
            "CONFIRMED" => Ok(SessionStatus::Confirmed),
            "NO_COMMON" => Ok(SessionStatus::NoCommon),
            "CANCELLED" => Ok(SessionStatus::Cancelled),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// An interviewer assigned to a session, with the address notifications go to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interviewer {
    pub id: InterviewerId,
    pub contact: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
}

/// A candidate's pre-assigned block inside the session window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    pub candidate_id: CandidateId,
    pub start: ClockTime,
    pub end: ClockTime,
}

/// One interview coordination unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: SessionId,
    pub proposed_date: NaiveDate,
    pub proposed_start: ClockTime,
    /// Derived from the start, the candidate count and the duration at creation.
    pub proposed_end: ClockTime,
    pub duration_minutes: u32,
    pub candidates: Vec<Candidate>,
    /// Contiguous blocks in candidate order, computed once at creation.
    pub candidate_slots: Vec<CandidateSlot>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

/// The response state of one interviewer for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub session_id: SessionId,
    pub interviewer: Interviewer,
    pub responded_at: Option<DateTime<Utc>>,
    pub reminder_count: u32,
    pub last_reminder_at: Option<DateTime<Utc>>,
    /// Post-confirmation acknowledgement by the interviewer.
    pub accepted_at: Option<DateTime<Utc>>,
    /// Schedule date for which the day-before notice was delivered.
    pub day_before_sent_on: Option<NaiveDate>,
}

impl Assignment {
    pub fn new(session_id: SessionId, interviewer: Interviewer) -> Self {
        Self {
            session_id,
            interviewer,
            responded_at: None,
            reminder_count: 0,
            last_reminder_at: None,
            accepted_at: None,
            day_before_sent_on: None,
        }
    }

    pub fn has_responded(&self) -> bool {
        self.responded_at.is_some()
    }
}

/// The latest availability an interviewer submitted for a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySubmission {
    pub session_id: SessionId,
    pub interviewer_id: InterviewerId,
    pub ranges: Vec<TimeRange>,
    pub submitted_at: DateTime<Utc>,
}

/// The agreed schedule; exists exactly when the session is `CONFIRMED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmedSchedule {
    pub session_id: SessionId,
    pub date: NaiveDate,
    pub start: ClockTime,
    pub end: ClockTime,
    /// The earliest common slot; only its date governs the schedule.
    pub common_slot: TimeRange,
    pub candidate_slots: Vec<CandidateSlot>,
    pub confirmed_at: DateTime<Utc>,
}

/// Count assignments with a recorded response.
pub fn responded_count(assignments: &[Assignment]) -> usize {
    assignments.iter().filter(|a| a.has_responded()).count()
}
