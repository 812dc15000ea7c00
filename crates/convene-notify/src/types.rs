//! Notification payloads handed to the delivery layer.

use std::fmt;

use chrono::NaiveDate;
use convene_core::types::{
    Candidate, CandidateSlot, ClockTime, ConfirmedSchedule, InterviewSession, Interviewer,
    SessionId,
};
use serde::{Deserialize, Serialize};

/// Ordinal of a reminder escalation: 1 for the first reminder, 2 for the second, …
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReminderTier(pub u32);

impl ReminderTier {
    pub fn ordinal(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ReminderTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            1 => write!(f, "first"),
            2 => write!(f, "second"),
            n => write!(f, "#{n}"),
        }
    }
}

/// A message ready for delivery. Templating and rendering are the
/// delivery adapter's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    Reminder {
        to: Interviewer,
        session_id: SessionId,
        proposed_date: NaiveDate,
        proposed_start: ClockTime,
        proposed_end: ClockTime,
        tier: ReminderTier,
    },
    Confirmation {
        recipients: Vec<String>,
        session_id: SessionId,
        date: NaiveDate,
        start: ClockTime,
        end: ClockTime,
        candidate_slots: Vec<CandidateSlot>,
    },
    DayBefore {
        to: Interviewer,
        session_id: SessionId,
        date: NaiveDate,
        start: ClockTime,
        end: ClockTime,
        candidates: Vec<Candidate>,
    },
}

impl Notification {
    pub fn reminder(interviewer: &Interviewer, session: &InterviewSession, tier: ReminderTier) -> Self {
        Notification::Reminder {
            to: interviewer.clone(),
            session_id: session.id.clone(),
            proposed_date: session.proposed_date,
            proposed_start: session.proposed_start,
            proposed_end: session.proposed_end,
            tier,
        }
    }

    pub fn confirmation(recipients: &[String], schedule: &ConfirmedSchedule) -> Self {
        Notification::Confirmation {
            recipients: recipients.to_vec(),
            session_id: schedule.session_id.clone(),
            date: schedule.date,
            start: schedule.start,
            end: schedule.end,
            candidate_slots: schedule.candidate_slots.clone(),
        }
    }

    pub fn day_before(
        interviewer: &Interviewer,
        session: &InterviewSession,
        schedule: &ConfirmedSchedule,
    ) -> Self {
        Notification::DayBefore {
            to: interviewer.clone(),
            session_id: schedule.session_id.clone(),
            date: schedule.date,
            start: schedule.start,
            end: schedule.end,
            candidates: session.candidates.clone(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Reminder { .. } => "reminder",
            Notification::Confirmation { .. } => "confirmation",
            Notification::DayBefore { .. } => "day_before",
        }
    }

    pub fn session_id(&self) -> &SessionId {
        match self {
            Notification::Reminder { session_id, .. }
            | Notification::Confirmation { session_id, .. }
            | Notification::DayBefore { session_id, .. } => session_id,
        }
    }

    /// Every address this notification goes to.
    pub fn recipients(&self) -> Vec<String> {
        match self {
            Notification::Reminder { to, .. } | Notification::DayBefore { to, .. } => {
                vec![to.contact.clone()]
            }
            Notification::Confirmation { recipients, .. } => recipients.clone(),
        }
    }

    /// One-line plain-text summary, used for logs and as a delivery fallback.
    pub fn summary(&self) -> String {
        match self {
            Notification::Reminder {
                proposed_date,
                proposed_start,
                proposed_end,
                tier,
                ..
            } => format!(
                "{tier} reminder: please submit your availability for {proposed_date} {proposed_start}-{proposed_end}"
            ),
            Notification::Confirmation { date, start, end, .. } => {
                format!("Interview confirmed for {date} {start}-{end}")
            }
            Notification::DayBefore {
                date,
                start,
                end,
                candidates,
                ..
            } => {
                let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
                format!(
                    "Tomorrow {date} {start}-{end}: interviews with {}",
                    if names.is_empty() { "-".to_string() } else { names.join(", ") }
                )
            }
        }
    }
}
