use std::fmt;

use serde::{Deserialize, Serialize};

/// The periodic jobs the engine knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Reminder,
    Reconciliation,
    DayBefore,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobKind::Reminder => "reminder",
            JobKind::Reconciliation => "reconciliation",
            JobKind::DayBefore => "day_before",
        };
        write!(f, "{s}")
    }
}

/// Summary of one job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub kind: JobKind,
    /// Sessions examined.
    pub scanned: usize,
    /// Reminders sent, sessions resolved, or day-before notices sent.
    pub succeeded: usize,
    /// Notifier failures plus sessions whose processing errored.
    pub failed: usize,
}

impl JobReport {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            scanned: 0,
            succeeded: 0,
            failed: 0,
        }
    }
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: scanned={} succeeded={} failed={}",
            self.kind, self.scanned, self.succeeded, self.failed
        )
    }
}
