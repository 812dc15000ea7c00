//! `convene-scheduler`: periodic jobs over interview sessions.
//!
//! # Jobs
//!
//! | Job              | Default schedule | Effect                                           |
//! |------------------|------------------|--------------------------------------------------|
//! | `reminder`       | every hour       | Escalating reminders to silent interviewers      |
//! | `reconciliation` | daily 02:00 UTC  | Finishes `PARTIAL` sessions with every response in |
//! | `day_before`     | daily 09:00 UTC  | Tells interviewers about tomorrow's interviews   |
//!
//! Each job is a plain async function taking `now`, so it can be driven from
//! tests directly. The [`engine::SchedulerEngine`] polls once per second and
//! fires whichever jobs are due according to the injected clock.

pub mod day_before;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod reminder;
pub mod schedule;
pub mod types;

pub use day_before::run_day_before_tick;
pub use engine::{EngineHandle, JobSlot, SchedulerEngine};
pub use error::{Result, SchedulerError};
pub use reconcile::run_reconciliation_sweep;
pub use reminder::{due_tier, run_reminder_tick};
pub use schedule::{compute_next_run, Schedule};
pub use types::{JobKind, JobReport};
