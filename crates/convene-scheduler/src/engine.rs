use std::sync::Arc;

use chrono::{DateTime, Utc};
use convene_core::config::JobsConfig;
use convene_sessions::SessionCoordinator;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::{
    day_before::run_day_before_tick,
    error::Result,
    reconcile::run_reconciliation_sweep,
    reminder::run_reminder_tick,
    schedule::{compute_next_run, Schedule},
    types::{JobKind, JobReport},
};

/// One periodic job and its next planned run.
#[derive(Debug, Clone)]
pub struct JobSlot {
    pub kind: JobKind,
    pub schedule: Schedule,
    pub next_run: Option<DateTime<Utc>>,
    pub last_report: Option<JobReport>,
}

impl JobSlot {
    fn new(kind: JobKind, schedule: Schedule, now: DateTime<Utc>) -> Result<Self> {
        schedule.validate()?;
        let next_run = compute_next_run(&schedule, now);
        Ok(Self {
            kind,
            schedule,
            next_run,
            last_report: None,
        })
    }

    fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run.is_some_and(|t| t <= now)
    }
}

/// Drives the reminder, reconciliation and day-before jobs at ±1 s precision.
///
/// Time comes from the coordinator's clock, so tests can move a
/// `ManualClock` and call [`tick`](Self::tick) directly.
pub struct SchedulerEngine {
    coordinator: Arc<SessionCoordinator>,
    slots: Vec<JobSlot>,
}

impl SchedulerEngine {
    pub fn new(coordinator: Arc<SessionCoordinator>, jobs: &JobsConfig) -> Result<Self> {
        let now = coordinator.clock().now();
        let slots = vec![
            JobSlot::new(
                JobKind::Reminder,
                Schedule::Interval {
                    every_secs: jobs.reminder_every_secs,
                },
                now,
            )?,
            JobSlot::new(
                JobKind::Reconciliation,
                Schedule::Daily {
                    hour: jobs.reconcile_hour,
                    minute: jobs.reconcile_minute,
                },
                now,
            )?,
            JobSlot::new(
                JobKind::DayBefore,
                Schedule::Daily {
                    hour: jobs.day_before_hour,
                    minute: jobs.day_before_minute,
                },
                now,
            )?,
        ];
        for slot in &slots {
            info!(job = %slot.kind, next_run = ?slot.next_run, "job scheduled");
        }
        Ok(Self { coordinator, slots })
    }

    pub fn slots(&self) -> &[JobSlot] {
        &self.slots
    }

    /// Run one job immediately, outside its schedule.
    pub async fn run_job(&self, kind: JobKind, now: DateTime<Utc>) -> Result<JobReport> {
        match kind {
            JobKind::Reminder => run_reminder_tick(&self.coordinator, now).await,
            JobKind::Reconciliation => run_reconciliation_sweep(&self.coordinator, now).await,
            JobKind::DayBefore => run_day_before_tick(&self.coordinator, now).await,
        }
    }

    /// Run every job whose `next_run` has arrived and plan its next run.
    ///
    /// A failed job is logged and rescheduled like a successful one.
    pub async fn tick(&mut self) -> Vec<JobReport> {
        let now = self.coordinator.clock().now();
        let mut reports = Vec::new();

        for idx in 0..self.slots.len() {
            if !self.slots[idx].is_due(now) {
                continue;
            }
            let kind = self.slots[idx].kind;
            let outcome = self.run_job(kind, now).await;

            let slot = &mut self.slots[idx];
            slot.next_run = compute_next_run(&slot.schedule, now);
            match outcome {
                Ok(report) => {
                    slot.last_report = Some(report.clone());
                    reports.push(report);
                }
                Err(e) => error!(job = %kind, error = %e, "job run failed"),
            }
        }
        reports
    }

    /// Main event loop. Polls every second until `shutdown` broadcasts `true`
    /// or its sender goes away.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("scheduler engine started");
        self.recover_on_startup().await;

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn start(self) -> EngineHandle {
        let (shutdown, rx) = watch::channel(false);
        let join = tokio::spawn(self.run(rx));
        EngineHandle { shutdown, join }
    }

    // --- private helpers ---------------------------------------------------

    /// Sessions left `PARTIAL` by a crash would otherwise wait for the next
    /// daily sweep.
    async fn recover_on_startup(&self) {
        let now = self.coordinator.clock().now();
        match run_reconciliation_sweep(&self.coordinator, now).await {
            Ok(report) if report.succeeded > 0 => {
                warn!(count = report.succeeded, "sessions reconciled on startup")
            }
            Err(e) => error!(error = %e, "startup reconciliation failed"),
            _ => {}
        }
    }
}

/// Lifecycle handle returned by [`SchedulerEngine::start`].
pub struct EngineHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl EngineHandle {
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signal shutdown and wait for the loop to exit.
    pub async fn stop(self) {
        // Err only means the loop is already gone.
        let _ = self.shutdown.send(true);
        if let Err(e) = self.join.await {
            error!(error = %e, "scheduler engine task panicked");
        }
    }
}
