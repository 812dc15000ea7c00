use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use convene_core::config::{EngineConfig, JobsConfig};
use convene_core::types::{
    Assignment, AvailabilitySubmission, ConfirmedSchedule, InterviewSession, Interviewer,
    InterviewerId, SessionId, SessionStatus, TimeRange,
};
use convene_core::{Clock, ManualClock};
use convene_notify::{NotifyError, Notifier, ReminderTier};
use convene_scheduler::{
    run_day_before_tick, run_reconciliation_sweep, run_reminder_tick, JobKind, SchedulerEngine,
};
use convene_sessions::error::RepoResult;
use convene_sessions::{
    AvailabilityRepository, MemoryRepository, NewSession, RepositoryError, SessionCoordinator,
};

/// Records every send; fails sends addressed to `fail_for`.
#[derive(Default)]
struct RecordingNotifier {
    fail_for: Option<InterviewerId>,
    reminders: Mutex<Vec<(InterviewerId, SessionId, ReminderTier)>>,
    day_before: Mutex<Vec<(InterviewerId, SessionId)>>,
}

impl RecordingNotifier {
    fn failing_for(id: &str) -> Self {
        Self {
            fail_for: Some(InterviewerId::from(id)),
            ..Default::default()
        }
    }

    fn check(&self, to: &Interviewer) -> Result<(), NotifyError> {
        if self.fail_for.as_ref() == Some(&to.id) {
            return Err(NotifyError::SendFailed(format!("mailbox {} rejected", to.contact)));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_reminder(
        &self,
        interviewer: &Interviewer,
        session: &InterviewSession,
        tier: ReminderTier,
    ) -> Result<(), NotifyError> {
        self.check(interviewer)?;
        self.reminders
            .lock()
            .unwrap()
            .push((interviewer.id.clone(), session.id.clone(), tier));
        Ok(())
    }

    async fn send_confirmation(
        &self,
        _recipients: &[String],
        _session: &InterviewSession,
        _schedule: &ConfirmedSchedule,
    ) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn send_day_before(
        &self,
        interviewer: &Interviewer,
        session: &InterviewSession,
        _schedule: &ConfirmedSchedule,
    ) -> Result<(), NotifyError> {
        self.check(interviewer)?;
        self.day_before
            .lock()
            .unwrap()
            .push((interviewer.id.clone(), session.id.clone()));
        Ok(())
    }
}

/// Delegates to a [`MemoryRepository`] but fails assignment reads for one session.
struct FlakyRepository {
    inner: MemoryRepository,
    broken: Mutex<Option<SessionId>>,
}

impl FlakyRepository {
    fn new() -> Self {
        Self {
            inner: MemoryRepository::new(),
            broken: Mutex::new(None),
        }
    }

    fn break_session(&self, id: &SessionId) {
        *self.broken.lock().unwrap() = Some(id.clone());
    }
}

impl AvailabilityRepository for FlakyRepository {
    fn insert_session(&self, session: &InterviewSession, interviewers: &[Interviewer]) -> RepoResult<()> {
        self.inner.insert_session(session, interviewers)
    }

    fn get_session(&self, id: &SessionId) -> RepoResult<Option<InterviewSession>> {
        self.inner.get_session(id)
    }

    fn set_status(&self, id: &SessionId, status: SessionStatus) -> RepoResult<()> {
        self.inner.set_status(id, status)
    }

    fn get_assignments(&self, id: &SessionId) -> RepoResult<Vec<Assignment>> {
        if self.broken.lock().unwrap().as_ref() == Some(id) {
            return Err(RepositoryError::Corrupt("assignment row unreadable".into()));
        }
        self.inner.get_assignments(id)
    }

    fn get_submissions(&self, id: &SessionId) -> RepoResult<Vec<AvailabilitySubmission>> {
        self.inner.get_submissions(id)
    }

    fn record_submission(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        ranges: &[TimeRange],
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        self.inner.record_submission(id, interviewer_id, ranges, at)
    }

    fn mark_responded(&self, id: &SessionId, interviewer_id: &InterviewerId, at: DateTime<Utc>) -> RepoResult<()> {
        self.inner.mark_responded(id, interviewer_id, at)
    }

    fn mark_reminder_sent(&self, id: &SessionId, interviewer_id: &InterviewerId, at: DateTime<Utc>) -> RepoResult<()> {
        self.inner.mark_reminder_sent(id, interviewer_id, at)
    }

    fn set_confirmed_schedule(&self, schedule: &ConfirmedSchedule) -> RepoResult<()> {
        self.inner.set_confirmed_schedule(schedule)
    }

    fn get_confirmed_schedule(&self, id: &SessionId) -> RepoResult<Option<ConfirmedSchedule>> {
        self.inner.get_confirmed_schedule(id)
    }

    fn list_sessions_by_status(&self, status: SessionStatus) -> RepoResult<Vec<InterviewSession>> {
        self.inner.list_sessions_by_status(status)
    }

    fn mark_accepted(&self, id: &SessionId, interviewer_id: &InterviewerId, at: DateTime<Utc>) -> RepoResult<()> {
        self.inner.mark_accepted(id, interviewer_id, at)
    }

    fn mark_day_before_sent(&self, id: &SessionId, interviewer_id: &InterviewerId, on: NaiveDate) -> RepoResult<()> {
        self.inner.mark_day_before_sent(id, interviewer_id, on)
    }
}

struct Harness {
    coordinator: Arc<SessionCoordinator>,
    repo: Arc<dyn AvailabilityRepository>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<ManualClock>,
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

fn harness_with(repo: Arc<dyn AvailabilityRepository>, notifier: RecordingNotifier) -> Harness {
    let notifier = Arc::new(notifier);
    let clock = Arc::new(ManualClock::new(t0()));
    let coordinator = Arc::new(SessionCoordinator::new(
        Arc::clone(&repo),
        notifier.clone(),
        clock.clone(),
        EngineConfig::default(),
    ));
    Harness {
        coordinator,
        repo,
        notifier,
        clock,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(MemoryRepository::new()), RecordingNotifier::default())
}

fn range(d: u32, start: &str, end: &str) -> TimeRange {
    TimeRange::new(
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap(),
        start.parse().unwrap(),
        end.parse().unwrap(),
    )
}

fn create(h: &Harness, interviewers: &[&str]) -> InterviewSession {
    h.coordinator
        .create_session(NewSession {
            proposed_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            proposed_start: "09:00".parse().unwrap(),
            candidates: vec![],
            interviewers: interviewers
                .iter()
                .map(|id| Interviewer {
                    id: InterviewerId::from(*id),
                    contact: format!("{id}@example.com"),
                })
                .collect(),
            duration_minutes: None,
        })
        .unwrap()
}

fn assignment(h: &Harness, session: &SessionId, who: &str) -> Assignment {
    h.repo
        .get_assignments(session)
        .unwrap()
        .into_iter()
        .find(|a| a.interviewer.id.as_str() == who)
        .unwrap()
}

async fn confirm_on(h: &Harness, interviewers: &[&str], d: u32) -> InterviewSession {
    let session = create(h, interviewers);
    for who in interviewers {
        h.coordinator
            .submit_availability(&session.id, &InterviewerId::from(*who), vec![range(d, "09:00", "10:00")])
            .await
            .unwrap();
    }
    session
}

#[tokio::test]
async fn overdue_assignment_gets_one_reminder_per_tick() {
    let h = harness();
    let session = create(&h, &["a"]);

    h.clock.advance(Duration::hours(50));
    let report = run_reminder_tick(&h.coordinator, h.clock.now()).await.unwrap();
    assert_eq!((report.scanned, report.succeeded, report.failed), (1, 1, 0));

    let a = assignment(&h, &session.id, "a");
    assert_eq!(a.reminder_count, 1);
    assert_eq!(a.last_reminder_at, Some(h.clock.now()));

    h.clock.advance(Duration::minutes(30));
    let report = run_reminder_tick(&h.coordinator, h.clock.now()).await.unwrap();
    assert_eq!(report.succeeded, 0);
    assert_eq!(assignment(&h, &session.id, "a").reminder_count, 1);
    assert_eq!(h.notifier.reminders.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn reminders_escalate_then_stop_at_budget() {
    let h = harness();
    let session = create(&h, &["a"]);

    h.clock.advance(Duration::hours(48));
    run_reminder_tick(&h.coordinator, h.clock.now()).await.unwrap();
    h.clock.advance(Duration::hours(24));
    run_reminder_tick(&h.coordinator, h.clock.now()).await.unwrap();
    h.clock.advance(Duration::hours(48));
    run_reminder_tick(&h.coordinator, h.clock.now()).await.unwrap();

    let tiers: Vec<ReminderTier> = h
        .notifier
        .reminders
        .lock()
        .unwrap()
        .iter()
        .map(|(_, _, tier)| *tier)
        .collect();
    assert_eq!(tiers, vec![ReminderTier(1), ReminderTier(2)]);
    assert_eq!(assignment(&h, &session.id, "a").reminder_count, 2);
}

#[tokio::test]
async fn responded_interviewers_are_not_reminded() {
    let h = harness();
    let session = create(&h, &["a", "b"]);
    h.coordinator
        .submit_availability(&session.id, &InterviewerId::from("a"), vec![range(2, "09:00", "10:00")])
        .await
        .unwrap();

    h.clock.advance(Duration::hours(49));
    run_reminder_tick(&h.coordinator, h.clock.now()).await.unwrap();

    let reminded: Vec<InterviewerId> = h
        .notifier
        .reminders
        .lock()
        .unwrap()
        .iter()
        .map(|(who, _, _)| who.clone())
        .collect();
    assert_eq!(reminded, vec![InterviewerId::from("b")]);
}

#[tokio::test]
async fn submission_during_tick_suppresses_reminder() {
    let h = harness();
    let session = create(&h, &["a", "b"]);
    h.clock.advance(Duration::hours(49));

    let held = h.coordinator.lock_session(&session.id).await;
    let tick = run_reminder_tick(&h.coordinator, h.clock.now());
    tokio::pin!(tick);
    // The tick has listed the session and is now queued on its lock.
    tokio::select! {
        biased;
        _ = &mut tick => panic!("tick finished while the session was locked"),
        _ = std::future::ready(()) => {}
    }

    h.repo
        .record_response(
            &session.id,
            &InterviewerId::from("a"),
            &[range(2, "09:00", "10:00")],
            h.clock.now(),
        )
        .unwrap();
    drop(held);

    let report = tick.await.unwrap();
    assert_eq!((report.scanned, report.succeeded, report.failed), (1, 1, 0));
    let reminded: Vec<InterviewerId> = h
        .notifier
        .reminders
        .lock()
        .unwrap()
        .iter()
        .map(|(who, _, _)| who.clone())
        .collect();
    assert_eq!(reminded, vec![InterviewerId::from("b")]);
    assert_eq!(assignment(&h, &session.id, "a").reminder_count, 0);
}

#[tokio::test]
async fn failed_reminder_is_retried_and_sweep_continues() {
    let h = harness_with(
        Arc::new(MemoryRepository::new()),
        RecordingNotifier::failing_for("flaky"),
    );
    let first = create(&h, &["flaky", "b"]);
    let second = create(&h, &["c"]);

    h.clock.advance(Duration::hours(50));
    let report = run_reminder_tick(&h.coordinator, h.clock.now()).await.unwrap();
    assert_eq!((report.scanned, report.succeeded, report.failed), (2, 2, 1));

    let flaky = assignment(&h, &first.id, "flaky");
    assert_eq!(flaky.reminder_count, 0);
    assert_eq!(flaky.last_reminder_at, None);
    assert_eq!(assignment(&h, &first.id, "b").reminder_count, 1);
    assert_eq!(assignment(&h, &second.id, "c").reminder_count, 1);

    // Still owed, so the next tick tries again.
    h.clock.advance(Duration::hours(1));
    let report = run_reminder_tick(&h.coordinator, h.clock.now()).await.unwrap();
    assert_eq!((report.succeeded, report.failed), (0, 1));
}

#[tokio::test]
async fn broken_session_is_counted_and_skipped() {
    let repo = Arc::new(FlakyRepository::new());
    let h = harness_with(repo.clone(), RecordingNotifier::default());
    let broken = create(&h, &["a"]);
    let healthy = create(&h, &["b"]);
    repo.break_session(&broken.id);

    h.clock.advance(Duration::hours(50));
    let report = run_reminder_tick(&h.coordinator, h.clock.now()).await.unwrap();
    assert_eq!((report.scanned, report.succeeded, report.failed), (2, 1, 1));
    assert_eq!(assignment(&h, &healthy.id, "b").reminder_count, 1);
}

#[tokio::test]
async fn sweep_resolves_partial_session_with_all_responses() {
    let h = harness();
    let session = create(&h, &["a", "b"]);
    h.coordinator
        .submit_availability(&session.id, &InterviewerId::from("a"), vec![range(2, "09:00", "10:00")])
        .await
        .unwrap();
    // The last response is stored but the status step never ran.
    h.repo
        .record_response(
            &session.id,
            &InterviewerId::from("b"),
            &[range(2, "09:30", "11:00")],
            h.clock.now(),
        )
        .unwrap();

    let report = run_reconciliation_sweep(&h.coordinator, h.clock.now()).await.unwrap();
    assert_eq!((report.scanned, report.succeeded, report.failed), (1, 1, 0));

    let schedule = h.repo.get_confirmed_schedule(&session.id).unwrap().unwrap();
    assert_eq!(schedule.common_slot.to_string(), "2026-03-02 09:30-10:00");
    assert_eq!(
        h.repo.get_session(&session.id).unwrap().unwrap().status,
        SessionStatus::Confirmed
    );

    let again = run_reconciliation_sweep(&h.coordinator, h.clock.now()).await.unwrap();
    assert_eq!((again.scanned, again.succeeded), (0, 0));
}

#[tokio::test]
async fn sweep_leaves_incomplete_partial_sessions() {
    let h = harness();
    let session = create(&h, &["a", "b"]);
    h.coordinator
        .submit_availability(&session.id, &InterviewerId::from("a"), vec![range(2, "09:00", "10:00")])
        .await
        .unwrap();

    let report = run_reconciliation_sweep(&h.coordinator, h.clock.now()).await.unwrap();
    assert_eq!((report.scanned, report.succeeded), (1, 0));
    assert_eq!(
        h.repo.get_session(&session.id).unwrap().unwrap().status,
        SessionStatus::Partial
    );
}

#[tokio::test]
async fn day_before_notifies_tomorrows_interviews_once() {
    let h = harness();
    let tomorrow = confirm_on(&h, &["a", "b"], 2).await;
    let later = confirm_on(&h, &["c"], 5).await;

    h.clock.set(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
    let report = run_day_before_tick(&h.coordinator, h.clock.now()).await.unwrap();
    assert_eq!((report.scanned, report.succeeded, report.failed), (2, 2, 0));

    let sent = h.notifier.day_before.lock().unwrap().clone();
    assert!(sent.iter().all(|(_, id)| *id == tomorrow.id));
    assert!(!sent.iter().any(|(_, id)| *id == later.id));
    assert_eq!(
        assignment(&h, &tomorrow.id, "a").day_before_sent_on,
        NaiveDate::from_ymd_opt(2026, 3, 2)
    );

    let again = run_day_before_tick(&h.coordinator, h.clock.now()).await.unwrap();
    assert_eq!(again.succeeded, 0);
    assert_eq!(h.notifier.day_before.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn day_before_retries_only_failed_sends() {
    let h = harness_with(
        Arc::new(MemoryRepository::new()),
        RecordingNotifier::failing_for("b"),
    );
    let session = confirm_on(&h, &["a", "b"], 2).await;

    let report = run_day_before_tick(&h.coordinator, h.clock.now()).await.unwrap();
    assert_eq!((report.succeeded, report.failed), (1, 1));
    assert_eq!(assignment(&h, &session.id, "b").day_before_sent_on, None);

    let again = run_day_before_tick(&h.coordinator, h.clock.now()).await.unwrap();
    assert_eq!((again.succeeded, again.failed), (0, 1));
}

#[tokio::test]
async fn engine_runs_due_jobs_from_the_injected_clock() {
    let h = harness();
    create(&h, &["a"]);
    let mut engine = SchedulerEngine::new(Arc::clone(&h.coordinator), &JobsConfig::default()).unwrap();

    // 08:00: nothing due yet.
    assert!(engine.tick().await.is_empty());

    // 09:00 is both the first hourly reminder tick and the day-before time.
    h.clock.set(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap());
    let kinds: Vec<JobKind> = engine.tick().await.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![JobKind::Reminder, JobKind::DayBefore]);
    assert!(engine.tick().await.is_empty());

    // 02:00 next day brings the reconciliation sweep.
    h.clock.set(Utc.with_ymd_and_hms(2026, 3, 2, 2, 0, 0).unwrap());
    let kinds: Vec<JobKind> = engine.tick().await.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![JobKind::Reminder, JobKind::Reconciliation]);

    let reconcile = &engine.slots()[1];
    assert_eq!(
        reconcile.next_run,
        Some(Utc.with_ymd_and_hms(2026, 3, 3, 2, 0, 0).unwrap())
    );
    assert!(reconcile.last_report.is_some());
}

#[tokio::test]
async fn engine_rejects_invalid_job_times() {
    let h = harness();
    let jobs = JobsConfig {
        day_before_hour: 25,
        ..JobsConfig::default()
    };
    assert!(SchedulerEngine::new(Arc::clone(&h.coordinator), &jobs).is_err());
}

#[tokio::test]
async fn engine_starts_and_stops() {
    let h = harness();
    let engine = SchedulerEngine::new(Arc::clone(&h.coordinator), &JobsConfig::default()).unwrap();

    let handle = engine.start();
    tokio::task::yield_now().await;
    assert!(!handle.is_finished());
    handle.stop().await;
}
