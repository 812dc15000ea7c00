use chrono::{DateTime, Duration, Utc};
use convene_core::config::EngineConfig;
use convene_core::types::{Assignment, InterviewSession, SessionStatus};
use convene_notify::ReminderTier;
use convene_sessions::SessionCoordinator;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::types::{JobKind, JobReport};

/// Which reminder, if any, `assignment` is owed at `now`.
///
/// The first reminder goes out `first_reminder_hours` after the session was
/// created. Every later one waits the escalation gap
/// (`second_reminder_hours - first_reminder_hours`) since the previous one.
/// Nothing is owed once the interviewer has responded or the reminder budget
/// is spent.
pub fn due_tier(
    assignment: &Assignment,
    session: &InterviewSession,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Option<ReminderTier> {
    if assignment.has_responded() || assignment.reminder_count >= config.max_reminder_count {
        return None;
    }

    // Offsets too large for a `Duration` are never reached.
    if assignment.reminder_count == 0 {
        let threshold = Duration::try_hours(config.first_reminder_hours)?;
        return (now - session.created_at >= threshold).then_some(ReminderTier(1));
    }

    let since = assignment.last_reminder_at.unwrap_or(session.created_at);
    let gap = Duration::try_hours(config.escalation_gap_hours())?;
    (now - since >= gap).then_some(ReminderTier(assignment.reminder_count + 1))
}

/// Send every reminder that is due across `PENDING` and `PARTIAL` sessions.
///
/// A failed send is logged and leaves the assignment untouched so the next
/// tick retries it; the sweep carries on with the remaining assignments.
/// Each session is handled under its coordinator lock.
#[instrument(skip(coordinator))]
pub async fn run_reminder_tick(
    coordinator: &SessionCoordinator,
    now: DateTime<Utc>,
) -> Result<JobReport> {
    let repo = coordinator.repository();
    let mut report = JobReport::new(JobKind::Reminder);

    for status in [SessionStatus::Pending, SessionStatus::Partial] {
        for session in repo.list_sessions_by_status(status)? {
            report.scanned += 1;
            if let Err(e) = remind_session(coordinator, &session, now, &mut report).await {
                report.failed += 1;
                warn!(session_id = %session.id, error = %e, "reminder sweep failed for session");
            }
        }
    }

    info!(%report, "reminder tick finished");
    Ok(report)
}

async fn remind_session(
    coordinator: &SessionCoordinator,
    session: &InterviewSession,
    now: DateTime<Utc>,
    report: &mut JobReport,
) -> Result<()> {
    let repo = coordinator.repository();
    let config = coordinator.config();

    // A submission may have landed since the listing; decide under the lock.
    let _guard = coordinator.lock_session(&session.id).await;
    let Some(session) = repo.get_session(&session.id)? else {
        return Ok(());
    };
    if session.status.is_terminal() {
        return Ok(());
    }
    let session = &session;

    for assignment in repo.get_assignments(&session.id)? {
        let Some(tier) = due_tier(&assignment, session, config, now) else {
            continue;
        };
        let interviewer = &assignment.interviewer;

        if let Err(e) = coordinator
            .notifier()
            .send_reminder(interviewer, session, tier)
            .await
        {
            report.failed += 1;
            warn!(
                session_id = %session.id,
                interviewer_id = %interviewer.id,
                %tier,
                error = %e,
                "reminder not delivered; will retry next tick"
            );
            continue;
        }

        repo.mark_reminder_sent(&session.id, &interviewer.id, now)?;
        report.succeeded += 1;
        debug!(session_id = %session.id, interviewer_id = %interviewer.id, %tier, "reminder sent");

        if tier.ordinal() >= config.max_reminder_count {
            warn!(
                session_id = %session.id,
                interviewer_id = %interviewer.id,
                "reminders exhausted without a response"
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use convene_core::types::{Interviewer, InterviewerId, SessionId};

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
    }

    fn session() -> InterviewSession {
        InterviewSession {
            id: SessionId::from("s-1"),
            proposed_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            proposed_start: "09:00".parse().unwrap(),
            proposed_end: "09:30".parse().unwrap(),
            duration_minutes: 30,
            candidates: vec![],
            candidate_slots: vec![],
            status: SessionStatus::Pending,
            created_at: created(),
        }
    }

    fn assignment() -> Assignment {
        Assignment::new(
            SessionId::from("s-1"),
            Interviewer {
                id: InterviewerId::from("a"),
                contact: "a@example.com".into(),
            },
        )
    }

    #[test]
    fn first_tier_waits_for_threshold() {
        let config = EngineConfig::default();
        let a = assignment();
        assert_eq!(due_tier(&a, &session(), &config, created() + Duration::hours(47)), None);
        assert_eq!(
            due_tier(&a, &session(), &config, created() + Duration::hours(48)),
            Some(ReminderTier(1))
        );
    }

    #[test]
    fn second_tier_counts_from_last_reminder() {
        let config = EngineConfig::default();
        let mut a = assignment();
        a.reminder_count = 1;
        a.last_reminder_at = Some(created() + Duration::hours(50));

        // 72 hours after creation, but only 22 after the first reminder.
        assert_eq!(due_tier(&a, &session(), &config, created() + Duration::hours(72)), None);
        assert_eq!(
            due_tier(&a, &session(), &config, created() + Duration::hours(74)),
            Some(ReminderTier(2))
        );
    }

    #[test]
    fn nothing_due_after_response_or_budget() {
        let config = EngineConfig::default();
        let late = created() + Duration::days(30);

        let mut responded = assignment();
        responded.responded_at = Some(created());
        assert_eq!(due_tier(&responded, &session(), &config, late), None);

        let mut spent = assignment();
        spent.reminder_count = 2;
        spent.last_reminder_at = Some(created());
        assert_eq!(due_tier(&spent, &session(), &config, late), None);
    }

    #[test]
    fn oversized_offsets_never_fire() {
        let config = EngineConfig {
            first_reminder_hours: i64::MAX / 2,
            second_reminder_hours: i64::MAX,
            ..EngineConfig::default()
        };
        let late = created() + Duration::days(3650);
        assert_eq!(due_tier(&assignment(), &session(), &config, late), None);

        let mut reminded = assignment();
        reminded.reminder_count = 1;
        reminded.last_reminder_at = Some(created());
        assert_eq!(due_tier(&reminded, &session(), &config, late), None);
    }

    #[test]
    fn larger_budget_keeps_escalating() {
        let config = EngineConfig {
            max_reminder_count: 4,
            ..EngineConfig::default()
        };
        let mut a = assignment();
        a.reminder_count = 3;
        a.last_reminder_at = Some(created());
        assert_eq!(
            due_tier(&a, &session(), &config, created() + Duration::hours(24)),
            Some(ReminderTier(4))
        );
    }
}
