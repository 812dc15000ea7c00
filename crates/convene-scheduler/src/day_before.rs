use chrono::{DateTime, Days, NaiveDate, Utc};
use convene_core::types::{InterviewSession, SessionStatus};
use convene_sessions::SessionCoordinator;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::types::{JobKind, JobReport};

/// Remind interviewers of every confirmed interview taking place tomorrow
/// (UTC date of `now` plus one).
///
/// Each assignment remembers the date it was notified for, so a second run
/// on the same day only retries the sends that failed.
#[instrument(skip(coordinator))]
pub async fn run_day_before_tick(
    coordinator: &SessionCoordinator,
    now: DateTime<Utc>,
) -> Result<JobReport> {
    let mut report = JobReport::new(JobKind::DayBefore);
    let Some(tomorrow) = now.date_naive().checked_add_days(Days::new(1)) else {
        return Ok(report);
    };

    for session in coordinator
        .repository()
        .list_sessions_by_status(SessionStatus::Confirmed)?
    {
        report.scanned += 1;
        if let Err(e) = notify_session(coordinator, &session, tomorrow, &mut report).await {
            report.failed += 1;
            warn!(session_id = %session.id, error = %e, "day-before notice failed for session");
        }
    }

    info!(%report, %tomorrow, "day-before tick finished");
    Ok(report)
}

async fn notify_session(
    coordinator: &SessionCoordinator,
    session: &InterviewSession,
    tomorrow: NaiveDate,
    report: &mut JobReport,
) -> Result<()> {
    let repo = coordinator.repository();
    let Some(schedule) = repo.get_confirmed_schedule(&session.id)? else {
        warn!(session_id = %session.id, "confirmed session has no schedule row");
        return Ok(());
    };
    if schedule.date != tomorrow {
        return Ok(());
    }

    for assignment in repo.get_assignments(&session.id)? {
        let interviewer = &assignment.interviewer;
        if assignment.day_before_sent_on == Some(schedule.date) {
            continue;
        }
        match coordinator
            .notifier()
            .send_day_before(interviewer, session, &schedule)
            .await
        {
            Ok(()) => {
                repo.mark_day_before_sent(&session.id, &interviewer.id, schedule.date)?;
                report.succeeded += 1;
                debug!(session_id = %session.id, interviewer_id = %interviewer.id, "day-before notice sent");
            }
            Err(e) => {
                report.failed += 1;
                warn!(
                    session_id = %session.id,
                    interviewer_id = %interviewer.id,
                    error = %e,
                    "day-before notice not delivered"
                );
            }
        }
    }
    Ok(())
}
