use chrono::{DateTime, Utc};
use convene_core::types::SessionStatus;
use convene_sessions::{SessionCoordinator, SubmitOutcome};
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::types::{JobKind, JobReport};

/// Finish sessions whose last response landed without the status transition.
///
/// Scans `PARTIAL` sessions, plus `PENDING` ones when `reconcile_pending` is
/// enabled. Sessions still missing responses are left alone, so running the
/// sweep twice changes nothing the second time.
#[instrument(skip(coordinator))]
pub async fn run_reconciliation_sweep(
    coordinator: &SessionCoordinator,
    now: DateTime<Utc>,
) -> Result<JobReport> {
    let mut statuses = vec![SessionStatus::Partial];
    if coordinator.config().reconcile_pending {
        statuses.push(SessionStatus::Pending);
    }

    let mut report = JobReport::new(JobKind::Reconciliation);
    for status in statuses {
        for session in coordinator.repository().list_sessions_by_status(status)? {
            report.scanned += 1;
            match coordinator.reconcile(&session.id, now).await {
                Ok(Some(outcome)) => {
                    report.succeeded += 1;
                    let resolved = match outcome {
                        SubmitOutcome::Confirmed { .. } => "confirmed",
                        SubmitOutcome::NoCommon => "no_common",
                        SubmitOutcome::Partial { .. } => "partial",
                    };
                    info!(session_id = %session.id, resolved, "reconciled stuck session");
                }
                Ok(None) => {}
                Err(e) => {
                    report.failed += 1;
                    warn!(session_id = %session.id, error = %e, "reconciliation failed for session");
                }
            }
        }
    }

    info!(%report, "reconciliation sweep finished");
    Ok(report)
}
