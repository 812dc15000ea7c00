use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use convene_core::types::{
    Assignment, AvailabilitySubmission, ConfirmedSchedule, InterviewSession, Interviewer,
    InterviewerId, SessionId, SessionStatus, TimeRange,
};
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, instrument, warn};

use crate::db::init_db;
use crate::error::{RepoResult, RepositoryError};
use crate::repository::AvailabilityRepository;

const SESSION_COLUMNS: &str = "id, proposed_date, proposed_start, proposed_end, duration_minutes,
     candidates, candidate_slots, status, created_at";

/// SQLite-backed repository.
///
/// Wraps a single connection in a `Mutex`, like the other managers sharing
/// the database file. Multi-row writes run inside one transaction.
pub struct SqliteRepository {
    db: Mutex<Connection>,
}

impl SqliteRepository {
    /// Wrap an open connection, initialising the schema if needed.
    pub fn new(conn: Connection) -> RepoResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    fn conn(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| RepositoryError::LockPoisoned)
    }
}

impl AvailabilityRepository for SqliteRepository {
    #[instrument(skip_all, fields(session_id = %session.id))]
    fn insert_session(
        &self,
        session: &InterviewSession,
        interviewers: &[Interviewer],
    ) -> RepoResult<()> {
        let candidates = serde_json::to_string(&session.candidates)?;
        let slots = serde_json::to_string(&session.candidate_slots)?;
        let created_at = session.created_at.to_rfc3339();

        let mut db = self.conn()?;
        let tx = db.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO interview_sessions
             (id, proposed_date, proposed_start, proposed_end, duration_minutes,
              candidates, candidate_slots, status, created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?9)",
            rusqlite::params![
                session.id.as_str(),
                session.proposed_date.to_string(),
                session.proposed_start.to_string(),
                session.proposed_end.to_string(),
                session.duration_minutes,
                candidates,
                slots,
                session.status.to_string(),
                created_at,
            ],
        )?;
        if inserted == 0 {
            return Err(RepositoryError::Duplicate {
                id: session.id.clone(),
            });
        }

        for (position, interviewer) in interviewers.iter().enumerate() {
            tx.execute(
                "INSERT INTO assignments (session_id, interviewer_id, contact, position)
                 VALUES (?1,?2,?3,?4)",
                rusqlite::params![
                    session.id.as_str(),
                    interviewer.id.as_str(),
                    interviewer.contact,
                    position as i64,
                ],
            )?;
        }
        tx.commit()?;
        debug!(interviewers = interviewers.len(), "session stored");
        Ok(())
    }

    fn get_session(&self, id: &SessionId) -> RepoResult<Option<InterviewSession>> {
        let row = {
            let db = self.conn()?;
            db.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM interview_sessions WHERE id = ?1"),
                [id.as_str()],
                read_session_row,
            )
            .optional()?
        };
        row.map(SessionRow::into_session).transpose()
    }

    fn set_status(&self, id: &SessionId, status: SessionStatus) -> RepoResult<()> {
        let db = self.conn()?;
        write_status(&db, id, status)
    }

    fn get_assignments(&self, id: &SessionId) -> RepoResult<Vec<Assignment>> {
        let rows: Vec<AssignmentRow> = {
            let db = self.conn()?;
            let mut stmt = db.prepare_cached(
                "SELECT interviewer_id, contact, responded_at, reminder_count,
                        last_reminder_at, accepted_at, day_before_sent_on
                 FROM assignments WHERE session_id = ?1 ORDER BY position",
            )?;
            let rows = stmt
                .query_map([id.as_str()], read_assignment_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        rows.into_iter().map(|r| r.into_assignment(id)).collect()
    }

    fn get_submissions(&self, id: &SessionId) -> RepoResult<Vec<AvailabilitySubmission>> {
        // Columns: interviewer_id, ranges JSON, submitted_at
        let rows: Vec<(String, String, String)> = {
            let db = self.conn()?;
            let mut stmt = db.prepare_cached(
                "SELECT s.interviewer_id, s.ranges, s.submitted_at
                 FROM submissions s
                 JOIN assignments a
                   ON a.session_id = s.session_id AND a.interviewer_id = s.interviewer_id
                 WHERE s.session_id = ?1
                 ORDER BY a.position",
            )?;
            let rows = stmt
                .query_map([id.as_str()], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        rows.into_iter()
            .map(|(interviewer_id, ranges, submitted_at)| {
                Ok(AvailabilitySubmission {
                    session_id: id.clone(),
                    interviewer_id: InterviewerId(interviewer_id),
                    ranges: serde_json::from_str(&ranges)?,
                    submitted_at: parse_ts(&submitted_at)?,
                })
            })
            .collect()
    }

    fn record_submission(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        ranges: &[TimeRange],
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let db = self.conn()?;
        write_submission(&db, id, interviewer_id, ranges, at)
    }

    fn mark_responded(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let db = self.conn()?;
        update_assignment(
            &db,
            "UPDATE assignments SET responded_at = ?1
             WHERE session_id = ?2 AND interviewer_id = ?3",
            &at.to_rfc3339(),
            id,
            interviewer_id,
        )
    }

    fn mark_reminder_sent(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let db = self.conn()?;
        update_assignment(
            &db,
            "UPDATE assignments
             SET reminder_count = reminder_count + 1, last_reminder_at = ?1
             WHERE session_id = ?2 AND interviewer_id = ?3",
            &at.to_rfc3339(),
            id,
            interviewer_id,
        )
    }

    fn set_confirmed_schedule(&self, schedule: &ConfirmedSchedule) -> RepoResult<()> {
        let db = self.conn()?;
        write_schedule(&db, schedule)
    }

    fn get_confirmed_schedule(&self, id: &SessionId) -> RepoResult<Option<ConfirmedSchedule>> {
        // Columns: date, start_time, end_time, common_slot JSON, candidate_slots JSON, confirmed_at
        let row: Option<(String, String, String, String, String, String)> = {
            let db = self.conn()?;
            db.query_row(
                "SELECT date, start_time, end_time, common_slot, candidate_slots, confirmed_at
                 FROM confirmed_schedules WHERE session_id = ?1",
                [id.as_str()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .optional()?
        };

        row.map(|(date, start, end, common_slot, slots, confirmed_at)| {
            Ok(ConfirmedSchedule {
                session_id: id.clone(),
                date: parse_date(&date)?,
                start: start.parse()?,
                end: end.parse()?,
                common_slot: serde_json::from_str(&common_slot)?,
                candidate_slots: serde_json::from_str(&slots)?,
                confirmed_at: parse_ts(&confirmed_at)?,
            })
        })
        .transpose()
    }

    fn list_sessions_by_status(&self, status: SessionStatus) -> RepoResult<Vec<InterviewSession>> {
        let rows: Vec<SessionRow> = {
            let db = self.conn()?;
            let mut stmt = db.prepare_cached(&format!(
                "SELECT {SESSION_COLUMNS} FROM interview_sessions
                 WHERE status = ?1 ORDER BY created_at, id"
            ))?;
            let rows = stmt
                .query_map([status.to_string()], read_session_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        // One undecodable row must not hide every other session from the sweeps.
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                match row.into_session() {
                    Ok(session) => Some(session),
                    Err(e) => {
                        warn!(session_id = %id, error = %e, "skipping undecodable session row");
                        None
                    }
                }
            })
            .collect())
    }

    fn mark_accepted(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let db = self.conn()?;
        update_assignment(
            &db,
            "UPDATE assignments SET accepted_at = ?1
             WHERE session_id = ?2 AND interviewer_id = ?3",
            &at.to_rfc3339(),
            id,
            interviewer_id,
        )
    }

    fn mark_day_before_sent(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        on: NaiveDate,
    ) -> RepoResult<()> {
        let db = self.conn()?;
        update_assignment(
            &db,
            "UPDATE assignments SET day_before_sent_on = ?1
             WHERE session_id = ?2 AND interviewer_id = ?3",
            &on.to_string(),
            id,
            interviewer_id,
        )
    }

    fn record_response(
        &self,
        id: &SessionId,
        interviewer_id: &InterviewerId,
        ranges: &[TimeRange],
        at: DateTime<Utc>,
    ) -> RepoResult<()> {
        let mut db = self.conn()?;
        let tx = db.transaction()?;
        write_submission(&tx, id, interviewer_id, ranges, at)?;
        update_assignment(
            &tx,
            "UPDATE assignments SET responded_at = ?1
             WHERE session_id = ?2 AND interviewer_id = ?3",
            &at.to_rfc3339(),
            id,
            interviewer_id,
        )?;
        tx.commit()?;
        Ok(())
    }

    fn confirm(&self, schedule: &ConfirmedSchedule) -> RepoResult<()> {
        let mut db = self.conn()?;
        let tx = db.transaction()?;
        write_schedule(&tx, schedule)?;
        write_status(&tx, &schedule.session_id, SessionStatus::Confirmed)?;
        tx.commit()?;
        Ok(())
    }
}

// --- private helpers ---------------------------------------------------

struct SessionRow {
    id: String,
    proposed_date: String,
    proposed_start: String,
    proposed_end: String,
    duration_minutes: i64,
    candidates: String,
    candidate_slots: String,
    status: String,
    created_at: String,
}

fn read_session_row(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        proposed_date: row.get(1)?,
        proposed_start: row.get(2)?,
        proposed_end: row.get(3)?,
        duration_minutes: row.get(4)?,
        candidates: row.get(5)?,
        candidate_slots: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl SessionRow {
    fn into_session(self) -> RepoResult<InterviewSession> {
        Ok(InterviewSession {
            proposed_date: parse_date(&self.proposed_date)?,
            proposed_start: self.proposed_start.parse()?,
            proposed_end: self.proposed_end.parse()?,
            duration_minutes: u32::try_from(self.duration_minutes).map_err(|_| {
                RepositoryError::Corrupt(format!("duration_minutes {}", self.duration_minutes))
            })?,
            candidates: serde_json::from_str(&self.candidates)?,
            candidate_slots: serde_json::from_str(&self.candidate_slots)?,
            status: self.status.parse()?,
            created_at: parse_ts(&self.created_at)?,
            id: SessionId(self.id),
        })
    }
}

struct AssignmentRow {
    interviewer_id: String,
    contact: String,
    responded_at: Option<String>,
    reminder_count: i64,
    last_reminder_at: Option<String>,
    accepted_at: Option<String>,
    day_before_sent_on: Option<String>,
}

fn read_assignment_row(row: &Row<'_>) -> rusqlite::Result<AssignmentRow> {
    Ok(AssignmentRow {
        interviewer_id: row.get(0)?,
        contact: row.get(1)?,
        responded_at: row.get(2)?,
        reminder_count: row.get(3)?,
        last_reminder_at: row.get(4)?,
        accepted_at: row.get(5)?,
        day_before_sent_on: row.get(6)?,
    })
}

impl AssignmentRow {
    fn into_assignment(self, session_id: &SessionId) -> RepoResult<Assignment> {
        Ok(Assignment {
            session_id: session_id.clone(),
            interviewer: Interviewer {
                id: InterviewerId(self.interviewer_id),
                contact: self.contact,
            },
            responded_at: parse_opt_ts(self.responded_at)?,
            reminder_count: u32::try_from(self.reminder_count).map_err(|_| {
                RepositoryError::Corrupt(format!("reminder_count {}", self.reminder_count))
            })?,
            last_reminder_at: parse_opt_ts(self.last_reminder_at)?,
            accepted_at: parse_opt_ts(self.accepted_at)?,
            day_before_sent_on: self
                .day_before_sent_on
                .as_deref()
                .map(parse_date)
                .transpose()?,
        })
    }
}

fn write_status(conn: &Connection, id: &SessionId, status: SessionStatus) -> RepoResult<()> {
    let n = conn.execute(
        "UPDATE interview_sessions SET status = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![status.to_string(), Utc::now().to_rfc3339(), id.as_str()],
    )?;
    if n == 0 {
        return Err(RepositoryError::SessionNotFound { id: id.clone() });
    }
    Ok(())
}

fn write_submission(
    conn: &Connection,
    id: &SessionId,
    interviewer_id: &InterviewerId,
    ranges: &[TimeRange],
    at: DateTime<Utc>,
) -> RepoResult<()> {
    let assigned: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM assignments WHERE session_id = ?1 AND interviewer_id = ?2",
            [id.as_str(), interviewer_id.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    if assigned.is_none() {
        return Err(RepositoryError::AssignmentNotFound {
            session_id: id.clone(),
            interviewer_id: interviewer_id.clone(),
        });
    }

    conn.execute(
        "INSERT INTO submissions (session_id, interviewer_id, ranges, submitted_at)
         VALUES (?1,?2,?3,?4)
         ON CONFLICT (session_id, interviewer_id)
         DO UPDATE SET ranges = excluded.ranges, submitted_at = excluded.submitted_at",
        rusqlite::params![
            id.as_str(),
            interviewer_id.as_str(),
            serde_json::to_string(ranges)?,
            at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn write_schedule(conn: &Connection, schedule: &ConfirmedSchedule) -> RepoResult<()> {
    let n = conn.execute(
        "INSERT OR IGNORE INTO confirmed_schedules
         (session_id, date, start_time, end_time, common_slot, candidate_slots, confirmed_at)
         VALUES (?1,?2,?3,?4,?5,?6,?7)",
        rusqlite::params![
            schedule.session_id.as_str(),
            schedule.date.to_string(),
            schedule.start.to_string(),
            schedule.end.to_string(),
            serde_json::to_string(&schedule.common_slot)?,
            serde_json::to_string(&schedule.candidate_slots)?,
            schedule.confirmed_at.to_rfc3339(),
        ],
    )?;
    if n == 0 {
        return Err(RepositoryError::Duplicate {
            id: schedule.session_id.clone(),
        });
    }
    Ok(())
}

/// Run a single-value assignment UPDATE (`?1` value, `?2` session, `?3` interviewer).
fn update_assignment(
    conn: &Connection,
    sql: &str,
    value: &str,
    id: &SessionId,
    interviewer_id: &InterviewerId,
) -> RepoResult<()> {
    let n = conn.execute(
        sql,
        rusqlite::params![value, id.as_str(), interviewer_id.as_str()],
    )?;
    if n == 0 {
        return Err(RepositoryError::AssignmentNotFound {
            session_id: id.clone(),
            interviewer_id: interviewer_id.clone(),
        });
    }
    Ok(())
}

fn parse_ts(s: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Corrupt(format!("timestamp {s:?}: {e}")))
}

fn parse_opt_ts(s: Option<String>) -> RepoResult<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_ts).transpose()
}

fn parse_date(s: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| RepositoryError::Corrupt(format!("date {s:?}: {e}")))
}
