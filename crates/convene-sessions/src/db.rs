use rusqlite::Connection;

use crate::error::RepoResult;

/// Initialise the interview scheduling schema in `conn`.
///
/// Safe to call on every startup: `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> RepoResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS interview_sessions (
            id               TEXT    NOT NULL PRIMARY KEY,
            proposed_date    TEXT    NOT NULL,   -- YYYY-MM-DD
            proposed_start   TEXT    NOT NULL,   -- HH:mm
            proposed_end     TEXT    NOT NULL,   -- HH:mm
            duration_minutes INTEGER NOT NULL,
            candidates       TEXT    NOT NULL,   -- JSON [Candidate]
            candidate_slots  TEXT    NOT NULL,   -- JSON [CandidateSlot]
            status           TEXT    NOT NULL DEFAULT 'PENDING',
            created_at       TEXT    NOT NULL,
            updated_at       TEXT    NOT NULL
        ) STRICT;

        -- Sweeps select by status on every tick.
        CREATE INDEX IF NOT EXISTS idx_interview_sessions_status
            ON interview_sessions (status, created_at);

        CREATE TABLE IF NOT EXISTS assignments (
            session_id         TEXT    NOT NULL REFERENCES interview_sessions (id) ON DELETE CASCADE,
            interviewer_id     TEXT    NOT NULL,
            contact            TEXT    NOT NULL,
            position           INTEGER NOT NULL,
            responded_at       TEXT,
            reminder_count     INTEGER NOT NULL DEFAULT 0,
            last_reminder_at   TEXT,
            accepted_at        TEXT,
            day_before_sent_on TEXT,
            PRIMARY KEY (session_id, interviewer_id)
        ) STRICT;

        CREATE TABLE IF NOT EXISTS submissions (
            session_id     TEXT NOT NULL REFERENCES interview_sessions (id) ON DELETE CASCADE,
            interviewer_id TEXT NOT NULL,
            ranges         TEXT NOT NULL,   -- JSON [TimeRange]
            submitted_at   TEXT NOT NULL,
            PRIMARY KEY (session_id, interviewer_id)
        ) STRICT;

        CREATE TABLE IF NOT EXISTS confirmed_schedules (
            session_id      TEXT NOT NULL PRIMARY KEY REFERENCES interview_sessions (id) ON DELETE CASCADE,
            date            TEXT NOT NULL,
            start_time      TEXT NOT NULL,
            end_time        TEXT NOT NULL,
            common_slot     TEXT NOT NULL,   -- JSON TimeRange
            candidate_slots TEXT NOT NULL,   -- JSON [CandidateSlot]
            confirmed_at    TEXT NOT NULL
        ) STRICT;
        ",
    )?;
    Ok(())
}
