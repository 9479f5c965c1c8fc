//! Checkpoint repository for the `step_checkpoints` table.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::{Database, DatabaseError};

/// Stores the payload for `(job_id, step)`, replacing any previous one.
pub fn upsert(db: &Database, job_id: &str, step: &str, payload: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO step_checkpoints (job_id, step, payload, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(job_id, step) DO UPDATE SET
                payload = excluded.payload,
                created_at = excluded.created_at",
            params![job_id, step, payload, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    })
}

pub fn find(db: &Database, job_id: &str, step: &str) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let payload = conn
            .query_row(
                "SELECT payload FROM step_checkpoints WHERE job_id = ?1 AND step = ?2",
                params![job_id, step],
                |r| r.get(0),
            )
            .optional()?;
        Ok(payload)
    })
}

/// Removes all checkpoints of a job. Returns the number of rows deleted.
pub fn delete_for_job(db: &Database, job_id: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        Ok(conn.execute(
            "DELETE FROM step_checkpoints WHERE job_id = ?1",
            params![job_id],
        )?)
    })
}
