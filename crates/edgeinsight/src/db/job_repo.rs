//! Job repository: upsert and lookup for the `audit_jobs` table.
//!
//! The full record lives in the `record` column as JSON; the remaining
//! columns are denormalized copies for querying.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DatabaseError};

/// A raw job row from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRow {
    pub id: String,
    pub repo_reference: String,
    pub status: String,
    pub stage: String,
    pub files_found: i64,
    pub record: String,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            repo_reference: row.get("repo_reference")?,
            status: row.get("status")?,
            stage: row.get("stage")?,
            files_found: row.get("files_found")?,
            record: row.get("record")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts the row, or replaces every column except `created_at` if the id
/// already exists.
pub fn upsert(db: &Database, job: &JobRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO audit_jobs (id, repo_reference, status, stage, files_found, record,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                repo_reference = excluded.repo_reference,
                status = excluded.status,
                stage = excluded.stage,
                files_found = excluded.files_found,
                record = excluded.record,
                updated_at = excluded.updated_at",
            params![
                job.id,
                job.repo_reference,
                job.status,
                job.stage,
                job.files_found,
                job.record,
                job.created_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    })
}

pub fn find_by_id(db: &Database, id: &str) -> Result<Option<JobRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT id, repo_reference, status, stage, files_found, record, created_at,
                 updated_at FROM audit_jobs WHERE id = ?1",
                params![id],
                JobRow::from_row,
            )
            .optional()?;
        Ok(row)
    })
}
