use cf_jobs::{Job, JobError, JobState};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::str::FromStr;

use crate::schema::queue_jobs;

#[derive(Queryable, Selectable, QueryableByName, Debug, Clone)]
#[diesel(table_name = queue_jobs)]
pub struct QueueJobRow {
    pub queue: String,
    pub id: String,
    pub seq: i64,
    pub name: String,
    pub payload: serde_json::Value,
    pub options: serde_json::Value,
    pub state: String,
    pub attempts_made: i32,
    pub stalled_count: i32,
    pub run_at: DateTime<Utc>,
    pub locked_until: Option<DateTime<Utc>>,
    pub failed_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TryFrom<QueueJobRow> for Job {
    type Error = JobError;

    fn try_from(row: QueueJobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: row.id,
            queue: row.queue,
            name: row.name,
            payload: row.payload,
            options: serde_json::from_value(row.options)
                .map_err(|e| JobError::Backend(format!("corrupt job options: {}", e)))?,
            state: JobState::from_str(&row.state)?,
            attempts_made: u32::try_from(row.attempts_made).unwrap_or(0),
            stalled_count: u32::try_from(row.stalled_count).unwrap_or(0),
            run_at: row.run_at,
            locked_until: row.locked_until,
            failed_reason: row.failed_reason,
            created_at: row.created_at,
            finished_at: row.finished_at,
        })
    }
}
