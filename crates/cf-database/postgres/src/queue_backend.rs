/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Durable queue storage in the `queue_jobs` table.
//!
//! Several worker processes may share one queue: claims take the row lock
//! with `FOR UPDATE SKIP LOCKED`, and every state transition is a single
//! conditional `UPDATE` guarded on the current state.

use async_trait::async_trait;
use cf_jobs::backend::STALLED_REASON;
use cf_jobs::{
  EnqueueOutcome, Job, JobCounts, JobError, JobResult, JobState, QueueBackend, Retention,
  StalledRecovery,
};
use chrono::{DateTime, Utc};
use diesel::dsl::{count_star, min};
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Int4, Jsonb, Nullable, Text, Timestamptz};
use diesel_async::RunQueryDsl;

use crate::models::QueueJobRow;
use crate::repository::{DatabaseContext, RepositoryError};
use crate::schema::queue_jobs;

const RUNNABLE: [&str; 2] = ["waiting", "delayed"];

const JOB_COLUMNS: &str = "queue, id, seq, name, payload, options, state, attempts_made, \
   stalled_count, run_at, locked_until, failed_reason, created_at, finished_at";

fn backend_err(err: diesel::result::Error) -> JobError {
  RepositoryError::from(err).into()
}

fn rows_to_jobs(rows: Vec<QueueJobRow>) -> JobResult<Vec<Job>> {
  rows.into_iter().map(Job::try_from).collect()
}

/// Stores the jobs of one named queue in Postgres
#[derive(Debug, Clone)]
pub struct PgQueueBackend {
  ctx: DatabaseContext,
  queue: String,
}

impl PgQueueBackend {
  pub fn new(ctx: DatabaseContext, queue: impl Into<String>) -> Self {
    Self { ctx, queue: queue.into() }
  }

  pub fn queue(&self) -> &str {
    &self.queue
  }

  async fn conn(&self) -> JobResult<crate::repository::DbConnection<'_>> {
    Ok(self.ctx.get_connection().await?)
  }

  /// Tell a missing job apart from one another worker already moved on
  async fn transition_failed(&self, id: &str) -> JobError {
    match self.get(id).await {
      Ok(Some(_)) => JobError::LockLost(id.to_string()),
      Ok(None) => JobError::NotFound(id.to_string()),
      Err(e) => e,
    }
  }

  async fn apply_retention(&self, id: &str, state: JobState, retention: Retention) -> JobResult<()> {
    let mut conn = self.conn().await?;
    match retention {
      Retention::Keep => {}
      Retention::Remove => {
        diesel::delete(
          queue_jobs::table.filter(queue_jobs::queue.eq(&self.queue)).filter(queue_jobs::id.eq(id)),
        )
        .execute(&mut conn)
        .await
        .map_err(backend_err)?;
      }
      Retention::KeepLast(keep) => {
        sql_query(
          "DELETE FROM queue_jobs
           WHERE queue = $1 AND state = $2 AND id NOT IN (
             SELECT id FROM queue_jobs
             WHERE queue = $1 AND state = $2
             ORDER BY finished_at DESC NULLS LAST, seq DESC
             LIMIT $3)",
        )
        .bind::<Text, _>(&self.queue)
        .bind::<Text, _>(state.as_str())
        .bind::<BigInt, _>(i64::try_from(keep).unwrap_or(i64::MAX))
        .execute(&mut conn)
        .await
        .map_err(backend_err)?;
      }
    }
    Ok(())
  }
}

#[async_trait]
impl QueueBackend for PgQueueBackend {
  async fn push(&self, job: Job) -> JobResult<EnqueueOutcome> {
    let options = serde_json::to_value(&job.options)
      .map_err(|e| JobError::Backend(format!("Failed to encode job options: {}", e)))?;
    let mut conn = self.conn().await?;

    // a terminal job with the same id is replaced; a live one wins
    let written = sql_query(
      "INSERT INTO queue_jobs
         (queue, id, name, payload, options, state, attempts_made, stalled_count,
          run_at, locked_until, failed_reason, created_at, finished_at)
       VALUES ($1, $2, $3, $4, $5, $6, 0, 0, $7, NULL, NULL, $8, NULL)
       ON CONFLICT (queue, id) DO UPDATE SET
         seq = nextval(pg_get_serial_sequence('queue_jobs', 'seq')),
         name = EXCLUDED.name,
         payload = EXCLUDED.payload,
         options = EXCLUDED.options,
         state = EXCLUDED.state,
         attempts_made = 0,
         stalled_count = 0,
         run_at = EXCLUDED.run_at,
         locked_until = NULL,
         failed_reason = NULL,
         created_at = EXCLUDED.created_at,
         finished_at = NULL
       WHERE queue_jobs.state IN ('completed', 'failed')",
    )
    .bind::<Text, _>(&self.queue)
    .bind::<Text, _>(&job.id)
    .bind::<Text, _>(&job.name)
    .bind::<Jsonb, _>(&job.payload)
    .bind::<Jsonb, _>(&options)
    .bind::<Text, _>(job.state.as_str())
    .bind::<Timestamptz, _>(job.run_at)
    .bind::<Timestamptz, _>(job.created_at)
    .execute(&mut conn)
    .await
    .map_err(backend_err)?;

    Ok(if written == 0 { EnqueueOutcome::Duplicate(job.id) } else { EnqueueOutcome::Added(job.id) })
  }

  async fn claim_next(
    &self,
    now: DateTime<Utc>,
    lock_until: DateTime<Utc>,
  ) -> JobResult<Option<Job>> {
    let mut conn = self.conn().await?;
    let row: Option<QueueJobRow> = sql_query(format!(
      "UPDATE queue_jobs
       SET state = 'active', locked_until = $3, attempts_made = attempts_made + 1
       WHERE queue = $1 AND id = (
         SELECT id FROM queue_jobs
         WHERE queue = $1 AND state IN ('waiting', 'delayed') AND run_at <= $2
         ORDER BY run_at, seq
         LIMIT 1
         FOR UPDATE SKIP LOCKED)
       RETURNING {}",
      JOB_COLUMNS
    ))
    .bind::<Text, _>(&self.queue)
    .bind::<Timestamptz, _>(now)
    .bind::<Timestamptz, _>(lock_until)
    .get_result(&mut conn)
    .await
    .optional()
    .map_err(backend_err)?;

    row.map(Job::try_from).transpose()
  }

  async fn extend_lock(&self, id: &str, lock_until: DateTime<Utc>) -> JobResult<bool> {
    let mut conn = self.conn().await?;
    let updated = diesel::update(
      queue_jobs::table
        .filter(queue_jobs::queue.eq(&self.queue))
        .filter(queue_jobs::id.eq(id))
        .filter(queue_jobs::state.eq(JobState::Active.as_str())),
    )
    .set(queue_jobs::locked_until.eq(Some(lock_until)))
    .execute(&mut conn)
    .await
    .map_err(backend_err)?;
    Ok(updated == 1)
  }

  async fn complete(&self, id: &str, now: DateTime<Utc>, retention: Retention) -> JobResult<()> {
    let updated = {
      let mut conn = self.conn().await?;
      diesel::update(
        queue_jobs::table
          .filter(queue_jobs::queue.eq(&self.queue))
          .filter(queue_jobs::id.eq(id))
          .filter(queue_jobs::state.eq(JobState::Active.as_str())),
      )
      .set((
        queue_jobs::state.eq(JobState::Completed.as_str()),
        queue_jobs::locked_until.eq(None::<DateTime<Utc>>),
        queue_jobs::finished_at.eq(Some(now)),
      ))
      .execute(&mut conn)
      .await
      .map_err(backend_err)?
    };
    if updated == 0 {
      return Err(self.transition_failed(id).await);
    }
    self.apply_retention(id, JobState::Completed, retention).await
  }

  async fn retry_later(&self, id: &str, run_at: DateTime<Utc>, reason: &str) -> JobResult<()> {
    let updated = {
      let mut conn = self.conn().await?;
      diesel::update(
        queue_jobs::table
          .filter(queue_jobs::queue.eq(&self.queue))
          .filter(queue_jobs::id.eq(id))
          .filter(queue_jobs::state.eq(JobState::Active.as_str())),
      )
      .set((
        queue_jobs::state.eq(JobState::Delayed.as_str()),
        queue_jobs::locked_until.eq(None::<DateTime<Utc>>),
        queue_jobs::run_at.eq(run_at),
        queue_jobs::failed_reason.eq(Some(reason)),
      ))
      .execute(&mut conn)
      .await
      .map_err(backend_err)?
    };
    if updated == 0 {
      return Err(self.transition_failed(id).await);
    }
    Ok(())
  }

  async fn fail(
    &self,
    id: &str,
    now: DateTime<Utc>,
    reason: &str,
    retention: Retention,
  ) -> JobResult<()> {
    let updated = {
      let mut conn = self.conn().await?;
      diesel::update(
        queue_jobs::table
          .filter(queue_jobs::queue.eq(&self.queue))
          .filter(queue_jobs::id.eq(id))
          .filter(queue_jobs::state.eq(JobState::Active.as_str())),
      )
      .set((
        queue_jobs::state.eq(JobState::Failed.as_str()),
        queue_jobs::locked_until.eq(None::<DateTime<Utc>>),
        queue_jobs::failed_reason.eq(Some(reason)),
        queue_jobs::finished_at.eq(Some(now)),
      ))
      .execute(&mut conn)
      .await
      .map_err(backend_err)?
    };
    if updated == 0 {
      return Err(self.transition_failed(id).await);
    }
    self.apply_retention(id, JobState::Failed, retention).await
  }

  async fn recover_stalled(
    &self,
    now: DateTime<Utc>,
    max_stalled: u32,
  ) -> JobResult<StalledRecovery> {
    let mut conn = self.conn().await?;
    let max_stalled = i32::try_from(max_stalled).unwrap_or(i32::MAX);

    let failed: Vec<QueueJobRow> = sql_query(format!(
      "UPDATE queue_jobs
       SET state = 'failed', stalled_count = stalled_count + 1, locked_until = NULL,
           failed_reason = $3, finished_at = $2
       WHERE queue = $1 AND state = 'active' AND locked_until < $2 AND stalled_count + 1 > $4
       RETURNING {}",
      JOB_COLUMNS
    ))
    .bind::<Text, _>(&self.queue)
    .bind::<Timestamptz, _>(now)
    .bind::<Nullable<Text>, _>(Some(STALLED_REASON))
    .bind::<Int4, _>(max_stalled)
    .load(&mut conn)
    .await
    .map_err(backend_err)?;

    // a lost lock is not a failed attempt
    let requeued: Vec<QueueJobRow> = sql_query(format!(
      "UPDATE queue_jobs
       SET state = 'waiting', stalled_count = stalled_count + 1, locked_until = NULL,
           attempts_made = GREATEST(attempts_made - 1, 0), run_at = $2
       WHERE queue = $1 AND state = 'active' AND locked_until < $2
       RETURNING {}",
      JOB_COLUMNS
    ))
    .bind::<Text, _>(&self.queue)
    .bind::<Timestamptz, _>(now)
    .load(&mut conn)
    .await
    .map_err(backend_err)?;

    Ok(StalledRecovery { requeued: rows_to_jobs(requeued)?, failed: rows_to_jobs(failed)? })
  }

  async fn next_run_at(&self) -> JobResult<Option<DateTime<Utc>>> {
    let mut conn = self.conn().await?;
    queue_jobs::table
      .filter(queue_jobs::queue.eq(&self.queue))
      .filter(queue_jobs::state.eq_any(RUNNABLE))
      .select(min(queue_jobs::run_at))
      .first::<Option<DateTime<Utc>>>(&mut conn)
      .await
      .map_err(backend_err)
  }

  async fn get(&self, id: &str) -> JobResult<Option<Job>> {
    let mut conn = self.conn().await?;
    let row = queue_jobs::table
      .filter(queue_jobs::queue.eq(&self.queue))
      .filter(queue_jobs::id.eq(id))
      .select(QueueJobRow::as_select())
      .first(&mut conn)
      .await
      .optional()
      .map_err(backend_err)?;
    row.map(Job::try_from).transpose()
  }

  async fn counts(&self) -> JobResult<JobCounts> {
    let mut conn = self.conn().await?;
    let rows: Vec<(String, i64)> = queue_jobs::table
      .filter(queue_jobs::queue.eq(&self.queue))
      .group_by(queue_jobs::state)
      .select((queue_jobs::state, count_star()))
      .load(&mut conn)
      .await
      .map_err(backend_err)?;

    let mut counts = JobCounts::default();
    for (state, n) in rows {
      let n = u64::try_from(n).unwrap_or(0);
      match state.parse::<JobState>()? {
        JobState::Waiting => counts.waiting = n,
        JobState::Delayed => counts.delayed = n,
        JobState::Active => counts.active = n,
        JobState::Completed => counts.completed = n,
        JobState::Failed => counts.failed = n,
      }
    }
    Ok(counts)
  }
}
