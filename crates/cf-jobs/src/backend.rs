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

//! Storage seam for queues.
//!
//! A backend instance stores the jobs of exactly one queue. The in-memory
//! backend lives here; the durable Postgres one lives in the database crate.

use crate::error::{JobError, JobResult};
use crate::job::{Job, JobState, Retention};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// Result of pushing a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
  Added(String),
  /// A non-terminal job with the same id already exists; nothing was written
  Duplicate(String),
}

impl EnqueueOutcome {
  pub fn job_id(&self) -> &str {
    match self {
      EnqueueOutcome::Added(id) | EnqueueOutcome::Duplicate(id) => id,
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
  pub waiting: u64,
  pub delayed: u64,
  pub active: u64,
  pub completed: u64,
  pub failed: u64,
}

/// Jobs touched by a stalled-lock sweep
#[derive(Debug, Clone, Default)]
pub struct StalledRecovery {
  /// Moved back to waiting for re-delivery
  pub requeued: Vec<Job>,
  /// Stalled too often and marked failed
  pub failed: Vec<Job>,
}

#[async_trait]
pub trait QueueBackend: Send + Sync {
  /// Store a job unless a non-terminal job with the same id exists.
  /// A terminal job with the same id is replaced.
  async fn push(&self, job: Job) -> JobResult<EnqueueOutcome>;

  /// Lock the next runnable job (`run_at <= now`, oldest first), mark it
  /// active and count the attempt.
  async fn claim_next(&self, now: DateTime<Utc>, lock_until: DateTime<Utc>)
  -> JobResult<Option<Job>>;

  /// Push the lock of an active job forward. `false` when the job is no longer ours.
  async fn extend_lock(&self, id: &str, lock_until: DateTime<Utc>) -> JobResult<bool>;

  async fn complete(&self, id: &str, now: DateTime<Utc>, retention: Retention) -> JobResult<()>;

  /// Put an active job back as delayed until `run_at`
  async fn retry_later(&self, id: &str, run_at: DateTime<Utc>, reason: &str) -> JobResult<()>;

  async fn fail(
    &self,
    id: &str,
    now: DateTime<Utc>,
    reason: &str,
    retention: Retention,
  ) -> JobResult<()>;

  /// Re-deliver active jobs whose lock expired; fail those stalled more than `max_stalled` times
  async fn recover_stalled(&self, now: DateTime<Utc>, max_stalled: u32)
  -> JobResult<StalledRecovery>;

  /// Earliest `run_at` among waiting and delayed jobs
  async fn next_run_at(&self) -> JobResult<Option<DateTime<Utc>>>;

  async fn get(&self, id: &str) -> JobResult<Option<Job>>;

  async fn counts(&self) -> JobResult<JobCounts>;
}

pub const STALLED_REASON: &str = "job stalled more than allowable limit";

#[derive(Debug)]
struct Entry {
  seq: u64,
  job: Job,
}

#[derive(Debug, Default)]
struct MemoryState {
  next_seq: u64,
  jobs: HashMap<String, Entry>,
}

impl MemoryState {
  fn active_mut(&mut self, id: &str) -> JobResult<&mut Job> {
    match self.jobs.get_mut(id) {
      Some(entry) if entry.job.state == JobState::Active => Ok(&mut entry.job),
      Some(_) => Err(JobError::LockLost(id.to_string())),
      None => Err(JobError::NotFound(id.to_string())),
    }
  }

  fn apply_retention(&mut self, id: &str, state: JobState, retention: Retention) {
    match retention {
      Retention::Keep => {}
      Retention::Remove => {
        self.jobs.remove(id);
      }
      Retention::KeepLast(keep) => {
        let mut finished: Vec<(DateTime<Utc>, u64, String)> = self
          .jobs
          .iter()
          .filter(|(_, e)| e.job.state == state)
          .map(|(id, e)| (e.job.finished_at.unwrap_or(e.job.created_at), e.seq, id.clone()))
          .collect();
        if finished.len() <= keep {
          return;
        }
        finished.sort();
        let excess = finished.len() - keep;
        for (_, _, id) in finished.into_iter().take(excess) {
          self.jobs.remove(&id);
        }
      }
    }
  }
}

/// Process-local queue storage for development and tests
#[derive(Debug, Default)]
pub struct MemoryQueueBackend {
  state: Mutex<MemoryState>,
}

impl MemoryQueueBackend {
  pub fn new() -> Self {
    Self::default()
  }

  fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
    let mut guard = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut guard)
  }
}

#[async_trait]
impl QueueBackend for MemoryQueueBackend {
  async fn push(&self, job: Job) -> JobResult<EnqueueOutcome> {
    self.with_state(|state| {
      if let Some(existing) = state.jobs.get(&job.id) {
        if !existing.job.state.is_terminal() {
          return Ok(EnqueueOutcome::Duplicate(job.id));
        }
      }
      let seq = state.next_seq;
      state.next_seq += 1;
      let id = job.id.clone();
      state.jobs.insert(id.clone(), Entry { seq, job });
      Ok(EnqueueOutcome::Added(id))
    })
  }

  async fn claim_next(
    &self,
    now: DateTime<Utc>,
    lock_until: DateTime<Utc>,
  ) -> JobResult<Option<Job>> {
    self.with_state(|state| {
      let next = state
        .jobs
        .iter()
        .filter(|(_, e)| matches!(e.job.state, JobState::Waiting | JobState::Delayed))
        .filter(|(_, e)| e.job.run_at <= now)
        .min_by_key(|(_, e)| (e.job.run_at, e.seq))
        .map(|(id, _)| id.clone());

      let Some(id) = next else { return Ok(None) };
      let Some(entry) = state.jobs.get_mut(&id) else { return Ok(None) };
      entry.job.state = JobState::Active;
      entry.job.locked_until = Some(lock_until);
      entry.job.attempts_made += 1;
      Ok(Some(entry.job.clone()))
    })
  }

  async fn extend_lock(&self, id: &str, lock_until: DateTime<Utc>) -> JobResult<bool> {
    self.with_state(|state| match state.active_mut(id) {
      Ok(job) => {
        job.locked_until = Some(lock_until);
        Ok(true)
      }
      Err(_) => Ok(false),
    })
  }

  async fn complete(&self, id: &str, now: DateTime<Utc>, retention: Retention) -> JobResult<()> {
    self.with_state(|state| {
      let job = state.active_mut(id)?;
      job.state = JobState::Completed;
      job.locked_until = None;
      job.finished_at = Some(now);
      state.apply_retention(id, JobState::Completed, retention);
      Ok(())
    })
  }

  async fn retry_later(&self, id: &str, run_at: DateTime<Utc>, reason: &str) -> JobResult<()> {
    self.with_state(|state| {
      let job = state.active_mut(id)?;
      job.state = JobState::Delayed;
      job.locked_until = None;
      job.run_at = run_at;
      job.failed_reason = Some(reason.to_string());
      Ok(())
    })
  }

  async fn fail(
    &self,
    id: &str,
    now: DateTime<Utc>,
    reason: &str,
    retention: Retention,
  ) -> JobResult<()> {
    self.with_state(|state| {
      let job = state.active_mut(id)?;
      job.state = JobState::Failed;
      job.locked_until = None;
      job.failed_reason = Some(reason.to_string());
      job.finished_at = Some(now);
      state.apply_retention(id, JobState::Failed, retention);
      Ok(())
    })
  }

  async fn recover_stalled(
    &self,
    now: DateTime<Utc>,
    max_stalled: u32,
  ) -> JobResult<StalledRecovery> {
    self.with_state(|state| {
      let mut recovery = StalledRecovery::default();
      let stalled: Vec<String> = state
        .jobs
        .iter()
        .filter(|(_, e)| e.job.state == JobState::Active)
        .filter(|(_, e)| e.job.locked_until.is_some_and(|until| until < now))
        .map(|(id, _)| id.clone())
        .collect();

      for id in stalled {
        let Some(entry) = state.jobs.get_mut(&id) else { continue };
        let job = &mut entry.job;
        job.stalled_count += 1;
        job.locked_until = None;
        if job.stalled_count > max_stalled {
          job.state = JobState::Failed;
          job.failed_reason = Some(STALLED_REASON.to_string());
          job.finished_at = Some(now);
          recovery.failed.push(job.clone());
        } else {
          // a lost lock is not a failed attempt
          job.attempts_made = job.attempts_made.saturating_sub(1);
          job.state = JobState::Waiting;
          job.run_at = now;
          recovery.requeued.push(job.clone());
        }
      }
      Ok(recovery)
    })
  }

  async fn next_run_at(&self) -> JobResult<Option<DateTime<Utc>>> {
    self.with_state(|state| {
      Ok(
        state
          .jobs
          .values()
          .filter(|e| matches!(e.job.state, JobState::Waiting | JobState::Delayed))
          .map(|e| e.job.run_at)
          .min(),
      )
    })
  }

  async fn get(&self, id: &str) -> JobResult<Option<Job>> {
    self.with_state(|state| Ok(state.jobs.get(id).map(|e| e.job.clone())))
  }

  async fn counts(&self) -> JobResult<JobCounts> {
    self.with_state(|state| {
      let mut counts = JobCounts::default();
      for entry in state.jobs.values() {
        match entry.job.state {
          JobState::Waiting => counts.waiting += 1,
          JobState::Delayed => counts.delayed += 1,
          JobState::Active => counts.active += 1,
          JobState::Completed => counts.completed += 1,
          JobState::Failed => counts.failed += 1,
        }
      }
      Ok(counts)
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::job::JobOptions;
  use chrono::Duration;
  use pretty_assertions::assert_eq;

  fn job(id: &str, now: DateTime<Utc>) -> Job {
    Job::new("q", "q:run", serde_json::json!({}), JobOptions::default().with_job_id(id), now)
  }

  #[tokio::test]
  async fn test_push_dedups_non_terminal() {
    let backend = MemoryQueueBackend::new();
    let now = Utc::now();

    assert_eq!(backend.push(job("a", now)).await.unwrap(), EnqueueOutcome::Added("a".into()));
    assert_eq!(backend.push(job("a", now)).await.unwrap(), EnqueueOutcome::Duplicate("a".into()));

    // still a duplicate while active
    backend.claim_next(now, now + Duration::seconds(30)).await.unwrap().unwrap();
    assert_eq!(backend.push(job("a", now)).await.unwrap(), EnqueueOutcome::Duplicate("a".into()));

    // terminal jobs are replaced
    backend.complete("a", now, Retention::Keep).await.unwrap();
    assert_eq!(backend.push(job("a", now)).await.unwrap(), EnqueueOutcome::Added("a".into()));
    assert_eq!(backend.counts().await.unwrap().waiting, 1);
  }

  #[tokio::test]
  async fn test_claim_order_and_run_at() {
    let backend = MemoryQueueBackend::new();
    let now = Utc::now();
    let mut later = job("later", now);
    later.run_at = now + Duration::seconds(10);
    later.state = JobState::Delayed;
    backend.push(later).await.unwrap();
    backend.push(job("first", now)).await.unwrap();
    backend.push(job("second", now)).await.unwrap();

    let lock = now + Duration::seconds(30);
    assert_eq!(backend.claim_next(now, lock).await.unwrap().unwrap().id, "first");
    assert_eq!(backend.claim_next(now, lock).await.unwrap().unwrap().id, "second");
    assert!(backend.claim_next(now, lock).await.unwrap().is_none());
    assert_eq!(backend.next_run_at().await.unwrap(), Some(now + Duration::seconds(10)));

    let claimed = backend.claim_next(now + Duration::seconds(10), lock).await.unwrap().unwrap();
    assert_eq!(claimed.id, "later");
    assert_eq!(claimed.attempts_made, 1);
  }

  #[tokio::test]
  async fn test_stalled_jobs_requeue_then_fail() {
    let backend = MemoryQueueBackend::new();
    let now = Utc::now();
    backend.push(job("s", now)).await.unwrap();

    backend.claim_next(now, now + Duration::seconds(1)).await.unwrap();
    let recovery = backend.recover_stalled(now + Duration::seconds(2), 1).await.unwrap();
    assert_eq!(recovery.requeued.len(), 1);
    assert_eq!(recovery.requeued[0].attempts_made, 0);

    let t = now + Duration::seconds(3);
    backend.claim_next(t, t + Duration::seconds(1)).await.unwrap();
    let recovery = backend.recover_stalled(t + Duration::seconds(2), 1).await.unwrap();
    assert_eq!(recovery.failed.len(), 1);
    let failed = backend.get("s").await.unwrap().unwrap();
    assert_eq!(failed.state, JobState::Failed);
    assert_eq!(failed.failed_reason.as_deref(), Some(STALLED_REASON));
  }

  #[tokio::test]
  async fn test_keep_last_retention() {
    let backend = MemoryQueueBackend::new();
    let now = Utc::now();
    for (i, id) in ["a", "b", "c"].iter().enumerate() {
      backend.push(job(id, now)).await.unwrap();
      backend.claim_next(now, now + Duration::seconds(30)).await.unwrap();
      let finished = now + Duration::seconds(i as i64);
      backend.complete(id, finished, Retention::KeepLast(2)).await.unwrap();
    }
    assert_eq!(backend.counts().await.unwrap().completed, 2);
    assert!(backend.get("a").await.unwrap().is_none());
    assert!(backend.get("c").await.unwrap().is_some());
  }

  #[tokio::test]
  async fn test_complete_requires_active() {
    let backend = MemoryQueueBackend::new();
    let now = Utc::now();
    backend.push(job("x", now)).await.unwrap();
    assert_eq!(
      backend.complete("x", now, Retention::Keep).await,
      Err(JobError::LockLost("x".into()))
    );
    assert_eq!(
      backend.complete("missing", now, Retention::Keep).await,
      Err(JobError::NotFound("missing".into()))
    );
  }
}
