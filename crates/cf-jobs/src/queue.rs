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

use crate::backend::{EnqueueOutcome, JobCounts, MemoryQueueBackend, QueueBackend, StalledRecovery};
use crate::clock::{self, Clock, MonotonicClock};
use crate::error::JobResult;
use crate::job::{Job, JobName, JobOptions};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast};
use tracing::{debug, error, info};

const EVENT_CAPACITY: usize = 1024;

/// Lifecycle notifications published by a queue
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
  Added { job_id: String, name: String },
  Active { job_id: String, name: String, attempt: u32 },
  Completed { job_id: String, name: String },
  Retrying { job_id: String, name: String, attempt: u32, delay: Duration, error: String },
  Stalled { job_id: String, name: String },
  Failed { job_id: String, name: String, failed_reason: String, attempts_made: u32 },
}

struct QueueInner {
  name: String,
  backend: Arc<dyn QueueBackend>,
  defaults: JobOptions,
  events: broadcast::Sender<QueueEvent>,
  wakeup: Notify,
  clock: Arc<dyn Clock>,
}

/// A named channel of jobs for one domain
///
/// Cloning is cheap; clones share storage, events and wakeups.
#[derive(Clone)]
pub struct Queue {
  inner: Arc<QueueInner>,
}

impl std::fmt::Debug for Queue {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Queue").field("name", &self.inner.name).finish()
  }
}

impl Queue {
  pub fn new(
    name: impl Into<String>,
    backend: Arc<dyn QueueBackend>,
    defaults: JobOptions,
    clock: Arc<dyn Clock>,
  ) -> Self {
    let (events, _) = broadcast::channel(EVENT_CAPACITY);
    Self {
      inner: Arc::new(QueueInner {
        name: name.into(),
        backend,
        defaults,
        events,
        wakeup: Notify::new(),
        clock,
      }),
    }
  }

  /// Queue over process-local storage
  pub fn in_memory(name: impl Into<String>, defaults: JobOptions) -> Self {
    Self::new(name, Arc::new(MemoryQueueBackend::new()), defaults, MonotonicClock::shared())
  }

  pub fn name(&self) -> &str {
    &self.inner.name
  }

  /// Options applied when a caller passes none
  pub fn defaults(&self) -> &JobOptions {
    &self.inner.defaults
  }

  pub fn clock(&self) -> &Arc<dyn Clock> {
    &self.inner.clock
  }

  pub fn now(&self) -> DateTime<Utc> {
    self.inner.clock.now()
  }

  /// Enqueue a job. Errors are logged and swallowed so scheduling never takes the caller down.
  ///
  /// Returns `None` when the job could not be stored.
  pub async fn add_job(
    &self,
    name: &str,
    payload: serde_json::Value,
    options: Option<JobOptions>,
  ) -> Option<EnqueueOutcome> {
    match self.try_add_job(name, payload, options).await {
      Ok(outcome) => Some(outcome),
      Err(e) => {
        error!(queue = %self.inner.name, job = name, "Failed to enqueue job: {}", e);
        None
      }
    }
  }

  /// Typed variant of [`Queue::add_job`]
  pub async fn add<N: JobName>(
    &self,
    name: N,
    payload: serde_json::Value,
    options: Option<JobOptions>,
  ) -> Option<EnqueueOutcome> {
    self.add_job(name.as_str(), payload, options).await
  }

  /// Enqueue a job and report storage errors to the caller
  pub async fn try_add_job(
    &self,
    name: &str,
    payload: serde_json::Value,
    options: Option<JobOptions>,
  ) -> JobResult<EnqueueOutcome> {
    let options = options.unwrap_or_else(|| self.inner.defaults.clone());
    let job = Job::new(&self.inner.name, name, payload, options, self.now());

    let outcome = self.inner.backend.push(job).await?;
    match &outcome {
      EnqueueOutcome::Added(id) => {
        debug!(queue = %self.inner.name, job_id = %id, job = name, "Job added");
        self.emit(QueueEvent::Added { job_id: id.clone(), name: name.to_string() });
        self.inner.wakeup.notify_one();
      }
      EnqueueOutcome::Duplicate(id) => {
        debug!(queue = %self.inner.name, job_id = %id, job = name, "Job already pending, skipped");
      }
    }
    Ok(outcome)
  }

  /// Subscribe to lifecycle events. Receivers created later miss earlier events.
  pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
    self.inner.events.subscribe()
  }

  pub async fn get_job(&self, id: &str) -> JobResult<Option<Job>> {
    self.inner.backend.get(id).await
  }

  pub async fn counts(&self) -> JobResult<JobCounts> {
    self.inner.backend.counts().await
  }

  /// How long an idle worker may sleep before the next delayed job is due
  pub async fn next_wakeup(&self, max: Duration) -> Duration {
    match self.inner.backend.next_run_at().await {
      Ok(Some(at)) => clock::until(self.now(), at).min(max),
      Ok(None) => max,
      Err(e) => {
        error!(queue = %self.inner.name, "Failed to read next run time: {}", e);
        max
      }
    }
  }

  /// Resolves when a job was added or rescheduled
  pub async fn notified(&self) {
    self.inner.wakeup.notified().await
  }

  pub(crate) async fn claim(&self, lock_duration: Duration) -> JobResult<Option<Job>> {
    let now = self.now();
    let job = self.inner.backend.claim_next(now, clock::after(now, lock_duration)).await?;
    if let Some(job) = &job {
      self.emit(QueueEvent::Active {
        job_id: job.id.clone(),
        name: job.name.clone(),
        attempt: job.attempts_made,
      });
    }
    Ok(job)
  }

  pub(crate) async fn extend_lock(&self, id: &str, lock_duration: Duration) -> JobResult<bool> {
    let now = self.now();
    self.inner.backend.extend_lock(id, clock::after(now, lock_duration)).await
  }

  pub(crate) async fn mark_completed(&self, job: &Job) -> JobResult<()> {
    self.inner.backend.complete(&job.id, self.now(), job.options.remove_on_complete).await?;
    self.emit(QueueEvent::Completed { job_id: job.id.clone(), name: job.name.clone() });
    Ok(())
  }

  pub(crate) async fn mark_retry(&self, job: &Job, delay: Duration, reason: &str) -> JobResult<()> {
    let run_at = clock::after(self.now(), delay);
    self.inner.backend.retry_later(&job.id, run_at, reason).await?;
    self.emit(QueueEvent::Retrying {
      job_id: job.id.clone(),
      name: job.name.clone(),
      attempt: job.attempts_made,
      delay,
      error: reason.to_string(),
    });
    // idle workers recompute their sleep against the new run time
    self.inner.wakeup.notify_one();
    Ok(())
  }

  pub(crate) async fn mark_failed(&self, job: &Job, reason: &str) -> JobResult<()> {
    self.inner.backend.fail(&job.id, self.now(), reason, job.options.remove_on_fail).await?;
    self.emit(QueueEvent::Failed {
      job_id: job.id.clone(),
      name: job.name.clone(),
      failed_reason: reason.to_string(),
      attempts_made: job.attempts_made,
    });
    Ok(())
  }

  pub(crate) async fn recover_stalled(&self, max_stalled: u32) -> JobResult<StalledRecovery> {
    let recovery = self.inner.backend.recover_stalled(self.now(), max_stalled).await?;

    for job in &recovery.requeued {
      info!(queue = %self.inner.name, job_id = %job.id, "Stalled job moved back to waiting");
      self.emit(QueueEvent::Stalled { job_id: job.id.clone(), name: job.name.clone() });
    }
    for job in &recovery.failed {
      self.emit(QueueEvent::Failed {
        job_id: job.id.clone(),
        name: job.name.clone(),
        failed_reason: job.failed_reason.clone().unwrap_or_default(),
        attempts_made: job.attempts_made,
      });
    }
    if !recovery.requeued.is_empty() {
      self.inner.wakeup.notify_one();
    }
    Ok(recovery)
  }

  fn emit(&self, event: QueueEvent) {
    // no subscribers is fine
    let _ = self.inner.events.send(event);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::JobError;
  use crate::job::{JobState, Retention};
  use async_trait::async_trait;
  use serde_json::json;

  #[tokio::test]
  async fn test_second_add_with_same_job_id_is_noop() {
    let queue = Queue::in_memory("exchange", JobOptions::default());
    let options = JobOptions::default().with_job_id("exchange-daily");

    let first = queue.add_job("exchange:fetch:data", json!({}), Some(options.clone())).await;
    let second = queue.add_job("exchange:fetch:data", json!({}), Some(options)).await;

    assert_eq!(first, Some(EnqueueOutcome::Added("exchange-daily".into())));
    assert_eq!(second, Some(EnqueueOutcome::Duplicate("exchange-daily".into())));
    assert_eq!(queue.counts().await.unwrap().waiting, 1);
  }

  #[tokio::test]
  async fn test_add_without_options_uses_defaults() {
    let defaults = JobOptions { attempts: 4, ..JobOptions::default() };
    let queue = Queue::in_memory("binance", defaults);
    let outcome = queue.add_job("binance:sync:candles", json!({}), None).await.unwrap();
    let job = queue.get_job(outcome.job_id()).await.unwrap().unwrap();
    assert_eq!(job.options.attempts, 4);
    assert_eq!(job.state, JobState::Waiting);
  }

  #[tokio::test]
  async fn test_added_event_published() {
    let queue = Queue::in_memory("q", JobOptions::default());
    let mut events = queue.subscribe();
    queue.add_job("q:run", json!({"a": 1}), Some(JobOptions::default().with_job_id("j1"))).await;
    assert_eq!(
      events.recv().await.unwrap(),
      QueueEvent::Added { job_id: "j1".into(), name: "q:run".into() }
    );
  }

  struct BrokenBackend;

  #[async_trait]
  impl QueueBackend for BrokenBackend {
    async fn push(&self, _job: Job) -> JobResult<EnqueueOutcome> {
      Err(JobError::Backend("connection refused".into()))
    }
    async fn claim_next(&self, _: DateTime<Utc>, _: DateTime<Utc>) -> JobResult<Option<Job>> {
      Ok(None)
    }
    async fn extend_lock(&self, _: &str, _: DateTime<Utc>) -> JobResult<bool> {
      Ok(false)
    }
    async fn complete(&self, _: &str, _: DateTime<Utc>, _: Retention) -> JobResult<()> {
      Ok(())
    }
    async fn retry_later(&self, _: &str, _: DateTime<Utc>, _: &str) -> JobResult<()> {
      Ok(())
    }
    async fn fail(&self, _: &str, _: DateTime<Utc>, _: &str, _: Retention) -> JobResult<()> {
      Ok(())
    }
    async fn recover_stalled(&self, _: DateTime<Utc>, _: u32) -> JobResult<StalledRecovery> {
      Ok(StalledRecovery::default())
    }
    async fn next_run_at(&self) -> JobResult<Option<DateTime<Utc>>> {
      Ok(None)
    }
    async fn get(&self, _: &str) -> JobResult<Option<Job>> {
      Ok(None)
    }
    async fn counts(&self) -> JobResult<JobCounts> {
      Ok(JobCounts::default())
    }
  }

  #[tokio::test]
  async fn test_enqueue_failure_is_swallowed() {
    let queue =
      Queue::new("q", Arc::new(BrokenBackend), JobOptions::default(), MonotonicClock::shared());

    assert_eq!(queue.add_job("q:run", json!({}), None).await, None);
    assert!(matches!(
      queue.try_add_job("q:run", json!({}), None).await,
      Err(JobError::Backend(_))
    ));
  }

  #[tokio::test(start_paused = true)]
  async fn test_next_wakeup_tracks_delayed_jobs() {
    let queue = Queue::in_memory("q", JobOptions::default());
    assert_eq!(queue.next_wakeup(Duration::from_secs(5)).await, Duration::from_secs(5));

    let delayed = JobOptions::default().with_delay(Duration::from_secs(2));
    queue.add_job("q:run", json!({}), Some(delayed)).await;
    assert_eq!(queue.next_wakeup(Duration::from_secs(5)).await, Duration::from_secs(2));
  }
}
