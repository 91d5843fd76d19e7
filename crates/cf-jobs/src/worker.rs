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

use crate::error::{JobError, JobResult};
use crate::job::{Job, JobName};
use crate::limiter::{RateLimit, SlidingWindowLimiter};
use crate::queue::Queue;
use async_trait::async_trait;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Executes the jobs of one queue.
///
/// `handle` receives the already-parsed job name, so an implementation is a
/// `match` over a closed enum.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
  type Name: JobName;

  async fn handle(&self, name: Self::Name, job: &Job) -> JobResult<()>;
}

#[derive(Debug, Clone)]
pub struct WorkerOptions {
  /// Max simultaneous executions
  pub concurrency: usize,
  /// Max execution starts per window, on top of `concurrency`
  pub limiter: Option<RateLimit>,
  /// How long a claimed job stays locked without renewal
  pub lock_duration: Duration,
  /// Longest idle sleep between queue polls
  pub poll_interval: Duration,
  /// How often expired locks are swept
  pub stalled_interval: Duration,
  /// Stalls tolerated before the job is failed
  pub max_stalled_count: u32,
}

impl Default for WorkerOptions {
  fn default() -> Self {
    Self {
      concurrency: 1,
      limiter: None,
      lock_duration: Duration::from_secs(30),
      poll_interval: Duration::from_secs(5),
      stalled_interval: Duration::from_secs(30),
      max_stalled_count: 1,
    }
  }
}

/// Running worker; drop or [`WorkerHandle::shutdown`] to stop it
pub struct WorkerHandle {
  queue: String,
  shutdown: watch::Sender<bool>,
  join: JoinHandle<()>,
  stalled_join: JoinHandle<()>,
}

impl WorkerHandle {
  /// Stop claiming new jobs and wait for in-flight executions to finish
  pub async fn shutdown(self) {
    let _ = self.shutdown.send(true);
    if let Err(e) = self.join.await {
      error!(queue = %self.queue, "Worker task ended abnormally: {}", e);
    }
    let _ = self.stalled_join.await;
    info!(queue = %self.queue, "Worker stopped");
  }

  pub fn is_finished(&self) -> bool {
    self.join.is_finished()
  }
}

struct WorkerShared<H: JobHandler> {
  queue: Queue,
  handler: Arc<H>,
  options: WorkerOptions,
  limiter: Option<SlidingWindowLimiter>,
}

pub struct Worker;

impl Worker {
  /// Start consuming `queue` with `handler`
  pub fn spawn<H: JobHandler>(queue: Queue, handler: Arc<H>, options: WorkerOptions) -> WorkerHandle {
    if H::Name::QUEUE != queue.name() {
      warn!(
        queue = %queue.name(),
        handler_queue = H::Name::QUEUE,
        "Handler names belong to a different queue; unmatched jobs will fail"
      );
    }

    let options = WorkerOptions { concurrency: options.concurrency.max(1), ..options };
    let (shutdown, shutdown_rx) = watch::channel(false);
    let shared = Arc::new(WorkerShared {
      limiter: options.limiter.map(SlidingWindowLimiter::new),
      queue: queue.clone(),
      handler,
      options,
    });

    info!(
      queue = %queue.name(),
      concurrency = shared.options.concurrency,
      limiter = ?shared.options.limiter,
      "Worker started"
    );

    let stalled_join = tokio::spawn(stalled_loop(shared.clone(), shutdown_rx.clone()));
    let join = tokio::spawn(run(shared, shutdown_rx));

    WorkerHandle { queue: queue.name().to_string(), shutdown, join, stalled_join }
  }
}

async fn run<H: JobHandler>(shared: Arc<WorkerShared<H>>, mut shutdown: watch::Receiver<bool>) {
  let concurrency = shared.options.concurrency;
  let semaphore = Arc::new(Semaphore::new(concurrency));

  loop {
    if *shutdown.borrow() {
      break;
    }

    let permit = tokio::select! {
      permit = semaphore.clone().acquire_owned() => match permit {
        Ok(permit) => permit,
        Err(_) => break,
      },
      _ = shutdown.changed() => break,
    };

    match shared.queue.claim(shared.options.lock_duration).await {
      Ok(Some(job)) => {
        tokio::spawn(execute(shared.clone(), job, permit));
        continue;
      }
      Ok(None) => drop(permit),
      Err(e) => {
        drop(permit);
        error!(queue = %shared.queue.name(), "Failed to claim job: {}", e);
      }
    }

    let idle = shared.queue.next_wakeup(shared.options.poll_interval).await;
    tokio::select! {
      _ = tokio::time::sleep(idle) => {}
      _ = shared.queue.notified() => {}
      _ = shutdown.changed() => break,
    }
  }

  // drain: every in-flight execution holds one permit
  debug!(queue = %shared.queue.name(), "Worker draining in-flight jobs");
  let _ = semaphore.acquire_many(concurrency as u32).await;
}

async fn stalled_loop<H: JobHandler>(shared: Arc<WorkerShared<H>>, mut shutdown: watch::Receiver<bool>) {
  let mut ticker = tokio::time::interval(shared.options.stalled_interval);
  ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

  loop {
    tokio::select! {
      _ = ticker.tick() => {}
      _ = shutdown.changed() => break,
    }
    if *shutdown.borrow() {
      break;
    }
    if let Err(e) = shared.queue.recover_stalled(shared.options.max_stalled_count).await {
      error!(queue = %shared.queue.name(), "Stalled job check failed: {}", e);
    }
  }
}

async fn execute<H: JobHandler>(shared: Arc<WorkerShared<H>>, job: Job, _permit: OwnedSemaphorePermit) {
  let queue = &shared.queue;
  let renewal = spawn_lock_renewal(queue.clone(), job.id.clone(), shared.options.lock_duration);

  let result = match H::Name::from_str(&job.name) {
    Ok(name) => {
      if let Some(limiter) = &shared.limiter {
        limiter.acquire().await;
      }
      debug!(queue = %queue.name(), job_id = %job.id, job = %name, attempt = job.attempts_made, "Job started");

      let handler = shared.handler.clone();
      let task_job = job.clone();
      // own task so a panicking handler fails the job instead of the worker
      match tokio::spawn(async move { handler.handle(name, &task_job).await }).await {
        Ok(result) => result,
        Err(join_err) => Err(JobError::Panicked(join_err.to_string())),
      }
    }
    Err(e) => Err(e),
  };

  renewal.abort();

  let outcome = match result {
    Ok(()) => {
      debug!(queue = %queue.name(), job_id = %job.id, "Job completed");
      queue.mark_completed(&job).await
    }
    Err(e) if e.is_permanent() => {
      error!(queue = %queue.name(), job_id = %job.id, job = %job.name, "Job failed permanently: {}", e);
      queue.mark_failed(&job, &e.to_string()).await
    }
    Err(e) if job.has_attempts_left() => {
      let delay = job.options.backoff.delay_for(job.attempts_made);
      warn!(
        queue = %queue.name(),
        job_id = %job.id,
        attempt = job.attempts_made,
        of = job.options.attempts,
        delay_ms = delay.as_millis() as u64,
        "Job attempt failed, retrying: {}",
        e
      );
      queue.mark_retry(&job, delay, &e.to_string()).await
    }
    Err(e) => {
      error!(
        queue = %queue.name(),
        job_id = %job.id,
        attempts = job.attempts_made,
        "Job failed after final attempt: {}",
        e
      );
      queue.mark_failed(&job, &e.to_string()).await
    }
  };

  if let Err(e) = outcome {
    // typically the lock expired and the job was re-delivered elsewhere
    warn!(queue = %queue.name(), job_id = %job.id, "Could not record job outcome: {}", e);
  }
}

fn spawn_lock_renewal(queue: Queue, job_id: String, lock_duration: Duration) -> JoinHandle<()> {
  tokio::spawn(async move {
    let period = (lock_duration / 2).max(Duration::from_millis(10));
    loop {
      tokio::time::sleep(period).await;
      match queue.extend_lock(&job_id, lock_duration).await {
        Ok(true) => {}
        Ok(false) => {
          warn!(queue = %queue.name(), job_id = %job_id, "Job lock lost");
          break;
        }
        Err(e) => warn!(queue = %queue.name(), job_id = %job_id, "Lock renewal failed: {}", e),
      }
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::job::{JobOptions, JobState, RetryPolicy};
  use crate::queue::QueueEvent;
  use serde_json::json;
  use std::sync::Mutex;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use tokio::time::Instant;

  crate::job_names! {
    pub enum TestJob in "test" {
      Work => "test:work",
      Fail => "test:fail",
      Panic => "test:panic",
    }
  }

  #[derive(Default)]
  struct Recorder {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    starts: Mutex<Vec<Instant>>,
  }

  #[async_trait]
  impl JobHandler for Recorder {
    type Name = TestJob;

    async fn handle(&self, name: TestJob, _job: &Job) -> JobResult<()> {
      self.starts.lock().unwrap().push(Instant::now());
      match name {
        TestJob::Work => {
          let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
          self.max_in_flight.fetch_max(now, Ordering::SeqCst);
          tokio::time::sleep(Duration::from_millis(100)).await;
          self.in_flight.fetch_sub(1, Ordering::SeqCst);
          Ok(())
        }
        TestJob::Fail => Err(JobError::Handler("upstream returned 500".into())),
        TestJob::Panic => panic!("handler bug"),
      }
    }
  }

  async fn wait_for_failed(events: &mut tokio::sync::broadcast::Receiver<QueueEvent>) -> QueueEvent {
    loop {
      let event = events.recv().await.unwrap();
      if matches!(event, QueueEvent::Failed { .. }) {
        return event;
      }
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_concurrency_bound_is_never_exceeded() {
    let queue = Queue::in_memory("test", JobOptions::default());
    for _ in 0..12 {
      queue.add(TestJob::Work, json!({}), None).await;
    }

    let handler = Arc::new(Recorder::default());
    let options = WorkerOptions { concurrency: 3, ..WorkerOptions::default() };
    let worker = Worker::spawn(queue.clone(), handler.clone(), options);

    tokio::time::sleep(Duration::from_secs(5)).await;
    worker.shutdown().await;

    assert_eq!(queue.counts().await.unwrap().completed, 12);
    assert_eq!(handler.max_in_flight.load(Ordering::SeqCst), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_rate_limit_caps_starts_per_window() {
    let queue = Queue::in_memory("test", JobOptions::default());
    for _ in 0..7 {
      queue.add(TestJob::Work, json!({}), None).await;
    }

    let handler = Arc::new(Recorder::default());
    let options = WorkerOptions {
      concurrency: 5,
      limiter: Some(RateLimit::new(2, Duration::from_secs(1))),
      ..WorkerOptions::default()
    };
    let worker = Worker::spawn(queue.clone(), handler.clone(), options);

    tokio::time::sleep(Duration::from_secs(10)).await;
    worker.shutdown().await;

    let mut starts = handler.starts.lock().unwrap().clone();
    starts.sort();
    assert_eq!(starts.len(), 7);
    for pair in starts.windows(3) {
      assert!(pair[2].duration_since(pair[0]) >= Duration::from_secs(1));
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_retries_exactly_attempts_times_with_exponential_backoff() {
    let retry = RetryPolicy::exponential(3, Duration::from_millis(3000));
    let queue = Queue::in_memory("test", JobOptions::default().with_retry(retry));
    let mut events = queue.subscribe();
    let outcome = queue.add(TestJob::Fail, json!({}), None).await.unwrap();

    let handler = Arc::new(Recorder::default());
    let worker = Worker::spawn(queue.clone(), handler.clone(), WorkerOptions::default());

    let failed = wait_for_failed(&mut events).await;
    worker.shutdown().await;

    let starts = handler.starts.lock().unwrap().clone();
    assert_eq!(starts.len(), 3);
    let gap1 = starts[1].duration_since(starts[0]);
    let gap2 = starts[2].duration_since(starts[1]);
    assert!(gap1 >= Duration::from_millis(3000) && gap1 < Duration::from_millis(3100), "{gap1:?}");
    assert!(gap2 >= Duration::from_millis(6000) && gap2 < Duration::from_millis(6100), "{gap2:?}");

    match failed {
      QueueEvent::Failed { job_id, failed_reason, attempts_made, .. } => {
        assert_eq!(job_id, outcome.job_id());
        assert_eq!(attempts_made, 3);
        assert!(failed_reason.contains("upstream returned 500"));
      }
      other => panic!("unexpected event {other:?}"),
    }
    let job = queue.get_job(outcome.job_id()).await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Failed);
  }

  #[tokio::test(start_paused = true)]
  async fn test_unknown_job_name_fails_without_retry() {
    let retry = RetryPolicy::exponential(5, Duration::from_secs(1));
    let queue = Queue::in_memory("test", JobOptions::default().with_retry(retry));
    let mut events = queue.subscribe();
    let outcome = queue.add_job("test:does-not-exist", json!({}), None).await.unwrap();

    let handler = Arc::new(Recorder::default());
    let worker = Worker::spawn(queue.clone(), handler.clone(), WorkerOptions::default());

    let failed = wait_for_failed(&mut events).await;
    worker.shutdown().await;

    assert!(handler.starts.lock().unwrap().is_empty());
    match failed {
      QueueEvent::Failed { attempts_made, failed_reason, .. } => {
        assert_eq!(attempts_made, 1);
        assert!(failed_reason.contains("Unknown job name"));
      }
      other => panic!("unexpected event {other:?}"),
    }
    let job = queue.get_job(outcome.job_id()).await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Failed);
  }

  #[tokio::test(start_paused = true)]
  async fn test_panicking_handler_fails_job_not_worker() {
    let queue = Queue::in_memory("test", JobOptions::default());
    let mut events = queue.subscribe();
    queue.add(TestJob::Panic, json!({}), None).await;

    let handler = Arc::new(Recorder::default());
    let worker = Worker::spawn(queue.clone(), handler.clone(), WorkerOptions::default());

    match wait_for_failed(&mut events).await {
      QueueEvent::Failed { failed_reason, .. } => assert!(failed_reason.contains("panicked")),
      other => panic!("unexpected event {other:?}"),
    }

    // the worker keeps serving jobs afterwards
    queue.add(TestJob::Work, json!({}), None).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!worker.is_finished());
    assert_eq!(queue.counts().await.unwrap().completed, 1);
    worker.shutdown().await;
  }

  #[tokio::test(start_paused = true)]
  async fn test_shutdown_drains_in_flight_jobs() {
    let queue = Queue::in_memory("test", JobOptions::default());
    for _ in 0..2 {
      queue.add(TestJob::Work, json!({}), None).await;
    }
    let handler = Arc::new(Recorder::default());
    let options = WorkerOptions { concurrency: 2, ..WorkerOptions::default() };
    let worker = Worker::spawn(queue.clone(), handler.clone(), options);

    // let both jobs start, then stop while they sleep
    tokio::time::sleep(Duration::from_millis(10)).await;
    worker.shutdown().await;

    assert_eq!(queue.counts().await.unwrap().completed, 2);
  }
}
