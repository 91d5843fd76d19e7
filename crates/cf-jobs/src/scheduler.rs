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

//! Recurring jobs.
//!
//! A [`RecurringTask`] says what to enqueue and when; a [`RecurringScheduler`]
//! turns the schedule into enqueues. [`CronScheduler`] runs an in-process
//! timer per task and pushes onto a [`Queue`], relying on the task's dedup key
//! so a slow run is never doubled up by the next tick.

use crate::clock::{self, Clock};
use crate::error::{JobError, JobResult};
use crate::job::{JobOptions, RetryPolicy};
use crate::queue::Queue;
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RecurringTask {
  /// Job name to enqueue on every tick
  pub name: String,
  /// Cron pattern; 5-field patterns get a leading seconds field of `0`
  pub pattern: String,
  /// Dedup key shared by every run of this task
  pub job_id: String,
  pub payload: serde_json::Value,
  pub retry: RetryPolicy,
  /// Also enqueue once when the scheduler starts
  pub run_on_start: bool,
}

impl RecurringTask {
  pub fn new(name: impl Into<String>, pattern: impl Into<String>, job_id: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      pattern: pattern.into(),
      job_id: job_id.into(),
      payload: serde_json::Value::Object(Default::default()),
      retry: RetryPolicy::default(),
      run_on_start: false,
    }
  }

  pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
    self.payload = payload;
    self
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn run_on_start(mut self, run_on_start: bool) -> Self {
    self.run_on_start = run_on_start;
    self
  }

  pub fn schedule(&self) -> JobResult<Schedule> {
    parse_cron(&self.pattern)
  }

  /// First tick strictly after `now`
  pub fn next_after(&self, now: DateTime<Utc>) -> JobResult<Option<DateTime<Utc>>> {
    Ok(self.schedule()?.after(&now).next())
  }
}

/// Parse a 5-, 6- or 7-field cron pattern
pub fn parse_cron(pattern: &str) -> JobResult<Schedule> {
  let fields = pattern.split_whitespace().count();
  let normalized = match fields {
    5 => format!("0 {}", pattern.trim()),
    6 | 7 => pattern.trim().to_string(),
    _ => {
      return Err(JobError::InvalidCron {
        pattern: pattern.to_string(),
        message: format!("expected 5 to 7 fields, got {}", fields),
      });
    }
  };

  Schedule::from_str(&normalized)
    .map_err(|e| JobError::InvalidCron { pattern: pattern.to_string(), message: e.to_string() })
}

/// Anything that can turn recurring tasks into enqueues
pub trait RecurringScheduler {
  /// Validate and register a task. Call before `start`.
  fn schedule(&mut self, task: RecurringTask) -> JobResult<()>;

  fn tasks(&self) -> &[RecurringTask];

  fn start(self) -> SchedulerHandle;
}

/// Stops the scheduler's timers
pub struct SchedulerHandle {
  shutdown: watch::Sender<bool>,
  joins: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
  pub async fn shutdown(self) {
    let _ = self.shutdown.send(true);
    for join in self.joins {
      let _ = join.await;
    }
  }
}

/// In-process cron timers feeding one queue
pub struct CronScheduler {
  queue: Queue,
  tasks: Vec<(RecurringTask, Schedule)>,
  registered: Vec<RecurringTask>,
}

impl CronScheduler {
  pub fn new(queue: Queue) -> Self {
    Self { queue, tasks: Vec::new(), registered: Vec::new() }
  }
}

impl RecurringScheduler for CronScheduler {
  fn schedule(&mut self, task: RecurringTask) -> JobResult<()> {
    let schedule = task.schedule()?;
    info!(queue = %self.queue.name(), job = %task.name, pattern = %task.pattern, "Recurring job registered");
    self.registered.push(task.clone());
    self.tasks.push((task, schedule));
    Ok(())
  }

  fn tasks(&self) -> &[RecurringTask] {
    &self.registered
  }

  fn start(self) -> SchedulerHandle {
    let (shutdown, shutdown_rx) = watch::channel(false);
    let joins = self
      .tasks
      .into_iter()
      .map(|(task, schedule)| {
        tokio::spawn(tick_loop(self.queue.clone(), task, schedule, shutdown_rx.clone()))
      })
      .collect();
    SchedulerHandle { shutdown, joins }
  }
}

async fn tick_loop(
  queue: Queue,
  task: RecurringTask,
  schedule: Schedule,
  mut shutdown: watch::Receiver<bool>,
) {
  let clock: Arc<dyn Clock> = queue.clock().clone();
  let options = JobOptions::default().with_job_id(task.job_id.clone()).with_retry(task.retry);

  if task.run_on_start {
    enqueue(&queue, &task, &options).await;
  }

  loop {
    let now = clock.now();
    let Some(next) = schedule.after(&now).next() else {
      warn!(job = %task.name, "Cron pattern has no future ticks; stopping");
      break;
    };
    debug!(job = %task.name, next = %next, "Next recurring run");

    tokio::select! {
      _ = tokio::time::sleep(clock::until(now, next)) => {}
      _ = shutdown.changed() => break,
    }
    if *shutdown.borrow() {
      break;
    }
    enqueue(&queue, &task, &options).await;
  }
}

async fn enqueue(queue: &Queue, task: &RecurringTask, options: &JobOptions) {
  // errors are logged inside add_job
  queue.add_job(&task.name, task.payload.clone(), Some(options.clone())).await;
}
