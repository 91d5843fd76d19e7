use crate::error::JobError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};
use std::str::FromStr;
use std::time::Duration;

/// Closed set of job names owned by one queue.
///
/// Implemented by [`job_names!`](crate::job_names); handlers match on the enum
/// so every name has a handler branch.
pub trait JobName:
  Copy + Debug + Display + FromStr<Err = JobError> + Send + Sync + 'static
{
  /// Queue these jobs live on
  const QUEUE: &'static str;
  /// Every variant, in declaration order
  const ALL: &'static [Self];

  /// Name as stored on the queue, e.g. `exchange:fetch:data`
  fn as_str(&self) -> &'static str;
}

/// Declare a queue's job-name enum.
///
/// ```ignore
/// cf_jobs::job_names! {
///   pub enum ExchangeJob in "exchange" {
///     FetchData => "exchange:fetch:data",
///   }
/// }
/// ```
#[macro_export]
macro_rules! job_names {
  (
    $(#[$meta:meta])*
    $vis:vis enum $name:ident in $queue:literal {
      $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
    }
  ) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    $vis enum $name {
      $( $(#[$vmeta])* $variant ),+
    }

    impl $crate::JobName for $name {
      const QUEUE: &'static str = $queue;
      const ALL: &'static [Self] = &[$( $name::$variant ),+];

      fn as_str(&self) -> &'static str {
        match self {
          $( $name::$variant => $wire ),+
        }
      }
    }

    impl ::std::fmt::Display for $name {
      fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        f.write_str($crate::JobName::as_str(self))
      }
    }

    impl ::std::str::FromStr for $name {
      type Err = $crate::JobError;

      fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
        match s {
          $( $wire => Ok($name::$variant), )+
          other => Err($crate::JobError::UnknownJobName {
            queue: $queue.to_string(),
            name: other.to_string(),
          }),
        }
      }
    }
  };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
  Waiting,
  Delayed,
  Active,
  Completed,
  Failed,
}

impl JobState {
  pub fn is_terminal(&self) -> bool {
    matches!(self, JobState::Completed | JobState::Failed)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      JobState::Waiting => "waiting",
      JobState::Delayed => "delayed",
      JobState::Active => "active",
      JobState::Completed => "completed",
      JobState::Failed => "failed",
    }
  }
}

impl FromStr for JobState {
  type Err = JobError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "waiting" => Ok(JobState::Waiting),
      "delayed" => Ok(JobState::Delayed),
      "active" => Ok(JobState::Active),
      "completed" => Ok(JobState::Completed),
      "failed" => Ok(JobState::Failed),
      other => Err(JobError::Backend(format!("unknown job state '{}'", other))),
    }
  }
}

impl Display for JobState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Delay before the next attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Backoff {
  Fixed { delay_ms: u64 },
  Exponential { base_ms: u64 },
}

impl Backoff {
  pub fn fixed(delay: Duration) -> Self {
    Backoff::Fixed { delay_ms: delay.as_millis() as u64 }
  }

  pub fn exponential(base: Duration) -> Self {
    Backoff::Exponential { base_ms: base.as_millis() as u64 }
  }

  /// Delay after the `attempt`-th failed attempt (1-based).
  ///
  /// Exponential backoff waits `base * 2^(attempt - 1)`: 3s, 6s, 12s for a 3s base.
  pub fn delay_for(&self, attempt: u32) -> Duration {
    match *self {
      Backoff::Fixed { delay_ms } => Duration::from_millis(delay_ms),
      Backoff::Exponential { base_ms } => {
        let exp = attempt.saturating_sub(1).min(32);
        Duration::from_millis(base_ms.saturating_mul(1u64 << exp))
      }
    }
  }
}

impl Default for Backoff {
  fn default() -> Self {
    Backoff::Fixed { delay_ms: 0 }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
  pub attempts: u32,
  pub backoff: Backoff,
}

impl RetryPolicy {
  pub fn exponential(attempts: u32, base: Duration) -> Self {
    Self { attempts: attempts.max(1), backoff: Backoff::exponential(base) }
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self { attempts: 1, backoff: Backoff::default() }
  }
}

/// What to do with a job once it reaches a terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "count", rename_all = "snake_case")]
pub enum Retention {
  #[default]
  Keep,
  Remove,
  /// Keep the newest `n` terminal jobs in the same state
  KeepLast(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
  /// Dedup key. A second add with the same key is ignored while the first is not terminal.
  pub job_id: Option<String>,
  pub attempts: u32,
  pub backoff: Backoff,
  pub delay: Option<Duration>,
  pub remove_on_complete: Retention,
  pub remove_on_fail: Retention,
}

impl Default for JobOptions {
  fn default() -> Self {
    Self {
      job_id: None,
      attempts: 1,
      backoff: Backoff::default(),
      delay: None,
      remove_on_complete: Retention::KeepLast(100),
      remove_on_fail: Retention::KeepLast(500),
    }
  }
}

impl JobOptions {
  pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
    self.job_id = Some(job_id.into());
    self
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.attempts = retry.attempts.max(1);
    self.backoff = retry.backoff;
    self
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy { attempts: self.attempts, backoff: self.backoff }
  }
}

/// A unit of work on a queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
  /// Dedup key when one was given, otherwise a random uuid
  pub id: String,
  pub queue: String,
  pub name: String,
  pub payload: serde_json::Value,
  pub options: JobOptions,
  pub state: JobState,
  /// Attempts started so far, including the one in flight
  pub attempts_made: u32,
  pub stalled_count: u32,
  pub run_at: DateTime<Utc>,
  pub locked_until: Option<DateTime<Utc>>,
  pub failed_reason: Option<String>,
  pub created_at: DateTime<Utc>,
  pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
  pub fn new(
    queue: &str,
    name: &str,
    payload: serde_json::Value,
    options: JobOptions,
    now: DateTime<Utc>,
  ) -> Self {
    let id = options.job_id.clone().unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let delay = options.delay.unwrap_or_default();
    let run_at = now + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
    let state = if delay.is_zero() { JobState::Waiting } else { JobState::Delayed };

    Self {
      id,
      queue: queue.to_string(),
      name: name.to_string(),
      payload,
      options,
      state,
      attempts_made: 0,
      stalled_count: 0,
      run_at,
      locked_until: None,
      failed_reason: None,
      created_at: now,
      finished_at: None,
    }
  }

  /// Decode the payload into a handler's input type
  pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, JobError> {
    serde_json::from_value(self.payload.clone()).map_err(JobError::from)
  }

  pub fn has_attempts_left(&self) -> bool {
    self.attempts_made < self.options.attempts
  }
}
