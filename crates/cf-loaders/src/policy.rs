//! Handler failure policy.
//!
//! A loader error either reaches the worker, where attempts, backoff and the
//! failure alert take over, or it is logged and counted here and the job
//! completes. Invalid input always reaches the worker.

use crate::LoaderResult;
use cf_core::FailurePolicy;
use cf_jobs::JobResult;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Per-queue count of errors a handler swallowed
#[derive(Debug, Default)]
pub struct SwallowedFailures {
  counts: Mutex<BTreeMap<&'static str, u64>>,
}

impl SwallowedFailures {
  pub fn new() -> Self {
    Self::default()
  }

  /// Count one swallowed failure and return the queue's new total
  pub fn record(&self, queue: &'static str) -> u64 {
    let mut counts = self.counts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let count = counts.entry(queue).or_insert(0);
    *count += 1;
    *count
  }

  pub fn count(&self, queue: &str) -> u64 {
    let counts = self.counts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    counts.get(queue).copied().unwrap_or(0)
  }

  pub fn total(&self) -> u64 {
    let counts = self.counts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    counts.values().sum()
  }

  pub fn snapshot(&self) -> BTreeMap<&'static str, u64> {
    self.counts.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
  }
}

pub fn apply_failure_policy<T: Debug>(
  policy: FailurePolicy,
  swallowed: &SwallowedFailures,
  queue: &'static str,
  job: &str,
  result: LoaderResult<T>,
) -> JobResult<()> {
  match result {
    Ok(output) => {
      info!(queue, job, ?output, "Job finished");
      Ok(())
    }
    Err(e) if e.is_invalid_input() => {
      error!(queue, job, "Rejected job input: {}", e);
      Err(e.into())
    }
    Err(e) => match policy {
      FailurePolicy::Propagate => {
        warn!(queue, job, "Handler failed: {}", e);
        Err(e.into())
      }
      FailurePolicy::Swallow => {
        let swallowed_total = swallowed.record(queue);
        error!(queue, job, swallowed_total, "Handler failed, completing job anyway: {}", e);
        Ok(())
      }
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::LoaderError;
  use cf_jobs::JobError;

  #[test]
  fn test_propagate_returns_handler_error() {
    let swallowed = SwallowedFailures::new();
    let result: LoaderResult<()> = Err(LoaderError::ApiError("502 from upstream".to_string()));

    let outcome = apply_failure_policy(
      FailurePolicy::Propagate,
      &swallowed,
      "exchange",
      "exchange:fetch:data",
      result,
    );

    assert!(matches!(outcome, Err(JobError::Handler(_))));
    assert_eq!(swallowed.total(), 0);
  }

  #[test]
  fn test_swallow_completes_and_counts_per_queue() {
    let swallowed = SwallowedFailures::new();
    for _ in 0..2 {
      let result: LoaderResult<()> = Err(LoaderError::ApiError("timeout".to_string()));
      let outcome =
        apply_failure_policy(FailurePolicy::Swallow, &swallowed, "binance", "binance:fetch:candles", result);
      assert!(outcome.is_ok());
    }

    assert_eq!(swallowed.count("binance"), 2);
    assert_eq!(swallowed.count("exchange"), 0);
    assert_eq!(swallowed.total(), 2);
  }

  #[test]
  fn test_invalid_input_is_never_swallowed() {
    let swallowed = SwallowedFailures::new();
    let result: LoaderResult<()> = Err(LoaderError::InvalidInput("symbol is required".to_string()));

    let outcome =
      apply_failure_policy(FailurePolicy::Swallow, &swallowed, "binance", "binance:fetch:candles", result);

    assert!(matches!(outcome, Err(JobError::InvalidPayload(_))));
    assert_eq!(swallowed.total(), 0);
  }
}
