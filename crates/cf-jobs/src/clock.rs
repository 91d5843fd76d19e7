use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Wall-clock source for run times, locks and cron ticks
pub trait Clock: Send + Sync + Debug {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall time derived from a start anchor plus tokio's monotonic clock.
///
/// Under a paused tokio runtime the wall time advances with virtual time, so
/// backoff delays and cron ticks can be tested without real sleeps.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
  anchor_wall: DateTime<Utc>,
  anchor: Instant,
}

impl MonotonicClock {
  pub fn new() -> Self {
    Self { anchor_wall: Utc::now(), anchor: Instant::now() }
  }

  pub fn shared() -> Arc<dyn Clock> {
    Arc::new(Self::new())
  }
}

impl Default for MonotonicClock {
  fn default() -> Self {
    Self::new()
  }
}

impl Clock for MonotonicClock {
  fn now(&self) -> DateTime<Utc> {
    let elapsed = chrono::Duration::from_std(self.anchor.elapsed())
      .unwrap_or_else(|_| chrono::Duration::zero());
    self.anchor_wall + elapsed
  }
}

/// Time from `now` until `at`, zero when `at` has passed
pub fn until(now: DateTime<Utc>, at: DateTime<Utc>) -> Duration {
  (at - now).to_std().unwrap_or(Duration::ZERO)
}

/// `now + d`, or `now` when the sum is out of range
pub fn after(now: DateTime<Utc>, d: Duration) -> DateTime<Utc> {
  chrono::Duration::from_std(d).ok().and_then(|d| now.checked_add_signed(d)).unwrap_or(now)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test(start_paused = true)]
  async fn test_monotonic_clock_follows_paused_time() {
    let clock = MonotonicClock::new();
    let start = clock.now();
    tokio::time::advance(Duration::from_secs(90)).await;
    assert_eq!(clock.now() - start, chrono::Duration::seconds(90));
  }

  #[test]
  fn test_until_never_negative() {
    let now = Utc::now();
    assert_eq!(until(now, now - chrono::Duration::seconds(5)), Duration::ZERO);
    assert_eq!(until(now, after(now, Duration::from_secs(3))), Duration::from_secs(3));
  }
}
