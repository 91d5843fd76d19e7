use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::{Instant, sleep};

/// At most `max` job starts per `duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
  pub max: u32,
  pub duration: Duration,
}

impl RateLimit {
  pub fn new(max: u32, duration: Duration) -> Self {
    Self { max, duration }
  }
}

/// Sliding-window limiter: no more than `max` acquisitions in any window of
/// length `duration`. Callers over the cap wait for the oldest start to age out.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
  max: usize,
  window: Duration,
  starts: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
  pub fn new(limit: RateLimit) -> Self {
    Self {
      max: limit.max.max(1) as usize,
      window: limit.duration,
      starts: Mutex::new(VecDeque::with_capacity(limit.max as usize)),
    }
  }

  /// Wait until a start is allowed, then record it
  pub async fn acquire(&self) {
    while let Some(wait) = self.try_acquire() {
      sleep(wait).await;
    }
  }

  /// Record a start if allowed now, otherwise return how long until the next slot frees
  pub fn try_acquire(&self) -> Option<Duration> {
    let mut starts = self.starts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let now = Instant::now();

    while let Some(&oldest) = starts.front() {
      if now.duration_since(oldest) >= self.window {
        starts.pop_front();
      } else {
        break;
      }
    }

    if starts.len() < self.max {
      starts.push_back(now);
      return None;
    }

    starts.front().map(|&oldest| self.window - now.duration_since(oldest))
  }
}
