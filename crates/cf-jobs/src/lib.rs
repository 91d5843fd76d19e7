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

//! # cf-jobs
//!
//! Background job machinery for coinfeed.
//!
//! - [`Queue`]: named job channel with dedup ids, delays, retries and
//!   retention, backed by any [`QueueBackend`]
//! - [`Worker`]: bounded-concurrency consumer with an optional sliding-window
//!   rate limit, dispatching on a closed [`JobName`] enum
//! - [`CronScheduler`]: recurring enqueues behind the [`RecurringScheduler`] trait
//! - [`EventListener`]: turns terminal failures into [`AlertSink`] notifications
//!
//! ```ignore
//! cf_jobs::job_names! {
//!   pub enum ExchangeJob in "exchange" {
//!     FetchData => "exchange:fetch:data",
//!   }
//! }
//! ```

#![warn(clippy::all)]

pub mod alert;
pub mod backend;
pub mod clock;
pub mod error;
pub mod job;
pub mod limiter;
pub mod listener;
pub mod queue;
pub mod scheduler;
pub mod worker;

pub use alert::{
  AlertSink, DiscordWebhookSink, FanoutAlertSink, JobAlert, LogAlertSink, TelegramSink,
  alert_sink_from_config,
};
pub use backend::{EnqueueOutcome, JobCounts, MemoryQueueBackend, QueueBackend, StalledRecovery};
pub use clock::{Clock, MonotonicClock};
pub use error::{JobError, JobResult};
pub use job::{Backoff, Job, JobName, JobOptions, JobState, Retention, RetryPolicy};
pub use limiter::{RateLimit, SlidingWindowLimiter};
pub use listener::EventListener;
pub use queue::{Queue, QueueEvent};
pub use scheduler::{CronScheduler, RecurringScheduler, RecurringTask, SchedulerHandle, parse_cron};
pub use worker::{JobHandler, Worker, WorkerHandle, WorkerOptions};
