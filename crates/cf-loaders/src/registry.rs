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

//! Per-domain wiring: queue names, retry policies, worker limits, recurring
//! schedules and handler construction.

use cf_jobs::{
  Job, JobError, JobHandler, JobName, JobOptions, JobResult, Queue, RateLimit, RecurringScheduler,
  RecurringTask, RetryPolicy, Worker, WorkerHandle, WorkerOptions,
};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::LoaderContext;
use crate::handlers::{
  AssetTrendingHandler, AssetTrendingJob, BinanceHandler, BinanceJob, CoingeckoAssetHandler,
  CoingeckoAssetJob, ExchangeHandler, ExchangeJob, TokenPriceHandler, TokenPriceJob,
};

/// One refresh pipeline: a queue, its worker and its schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
  Exchange,
  CoingeckoAsset,
  AssetTrending,
  Binance,
  TokenPrice,
}

fn names<N: JobName>() -> Vec<&'static str> {
  N::ALL.iter().map(|n| n.as_str()).collect()
}

fn task<N: JobName>(name: N, pattern: &str, retry: RetryPolicy) -> RecurringTask {
  RecurringTask::new(name.as_str(), pattern, format!("{}:recurring", name.as_str())).with_retry(retry)
}

impl Domain {
  pub const ALL: [Domain; 5] = [
    Domain::Exchange,
    Domain::CoingeckoAsset,
    Domain::AssetTrending,
    Domain::Binance,
    Domain::TokenPrice,
  ];

  pub fn queue_name(&self) -> &'static str {
    match self {
      Domain::Exchange => ExchangeJob::QUEUE,
      Domain::CoingeckoAsset => CoingeckoAssetJob::QUEUE,
      Domain::AssetTrending => AssetTrendingJob::QUEUE,
      Domain::Binance => BinanceJob::QUEUE,
      Domain::TokenPrice => TokenPriceJob::QUEUE,
    }
  }

  pub fn job_names(&self) -> Vec<&'static str> {
    match self {
      Domain::Exchange => names::<ExchangeJob>(),
      Domain::CoingeckoAsset => names::<CoingeckoAssetJob>(),
      Domain::AssetTrending => names::<AssetTrendingJob>(),
      Domain::Binance => names::<BinanceJob>(),
      Domain::TokenPrice => names::<TokenPriceJob>(),
    }
  }

  /// Domain owning a job name
  pub fn for_job(name: &str) -> Option<Domain> {
    Domain::ALL.into_iter().find(|d| d.job_names().contains(&name))
  }

  /// Attempts and backoff, slower for upstreams with tight credit budgets
  pub fn retry_policy(&self) -> RetryPolicy {
    match self {
      Domain::Exchange => RetryPolicy::exponential(3, Duration::from_secs(300)),
      Domain::CoingeckoAsset => RetryPolicy::exponential(5, Duration::from_secs(60)),
      Domain::AssetTrending => RetryPolicy::exponential(3, Duration::from_secs(30)),
      Domain::Binance => RetryPolicy::exponential(5, Duration::from_secs(3)),
      Domain::TokenPrice => RetryPolicy::exponential(3, Duration::from_secs(10)),
    }
  }

  /// Defaults for jobs added to this domain's queue without explicit options
  pub fn job_options(&self) -> JobOptions {
    JobOptions::default().with_retry(self.retry_policy())
  }

  pub fn worker_options(&self) -> WorkerOptions {
    let (concurrency, limiter, lock_duration) = match self {
      Domain::Exchange => (1, RateLimit::new(1, Duration::from_secs(60)), 600),
      Domain::CoingeckoAsset => (1, RateLimit::new(2, Duration::from_secs(60)), 300),
      Domain::AssetTrending => (2, RateLimit::new(4, Duration::from_secs(60)), 120),
      Domain::Binance => (4, RateLimit::new(10, Duration::from_secs(1)), 120),
      Domain::TokenPrice => (2, RateLimit::new(5, Duration::from_secs(10)), 60),
    };
    WorkerOptions {
      concurrency,
      limiter: Some(limiter),
      lock_duration: Duration::from_secs(lock_duration),
      ..WorkerOptions::default()
    }
  }

  pub fn recurring_tasks(&self) -> Vec<RecurringTask> {
    let retry = self.retry_policy();
    match self {
      Domain::Exchange => vec![task(ExchangeJob::FetchData, "0 3 * * 1", retry)],
      Domain::CoingeckoAsset => vec![
        task(CoingeckoAssetJob::FetchList, "0 2 * * *", retry),
        task(CoingeckoAssetJob::FetchMarkets, "*/10 * * * *", retry),
      ],
      Domain::AssetTrending => vec![
        task(AssetTrendingJob::FetchTrending, "*/15 * * * *", retry),
        task(AssetTrendingJob::FetchGainersLosers, "*/30 * * * *", retry),
      ],
      Domain::Binance => vec![task(BinanceJob::SyncCandles, "*/5 * * * *", retry)],
      Domain::TokenPrice => vec![task(TokenPriceJob::FetchQuotes, "* * * * *", retry)],
    }
  }

  /// Register this domain's recurring tasks
  pub fn schedule_on<S: RecurringScheduler>(&self, scheduler: &mut S) -> JobResult<()> {
    for task in self.recurring_tasks() {
      scheduler.schedule(task)?;
    }
    Ok(())
  }

  /// Start a worker on `queue` with this domain's handler and limits
  pub fn spawn_worker(&self, queue: Queue, context: Arc<LoaderContext>) -> WorkerHandle {
    let options = self.worker_options();
    match self {
      Domain::Exchange => Worker::spawn(queue, Arc::new(ExchangeHandler::new(context)), options),
      Domain::CoingeckoAsset => {
        Worker::spawn(queue, Arc::new(CoingeckoAssetHandler::new(context)), options)
      }
      Domain::AssetTrending => {
        Worker::spawn(queue, Arc::new(AssetTrendingHandler::new(context)), options)
      }
      Domain::Binance => {
        let handler = BinanceHandler::new(context, queue.clone());
        Worker::spawn(queue, Arc::new(handler), options)
      }
      Domain::TokenPrice => Worker::spawn(queue, Arc::new(TokenPriceHandler::new(context)), options),
    }
  }
}

impl fmt::Display for Domain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.queue_name())
  }
}

impl FromStr for Domain {
  type Err = JobError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Domain::ALL
      .into_iter()
      .find(|d| d.queue_name() == s)
      .ok_or_else(|| JobError::Backend(format!("unknown queue '{}'", s)))
  }
}

async fn dispatch<H: JobHandler>(handler: H, name: &str, job: &Job) -> JobResult<()> {
  let name = H::Name::from_str(name)?;
  handler.handle(name, job).await
}

/// Run one job in the current task, without a queue.
///
/// Sync jobs fetch inline instead of fanning out.
pub async fn run_once(
  context: Arc<LoaderContext>,
  name: &str,
  payload: serde_json::Value,
) -> JobResult<()> {
  let domain = Domain::for_job(name).ok_or_else(|| JobError::UnknownJobName {
    queue: name.split(':').next().unwrap_or_default().to_string(),
    name: name.to_string(),
  })?;
  let job = Job::new(domain.queue_name(), name, payload, domain.job_options(), context.now());

  match domain {
    Domain::Exchange => dispatch(ExchangeHandler::new(context), name, &job).await,
    Domain::CoingeckoAsset => dispatch(CoingeckoAssetHandler::new(context), name, &job).await,
    Domain::AssetTrending => dispatch(AssetTrendingHandler::new(context), name, &job).await,
    Domain::Binance => dispatch(BinanceHandler::inline(context), name, &job).await,
    Domain::TokenPrice => dispatch(TokenPriceHandler::new(context), name, &job).await,
  }
}
