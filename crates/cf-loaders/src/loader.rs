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

//! Base traits and types for data loaders

use crate::LoaderResult;
use crate::policy::{SwallowedFailures, apply_failure_policy};
use async_trait::async_trait;
use cf_client::ProviderClients;
use cf_core::{CMC_SLUG_CHUNK_SIZE, FailurePolicy, QuotePair, RefreshConfig};
use cf_database_postgres::RefreshStore;
use cf_jobs::{Clock, JobResult, MonotonicClock};
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::sync::Arc;

const UPDATED_BY: &str = "coinfeed";

/// Configuration for data loaders
#[derive(Debug, Clone)]
pub struct LoaderConfig {
  /// What happens to a handler error once the loader gives up on it
  pub failure_policy: FailurePolicy,

  /// Ids per upstream request when a list has to be split (CoinMarketCap caps at 200)
  pub chunk_size: usize,

  /// Maximum concurrent upstream requests inside one job
  pub fetch_concurrency: usize,

  /// Written to `updated_by` on every upserted row
  pub updated_by: String,

  /// CoinGecko markets pages fetched per run
  pub markets_pages: u32,

  /// Rows requested from the gainers/losers endpoint
  pub gainers_losers_limit: usize,

  pub binance_symbols: Vec<String>,
  pub binance_intervals: Vec<String>,
  pub kyberswap_chain: String,
  pub kyberswap_pairs: Vec<QuotePair>,
}

impl Default for LoaderConfig {
  fn default() -> Self {
    Self::from_refresh(&RefreshConfig::default())
  }
}

impl LoaderConfig {
  pub fn from_refresh(refresh: &RefreshConfig) -> Self {
    Self {
      failure_policy: refresh.failure_policy,
      chunk_size: CMC_SLUG_CHUNK_SIZE,
      fetch_concurrency: refresh.fetch_concurrency.max(1),
      updated_by: UPDATED_BY.to_string(),
      markets_pages: 4,
      gainers_losers_limit: 100,
      binance_symbols: refresh.binance_symbols.clone(),
      binance_intervals: refresh.binance_intervals.clone(),
      kyberswap_chain: refresh.kyberswap_chain.clone(),
      kyberswap_pairs: refresh.kyberswap_pairs.clone(),
    }
  }

  pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
    self.failure_policy = policy;
    self
  }
}

/// Shared context for all loaders
///
/// Built once by the composition root and handed to every handler.
pub struct LoaderContext {
  pub clients: ProviderClients,
  pub store: Arc<dyn RefreshStore>,
  pub config: LoaderConfig,
  pub clock: Arc<dyn Clock>,
  pub swallowed: Arc<SwallowedFailures>,
}

impl LoaderContext {
  pub fn new(clients: ProviderClients, store: Arc<dyn RefreshStore>, config: LoaderConfig) -> Self {
    Self {
      clients,
      store,
      config,
      clock: MonotonicClock::shared(),
      swallowed: Arc::new(SwallowedFailures::new()),
    }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn now(&self) -> DateTime<Utc> {
    self.clock.now()
  }

  /// Turn a loader result into the job outcome under the configured failure policy
  pub fn settle<T: Debug>(
    &self,
    queue: &'static str,
    job: &str,
    result: LoaderResult<T>,
  ) -> JobResult<()> {
    apply_failure_policy(self.config.failure_policy, &self.swallowed, queue, job, result)
  }
}

/// Base trait for all data loaders
#[async_trait]
pub trait DataLoader: Send + Sync {
  /// The type of data this loader processes
  type Input: Send;

  /// The result type after loading
  type Output;

  /// Load data from the given input
  async fn load(&self, context: &LoaderContext, input: Self::Input) -> LoaderResult<Self::Output>;

  /// Validate input before loading
  fn validate_input(&self, _input: &Self::Input) -> LoaderResult<()> {
    Ok(())
  }

  /// Get loader name for logging/tracking
  fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_loader_config_follows_refresh_settings() {
    let refresh = RefreshConfig {
      failure_policy: FailurePolicy::Swallow,
      fetch_concurrency: 0,
      binance_symbols: vec!["SOLUSDT".to_string()],
      ..RefreshConfig::default()
    };
    let config = LoaderConfig::from_refresh(&refresh);
    assert_eq!(config.failure_policy, FailurePolicy::Swallow);
    assert_eq!(config.fetch_concurrency, 1);
    assert_eq!(config.chunk_size, 200);
    assert_eq!(config.binance_symbols, vec!["SOLUSDT".to_string()]);
    assert_eq!(config.updated_by, "coinfeed");
  }

  #[test]
  fn test_loader_config_default_propagates() {
    let config = LoaderConfig::default();
    assert_eq!(config.failure_policy, FailurePolicy::Propagate);
    let config = config.with_failure_policy(FailurePolicy::Swallow);
    assert_eq!(config.failure_policy, FailurePolicy::Swallow);
  }
}
