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

//! Job names per queue and the handlers that dispatch on them.
//!
//! Each handler matches exhaustively on its queue's name enum, so adding a job
//! name without a branch does not compile.

use async_trait::async_trait;
use cf_jobs::{Job, JobHandler, JobName, JobResult, Queue};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::asset_trending_loader::{GainersLosersLoader, TrendingLoader};
use crate::candle_loader::{CandleLoader, CandleSyncLoader};
use crate::coingecko_asset_loader::{CoingeckoListLoader, CoingeckoMarketsLoader};
use crate::exchange_loader::ExchangeLoader;
use crate::token_price_loader::TokenPriceLoader;
use crate::{DataLoader, LoaderContext};

cf_jobs::job_names! {
  pub enum ExchangeJob in "exchange" {
    FetchData => "exchange:fetch:data",
  }
}

cf_jobs::job_names! {
  pub enum CoingeckoAssetJob in "coingecko-asset" {
    FetchList => "coingecko-asset:fetch:list",
    FetchMarkets => "coingecko-asset:fetch:markets",
  }
}

cf_jobs::job_names! {
  pub enum AssetTrendingJob in "asset-trending" {
    FetchTrending => "asset-trending:fetch:trending",
    FetchGainersLosers => "asset-trending:fetch:gainers-losers",
  }
}

cf_jobs::job_names! {
  pub enum BinanceJob in "binance" {
    FetchCandles => "binance:fetch:candles",
    /// Fans out one `FetchCandles` job per configured symbol and interval
    SyncCandles => "binance:sync:candles",
  }
}

cf_jobs::job_names! {
  pub enum TokenPriceJob in "token-price" {
    FetchQuotes => "token-price:fetch:quotes",
  }
}

/// Decode a job payload; `null` means every field takes its default
pub fn decode_payload<T: DeserializeOwned + Default>(job: &Job) -> JobResult<T> {
  if job.payload.is_null() {
    return Ok(T::default());
  }
  job.payload_as()
}

pub struct ExchangeHandler {
  context: Arc<LoaderContext>,
}

impl ExchangeHandler {
  pub fn new(context: Arc<LoaderContext>) -> Self {
    Self { context }
  }
}

#[async_trait]
impl JobHandler for ExchangeHandler {
  type Name = ExchangeJob;

  async fn handle(&self, name: ExchangeJob, job: &Job) -> JobResult<()> {
    let result = match name {
      ExchangeJob::FetchData => ExchangeLoader.load(&self.context, decode_payload(job)?).await,
    };
    self.context.settle(ExchangeJob::QUEUE, name.as_str(), result)
  }
}

pub struct CoingeckoAssetHandler {
  context: Arc<LoaderContext>,
}

impl CoingeckoAssetHandler {
  pub fn new(context: Arc<LoaderContext>) -> Self {
    Self { context }
  }
}

#[async_trait]
impl JobHandler for CoingeckoAssetHandler {
  type Name = CoingeckoAssetJob;

  async fn handle(&self, name: CoingeckoAssetJob, job: &Job) -> JobResult<()> {
    let result = match name {
      CoingeckoAssetJob::FetchList => CoingeckoListLoader.load(&self.context, ()).await,
      CoingeckoAssetJob::FetchMarkets => {
        CoingeckoMarketsLoader.load(&self.context, decode_payload(job)?).await
      }
    };
    self.context.settle(CoingeckoAssetJob::QUEUE, name.as_str(), result)
  }
}

pub struct AssetTrendingHandler {
  context: Arc<LoaderContext>,
}

impl AssetTrendingHandler {
  pub fn new(context: Arc<LoaderContext>) -> Self {
    Self { context }
  }
}

#[async_trait]
impl JobHandler for AssetTrendingHandler {
  type Name = AssetTrendingJob;

  async fn handle(&self, name: AssetTrendingJob, job: &Job) -> JobResult<()> {
    let result = match name {
      AssetTrendingJob::FetchTrending => TrendingLoader.load(&self.context, ()).await,
      AssetTrendingJob::FetchGainersLosers => {
        GainersLosersLoader.load(&self.context, decode_payload(job)?).await
      }
    };
    self.context.settle(AssetTrendingJob::QUEUE, name.as_str(), result)
  }
}

pub struct BinanceHandler {
  context: Arc<LoaderContext>,
  sync: CandleSyncLoader,
}

impl BinanceHandler {
  /// Sync jobs enqueue their fetches on `queue`
  pub fn new(context: Arc<LoaderContext>, queue: Queue) -> Self {
    Self { context, sync: CandleSyncLoader::queued(queue) }
  }

  /// Sync jobs run their fetches in place
  pub fn inline(context: Arc<LoaderContext>) -> Self {
    Self { context, sync: CandleSyncLoader::inline() }
  }
}

#[async_trait]
impl JobHandler for BinanceHandler {
  type Name = BinanceJob;

  async fn handle(&self, name: BinanceJob, job: &Job) -> JobResult<()> {
    match name {
      BinanceJob::FetchCandles => {
        let result = CandleLoader.load(&self.context, job.payload_as()?).await;
        self.context.settle(BinanceJob::QUEUE, name.as_str(), result)
      }
      BinanceJob::SyncCandles => {
        let result = self.sync.load(&self.context, decode_payload(job)?).await;
        self.context.settle(BinanceJob::QUEUE, name.as_str(), result)
      }
    }
  }
}

pub struct TokenPriceHandler {
  context: Arc<LoaderContext>,
}

impl TokenPriceHandler {
  pub fn new(context: Arc<LoaderContext>) -> Self {
    Self { context }
  }
}

#[async_trait]
impl JobHandler for TokenPriceHandler {
  type Name = TokenPriceJob;

  async fn handle(&self, name: TokenPriceJob, job: &Job) -> JobResult<()> {
    let result = match name {
      TokenPriceJob::FetchQuotes => TokenPriceLoader.load(&self.context, decode_payload(job)?).await,
    };
    self.context.settle(TokenPriceJob::QUEUE, name.as_str(), result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::candle_loader::CandleFetchInput;
  use cf_jobs::{JobError, JobOptions};
  use chrono::Utc;
  use std::str::FromStr;

  #[test]
  fn test_names_round_trip_and_belong_to_their_queue() {
    for name in BinanceJob::ALL {
      assert_eq!(BinanceJob::from_str(name.as_str()).unwrap(), *name);
      assert!(name.as_str().starts_with(BinanceJob::QUEUE));
    }
    assert_eq!(CoingeckoAssetJob::ALL.len(), 2);
    assert_eq!(AssetTrendingJob::FetchGainersLosers.to_string(), "asset-trending:fetch:gainers-losers");
  }

  #[test]
  fn test_unknown_name_is_rejected() {
    let err = ExchangeJob::from_str("exchange:fetch:everything").unwrap_err();
    assert!(matches!(err, JobError::UnknownJobName { .. }));
  }

  #[test]
  fn test_null_payload_decodes_to_default() {
    let job = Job::new("binance", "binance:sync:candles", serde_json::Value::Null, JobOptions::default(), Utc::now());
    let input: crate::candle_loader::CandleSyncInput = decode_payload(&job).unwrap();
    assert!(input.symbols.is_empty());
  }

  #[test]
  fn test_fetch_payload_requires_symbol() {
    let job = Job::new(
      "binance",
      "binance:fetch:candles",
      serde_json::json!({"interval": "1h"}),
      JobOptions::default(),
      Utc::now(),
    );
    let err = job.payload_as::<CandleFetchInput>().unwrap_err();
    assert!(err.is_permanent());
  }
}
