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

//! Binance candlesticks.
//!
//! [`CandleLoader`] fetches one symbol/interval, resuming from the newest
//! stored candle. [`CandleSyncLoader`] fans the configured symbol×interval
//! grid out as deduplicated fetch jobs, or runs them inline when it has no
//! queue. [`CandleLoader::backfill`] pages through a historical range.

use async_trait::async_trait;
use cf_core::BINANCE_KLINES_LIMIT;
use cf_database_postgres::UpsertSummary;
use cf_database_postgres::models::{NewCandle, partition_key};
use cf_jobs::{EnqueueOutcome, JobName, Queue};
use cf_models::binance::{Kline, interval_millis};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::batch_processor::BatchProcessor;
use crate::handlers::BinanceJob;
use crate::{DataLoader, LoaderContext, LoaderError, LoaderResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandleFetchInput {
  pub symbol: String,
  pub interval: String,
  /// Open time (ms) of the first candle; defaults to the newest stored candle
  #[serde(default)]
  pub start_time: Option<i64>,
  #[serde(default)]
  pub limit: Option<usize>,
}

impl CandleFetchInput {
  pub fn new(symbol: impl Into<String>, interval: impl Into<String>) -> Self {
    Self { symbol: symbol.into(), interval: interval.into(), start_time: None, limit: None }
  }

  /// Dedup key for the fetch job of one symbol/interval
  pub fn job_id(&self) -> String {
    format!("{}:{}:{}", BinanceJob::FetchCandles.as_str(), self.symbol.to_uppercase(), self.interval)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandleFetchOutput {
  pub symbol: String,
  pub interval: String,
  pub fetched: usize,
  pub latest_open_time: Option<DateTime<Utc>>,
  pub summary: UpsertSummary,
}

pub struct CandleLoader;

impl CandleLoader {
  pub fn to_row(
    symbol: &str,
    interval: &str,
    kline: Kline,
    now: DateTime<Utc>,
    updated_by: &str,
  ) -> LoaderResult<NewCandle> {
    let timestamp = |ms: i64| {
      DateTime::<Utc>::from_timestamp_millis(ms)
        .ok_or_else(|| LoaderError::InvalidData(format!("kline time out of range: {}", ms)))
    };

    Ok(NewCandle {
      symbol: symbol.to_string(),
      timeframe: interval.to_string(),
      open_time: timestamp(kline.open_time)?,
      partition_key: partition_key(symbol, interval),
      close_time: timestamp(kline.close_time)?,
      open: kline.open,
      high: kline.high,
      low: kline.low,
      close: kline.close,
      volume: kline.volume,
      quote_volume: kline.quote_volume,
      trades: kline.trades,
      taker_buy_base_volume: kline.taker_buy_base_volume,
      taker_buy_quote_volume: kline.taker_buy_quote_volume,
      created_at: now,
      updated_at: now,
      updated_by: updated_by.to_string(),
    })
  }

  fn rows(
    context: &LoaderContext,
    symbol: &str,
    interval: &str,
    klines: Vec<Kline>,
  ) -> LoaderResult<Vec<NewCandle>> {
    let now = context.now();
    klines
      .into_iter()
      .map(|k| Self::to_row(symbol, interval, k, now, &context.config.updated_by))
      .collect()
  }

  /// Number of candles between two instants, used to size progress reporting
  pub fn expected_candles(interval: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<u64> {
    let step = interval_millis(interval)?;
    let span = (end - start).num_milliseconds().max(0);
    Some((span / step) as u64 + 1)
  }

  /// Page through `[start, end]`, upserting each page and reporting its size to `on_page`
  pub async fn backfill<F>(
    context: &LoaderContext,
    symbol: &str,
    interval: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    mut on_page: F,
  ) -> LoaderResult<CandleFetchOutput>
  where
    F: FnMut(usize) + Send,
  {
    let symbol = symbol.to_uppercase();
    let step = interval_millis(interval)
      .ok_or_else(|| LoaderError::InvalidInput(format!("unknown interval '{}'", interval)))?;
    if end < start {
      return Err(LoaderError::InvalidInput("backfill end is before its start".to_string()));
    }

    let binance = context.clients.binance();
    let end_ms = end.timestamp_millis();
    let mut cursor = start.timestamp_millis();
    let mut output = CandleFetchOutput {
      symbol: symbol.clone(),
      interval: interval.to_string(),
      ..CandleFetchOutput::default()
    };

    while cursor <= end_ms {
      let klines = binance.klines(&symbol, interval, Some(cursor), BINANCE_KLINES_LIMIT).await?;
      let page_len = klines.len();
      let Some(last_open) = klines.last().map(|k| k.open_time) else {
        break;
      };

      let in_range: Vec<Kline> = klines.into_iter().filter(|k| k.open_time <= end_ms).collect();
      let rows = Self::rows(context, &symbol, interval, in_range)?;
      if let Some(last) = rows.last() {
        output.latest_open_time = Some(last.open_time);
      }
      output.summary.merge(context.store.upsert_candles(&rows).await?);
      output.fetched += rows.len();
      on_page(rows.len());
      debug!("Backfilled {} {} candles up to {}", rows.len(), symbol, last_open);

      if page_len < BINANCE_KLINES_LIMIT {
        break;
      }
      cursor = last_open + step;
    }

    info!(
      "Backfill {} {}: {} candles ({} new)",
      symbol, interval, output.fetched, output.summary.inserted
    );
    Ok(output)
  }
}

#[async_trait]
impl DataLoader for CandleLoader {
  type Input = CandleFetchInput;
  type Output = CandleFetchOutput;

  async fn load(&self, context: &LoaderContext, input: Self::Input) -> LoaderResult<Self::Output> {
    self.validate_input(&input)?;
    let symbol = input.symbol.to_uppercase();
    let interval = input.interval;

    let start_time = match input.start_time {
      Some(start) => Some(start),
      // the newest stored candle may still have been open; fetch it again
      None => context
        .store
        .latest_open_time(&symbol, &interval)
        .await?
        .map(|t| t.timestamp_millis()),
    };
    let limit = input.limit.unwrap_or(BINANCE_KLINES_LIMIT);

    let klines = context.clients.binance().klines(&symbol, &interval, start_time, limit).await?;
    let rows = Self::rows(context, &symbol, &interval, klines)?;
    let summary = context.store.upsert_candles(&rows).await?;
    debug!(
      "{} {}: {} candles, {} new",
      symbol,
      interval,
      rows.len(),
      summary.inserted
    );

    Ok(CandleFetchOutput {
      latest_open_time: rows.last().map(|r| r.open_time),
      fetched: rows.len(),
      symbol,
      interval,
      summary,
    })
  }

  fn validate_input(&self, input: &Self::Input) -> LoaderResult<()> {
    if input.symbol.trim().is_empty() {
      return Err(LoaderError::InvalidInput("symbol is required".to_string()));
    }
    if interval_millis(&input.interval).is_none() {
      return Err(LoaderError::InvalidInput(format!("unknown interval '{}'", input.interval)));
    }
    if matches!(input.limit, Some(n) if n == 0 || n > BINANCE_KLINES_LIMIT) {
      return Err(LoaderError::InvalidInput(format!(
        "limit must be between 1 and {}",
        BINANCE_KLINES_LIMIT
      )));
    }
    Ok(())
  }

  fn name(&self) -> &'static str {
    "CandleLoader"
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandleSyncInput {
  /// Defaults to the configured symbols
  #[serde(default)]
  pub symbols: Vec<String>,
  /// Defaults to the configured intervals
  #[serde(default)]
  pub intervals: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CandleSyncOutput {
  pub pairs: usize,
  pub enqueued: usize,
  pub duplicates: usize,
  pub failed: usize,
  pub inline: UpsertSummary,
}

pub struct CandleSyncLoader {
  queue: Option<Queue>,
}

impl CandleSyncLoader {
  /// Enqueue fetch jobs on `queue`
  pub fn queued(queue: Queue) -> Self {
    Self { queue: Some(queue) }
  }

  /// Run every fetch in the current task
  pub fn inline() -> Self {
    Self { queue: None }
  }

  fn grid(context: &LoaderContext, input: CandleSyncInput) -> Vec<CandleFetchInput> {
    let symbols =
      if input.symbols.is_empty() { context.config.binance_symbols.clone() } else { input.symbols };
    let intervals =
      if input.intervals.is_empty() { context.config.binance_intervals.clone() } else { input.intervals };

    symbols
      .iter()
      .flat_map(|s| intervals.iter().map(move |i| CandleFetchInput::new(s.to_uppercase(), i.clone())))
      .collect()
  }

  async fn enqueue(queue: &Queue, grid: Vec<CandleFetchInput>) -> LoaderResult<CandleSyncOutput> {
    let mut output = CandleSyncOutput { pairs: grid.len(), ..CandleSyncOutput::default() };
    let mut last_error = None;

    for fetch in grid {
      let options = queue.defaults().clone().with_job_id(fetch.job_id());
      let payload = json!({ "symbol": fetch.symbol, "interval": fetch.interval });
      match queue.try_add_job(BinanceJob::FetchCandles.as_str(), payload, Some(options)).await {
        Ok(EnqueueOutcome::Added(_)) => output.enqueued += 1,
        Ok(EnqueueOutcome::Duplicate(id)) => {
          debug!(job_id = %id, "Candle fetch already pending");
          output.duplicates += 1;
        }
        Err(e) => {
          warn!("Failed to enqueue candle fetch {}: {}", fetch.job_id(), e);
          output.failed += 1;
          last_error = Some(e);
        }
      }
    }

    match last_error {
      Some(e) if output.failed == output.pairs => Err(e.into()),
      _ => Ok(output),
    }
  }

  async fn run_inline(
    context: &LoaderContext,
    grid: Vec<CandleFetchInput>,
  ) -> LoaderResult<CandleSyncOutput> {
    let pairs = grid.len();
    let loader = CandleLoader;
    let loader = &loader;
    let result = BatchProcessor::with_concurrency(context.config.fetch_concurrency)
      .process(grid, |fetch| loader.load(context, fetch))
      .await?;

    if result.all_failed() {
      return Err(
        result
          .first_error()
          .cloned()
          .unwrap_or_else(|| LoaderError::BatchProcessingError("every fetch failed".to_string())),
      );
    }

    let mut inline = UpsertSummary::default();
    for fetched in &result.success {
      inline.merge(fetched.summary);
    }
    Ok(CandleSyncOutput {
      pairs,
      enqueued: 0,
      duplicates: 0,
      failed: result.failure_count(),
      inline,
    })
  }
}

#[async_trait]
impl DataLoader for CandleSyncLoader {
  type Input = CandleSyncInput;
  type Output = CandleSyncOutput;

  async fn load(&self, context: &LoaderContext, input: Self::Input) -> LoaderResult<Self::Output> {
    let grid = Self::grid(context, input);
    for fetch in &grid {
      CandleLoader.validate_input(fetch)?;
    }
    if grid.is_empty() {
      info!("No Binance symbols configured");
      return Ok(CandleSyncOutput::default());
    }

    let output = match &self.queue {
      Some(queue) => Self::enqueue(queue, grid).await?,
      None => Self::run_inline(context, grid).await?,
    };
    info!(
      "Candle sync: {} pairs, {} enqueued, {} already pending, {} failed",
      output.pairs, output.enqueued, output.duplicates, output.failed
    );
    Ok(output)
  }

  fn name(&self) -> &'static str {
    "CandleSyncLoader"
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use bigdecimal::BigDecimal;
  use std::str::FromStr;

  fn kline(open_time: i64) -> Kline {
    let d = |s: &str| BigDecimal::from_str(s).unwrap();
    Kline {
      open_time,
      open: d("64000.10"),
      high: d("64500"),
      low: d("63900.5"),
      close: d("64321.01"),
      volume: d("812.345"),
      close_time: open_time + 3_599_999,
      quote_volume: d("52000000.12"),
      trades: 41_200,
      taker_buy_base_volume: d("400.1"),
      taker_buy_quote_volume: d("25600000.7"),
    }
  }

  #[test]
  fn test_row_keeps_exact_decimals_and_partition() {
    let row = CandleLoader::to_row("BTCUSDT", "1h", kline(1_717_200_000_000), Utc::now(), "coinfeed")
      .unwrap();
    assert_eq!(row.partition_key, "btc_1h");
    assert_eq!(row.open_time.timestamp_millis(), 1_717_200_000_000);
    assert_eq!(row.close, BigDecimal::from_str("64321.01").unwrap());
  }

  #[test]
  fn test_job_id_is_stable_per_pair() {
    let a = CandleFetchInput::new("btcusdt", "1h");
    let b = CandleFetchInput { start_time: Some(1), ..CandleFetchInput::new("BTCUSDT", "1h") };
    assert_eq!(a.job_id(), "binance:fetch:candles:BTCUSDT:1h");
    assert_eq!(a.job_id(), b.job_id());
  }

  #[test]
  fn test_fetch_input_validation() {
    assert!(CandleLoader.validate_input(&CandleFetchInput::new("BTCUSDT", "1h")).is_ok());
    assert!(CandleLoader.validate_input(&CandleFetchInput::new("", "1h")).is_err());
    assert!(CandleLoader.validate_input(&CandleFetchInput::new("BTCUSDT", "7m")).is_err());
    let too_many = CandleFetchInput { limit: Some(5000), ..CandleFetchInput::new("BTCUSDT", "1h") };
    assert!(CandleLoader.validate_input(&too_many).is_err());
  }

  #[test]
  fn test_expected_candles() {
    let start = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
    let end = DateTime::<Utc>::from_timestamp(86_400, 0).unwrap();
    assert_eq!(CandleLoader::expected_candles("1h", start, end), Some(25));
    assert_eq!(CandleLoader::expected_candles("9x", start, end), None);
  }
}
