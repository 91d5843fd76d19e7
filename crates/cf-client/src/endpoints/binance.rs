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

use super::{DirectLimiter, EndpointBase, impl_endpoint_base};
use crate::transport::Transport;
use cf_core::{BINANCE_KLINES_LIMIT, Endpoint, Result};
use cf_models::binance::Kline;
use std::sync::Arc;
use tracing::instrument;

/// Binance spot market-data endpoints
pub struct BinanceEndpoints {
  transport: Arc<Transport>,
  rate_limiter: Arc<DirectLimiter>,
}

impl_endpoint_base!(BinanceEndpoints);

impl BinanceEndpoints {
  /// Candlesticks for a symbol
  ///
  /// # Arguments
  ///
  /// * `symbol` - Trading pair, e.g. "BTCUSDT"
  /// * `interval` - Kline interval, e.g. "1m", "1h", "1d"
  /// * `start_time` - Open time (ms since epoch) of the first candle, or latest candles when `None`
  /// * `limit` - Number of candles, capped at 1000
  #[instrument(skip(self))]
  pub async fn klines(
    &self,
    symbol: &str,
    interval: &str,
    start_time: Option<i64>,
    limit: usize,
  ) -> Result<Vec<Kline>> {
    self.wait_for_rate_limit().await?;

    let mut params = vec![
      ("symbol", symbol.to_uppercase()),
      ("interval", interval.to_string()),
      ("limit", limit.clamp(1, BINANCE_KLINES_LIMIT).to_string()),
    ];
    if let Some(start) = start_time {
      params.push(("startTime", start.to_string()));
    }

    Ok(self.transport.get_json(Endpoint::BinanceKlines, None, &params).await?.data)
  }
}
