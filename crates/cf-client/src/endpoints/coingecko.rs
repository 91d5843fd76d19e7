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
use cf_core::{Endpoint, Result};
use cf_models::coingecko::{CgCoinListItem, CgMarketRow, CgTrendingResponse};
use std::sync::Arc;
use tracing::instrument;

/// CoinGecko endpoints
pub struct CoinGeckoEndpoints {
  transport: Arc<Transport>,
  rate_limiter: Arc<DirectLimiter>,
}

impl_endpoint_base!(CoinGeckoEndpoints);

impl CoinGeckoEndpoints {
  /// Every listed coin with its per-chain contract addresses
  #[instrument(skip(self))]
  pub async fn coins_list(&self) -> Result<Vec<CgCoinListItem>> {
    self.wait_for_rate_limit().await?;

    let params = [("include_platform", "true".to_string())];
    Ok(self.transport.get_json(Endpoint::CgCoinsList, None, &params).await?.data)
  }

  /// One page of USD market data ordered by market cap
  ///
  /// # Arguments
  ///
  /// * `page` - 1-based page number
  /// * `per_page` - Rows per page, capped by the provider at 250
  #[instrument(skip(self))]
  pub async fn coins_markets(&self, page: u32, per_page: usize) -> Result<Vec<CgMarketRow>> {
    self.wait_for_rate_limit().await?;

    let params = [
      ("vs_currency", "usd".to_string()),
      ("order", "market_cap_desc".to_string()),
      ("per_page", per_page.min(cf_core::COINGECKO_MARKETS_PAGE_SIZE).to_string()),
      ("page", page.max(1).to_string()),
    ];
    Ok(self.transport.get_json(Endpoint::CgCoinsMarkets, None, &params).await?.data)
  }

  /// Top searched coins over the last 24 hours
  #[instrument(skip(self))]
  pub async fn search_trending(&self) -> Result<CgTrendingResponse> {
    self.wait_for_rate_limit().await?;

    Ok(self.transport.get_json(Endpoint::CgSearchTrending, None, &[]).await?.data)
  }
}
