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
use cf_core::{CMC_EXCHANGE_MAP_LIMIT, Endpoint, Error, Provider, Result};
use cf_models::coinmarketcap::{
  CmcExchangeInfo, CmcExchangeMapItem, CmcGainersLosersItem, CmcResponse,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

/// CoinMarketCap Pro endpoints
pub struct CoinMarketCapEndpoints {
  transport: Arc<Transport>,
  rate_limiter: Arc<DirectLimiter>,
}

impl_endpoint_base!(CoinMarketCapEndpoints);

impl CoinMarketCapEndpoints {
  /// Active exchanges with their numeric id and slug
  #[instrument(skip(self))]
  pub async fn exchange_map(&self) -> Result<Vec<CmcExchangeMapItem>> {
    let params = [
      ("listing_status", "active".to_string()),
      ("limit", CMC_EXCHANGE_MAP_LIMIT.to_string()),
    ];
    self.fetch(Endpoint::CmcExchangeMap, &params).await
  }

  /// Exchange metadata for up to 200 slugs, keyed by slug
  ///
  /// # Arguments
  ///
  /// * `slugs` - Exchange slugs, e.g. `["binance", "coinbase-exchange"]`
  #[instrument(skip(self, slugs), fields(count = slugs.len()))]
  pub async fn exchange_info(&self, slugs: &[String]) -> Result<HashMap<String, CmcExchangeInfo>> {
    if slugs.is_empty() {
      return Ok(HashMap::new());
    }
    let params = [("slug", slugs.join(","))];
    self.fetch(Endpoint::CmcExchangeInfo, &params).await
  }

  /// 24h top movers, both directions, sorted by percent change
  #[instrument(skip(self))]
  pub async fn gainers_losers(&self, limit: usize) -> Result<Vec<CmcGainersLosersItem>> {
    let params = [
      ("start", "1".to_string()),
      ("limit", limit.to_string()),
      ("time_period", "24h".to_string()),
      ("convert", "USD".to_string()),
    ];
    self.fetch(Endpoint::CmcGainersLosers, &params).await
  }

  async fn fetch<T: DeserializeOwned>(&self, endpoint: Endpoint, params: &[(&str, String)]) -> Result<T> {
    self.wait_for_rate_limit().await?;

    let response = self.transport.get_json::<CmcResponse<T>>(endpoint, None, params).await?;
    let envelope = response.data;

    if !envelope.status.is_ok() {
      return Err(Error::Api {
        provider: Provider::CoinMarketCap,
        status: response.status,
        message: format!(
          "error_code {}: {}",
          envelope.status.error_code,
          envelope.status.error_message.unwrap_or_default()
        ),
      });
    }

    envelope
      .data
      .ok_or_else(|| Error::InvalidResponse(format!("{} returned no data", endpoint)))
  }
}
