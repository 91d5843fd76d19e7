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

use crate::endpoints::{
  DirectLimiter, binance::BinanceEndpoints, coingecko::CoinGeckoEndpoints,
  coinmarketcap::CoinMarketCapEndpoints, kyberswap::KyberSwapEndpoints,
};
use crate::transport::Transport;
use cf_core::{Config, Error, Provider, ProviderConfig, Result};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Transport plus request budget for one provider
#[derive(Clone)]
struct ProviderHandle {
  transport: Arc<Transport>,
  rate_limiter: Arc<DirectLimiter>,
}

impl ProviderHandle {
  fn new(provider: Provider, config: &ProviderConfig, timeout_secs: u64) -> Result<Self> {
    let per_minute = NonZeroU32::new(config.rate_limit_per_minute)
      .ok_or_else(|| Error::Config(format!("{} rate limit must be non-zero", provider)))?;
    let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));
    let transport = Arc::new(Transport::new(provider, config, timeout_secs)?);

    Ok(Self { transport, rate_limiter })
  }
}

/// Clients for every upstream provider, built once at startup
///
/// Cloning is cheap and clones share the per-provider request budgets, so
/// every handler that talks to one provider draws from the same quota.
///
/// # Examples
///
/// ```ignore
/// use cf_client::ProviderClients;
/// use cf_core::Config;
///
/// let clients = ProviderClients::new(&Config::from_env()?)?;
/// let candles = clients.binance().klines("BTCUSDT", "1h", None, 500).await?;
/// ```
#[derive(Clone)]
pub struct ProviderClients {
  coinmarketcap: ProviderHandle,
  coingecko: ProviderHandle,
  binance: ProviderHandle,
  kyberswap: ProviderHandle,
}

impl ProviderClients {
  /// Create clients for every provider
  ///
  /// # Errors
  ///
  /// Returns an error if an HTTP client cannot be created or a budget is zero.
  pub fn new(config: &Config) -> Result<Self> {
    let handle = |p: Provider| ProviderHandle::new(p, config.provider(p), config.timeout_secs);

    Ok(Self {
      coinmarketcap: handle(Provider::CoinMarketCap)?,
      coingecko: handle(Provider::CoinGecko)?,
      binance: handle(Provider::Binance)?,
      kyberswap: handle(Provider::KyberSwap)?,
    })
  }

  /// Exchange map, exchange info and gainers/losers
  pub fn coinmarketcap(&self) -> CoinMarketCapEndpoints {
    CoinMarketCapEndpoints::new(
      self.coinmarketcap.transport.clone(),
      self.coinmarketcap.rate_limiter.clone(),
    )
  }

  /// Coin list, markets and trending search
  pub fn coingecko(&self) -> CoinGeckoEndpoints {
    CoinGeckoEndpoints::new(self.coingecko.transport.clone(), self.coingecko.rate_limiter.clone())
  }

  /// Spot klines
  pub fn binance(&self) -> BinanceEndpoints {
    BinanceEndpoints::new(self.binance.transport.clone(), self.binance.rate_limiter.clone())
  }

  /// Aggregator route quotes
  pub fn kyberswap(&self) -> KyberSwapEndpoints {
    KyberSwapEndpoints::new(self.kyberswap.transport.clone(), self.kyberswap.rate_limiter.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::endpoints::EndpointBase;

  #[test]
  fn test_clients_from_test_config() {
    let clients = ProviderClients::new(&Config::for_tests("http://127.0.0.1:1")).unwrap();
    assert_eq!(clients.binance().transport().provider(), Provider::Binance);
    assert_eq!(clients.coingecko().transport().base_url(), "http://127.0.0.1:1");
  }

  #[test]
  fn test_zero_budget_rejected() {
    let mut config = Config::for_tests("http://127.0.0.1:1");
    config.kyberswap.rate_limit_per_minute = 0;
    assert!(matches!(ProviderClients::new(&config), Err(Error::Config(_))));
  }
}
