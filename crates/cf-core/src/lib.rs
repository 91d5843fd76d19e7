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

pub mod config;
pub mod error;

pub use config::{
  AlertConfig, Config, Environment, FailurePolicy, ProviderConfig, QuotePair, RefreshConfig,
};
pub use error::{Error, Result};

/// Upstream data providers the refresh pipeline pulls from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
  CoinMarketCap,
  CoinGecko,
  Binance,
  KyberSwap,
}

impl Provider {
  /// Default base URL for the provider's public API
  pub fn default_base_url(&self) -> &'static str {
    match self {
      Provider::CoinMarketCap => COINMARKETCAP_BASE_URL,
      Provider::CoinGecko => COINGECKO_BASE_URL,
      Provider::Binance => BINANCE_BASE_URL,
      Provider::KyberSwap => KYBERSWAP_BASE_URL,
    }
  }

  /// Default request budget (requests per minute)
  pub fn default_rate_limit(&self) -> u32 {
    match self {
      Provider::CoinMarketCap => COINMARKETCAP_RATE_LIMIT,
      Provider::CoinGecko => COINGECKO_RATE_LIMIT,
      Provider::Binance => BINANCE_RATE_LIMIT,
      Provider::KyberSwap => KYBERSWAP_RATE_LIMIT,
    }
  }
}

impl std::fmt::Display for Provider {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Provider::CoinMarketCap => write!(f, "coinmarketcap"),
      Provider::CoinGecko => write!(f, "coingecko"),
      Provider::Binance => write!(f, "binance"),
      Provider::KyberSwap => write!(f, "kyberswap"),
    }
  }
}

/// Every upstream endpoint the client knows how to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
  // CoinMarketCap
  CmcExchangeMap,
  CmcExchangeInfo,
  CmcGainersLosers,

  // CoinGecko
  CgCoinsList,
  CgCoinsMarkets,
  CgSearchTrending,

  // Binance
  BinanceKlines,

  // KyberSwap (path is prefixed with the chain name)
  KyberSwapRoutes,
}

impl Endpoint {
  pub fn provider(&self) -> Provider {
    match self {
      Endpoint::CmcExchangeMap | Endpoint::CmcExchangeInfo | Endpoint::CmcGainersLosers => {
        Provider::CoinMarketCap
      }
      Endpoint::CgCoinsList | Endpoint::CgCoinsMarkets | Endpoint::CgSearchTrending => {
        Provider::CoinGecko
      }
      Endpoint::BinanceKlines => Provider::Binance,
      Endpoint::KyberSwapRoutes => Provider::KyberSwap,
    }
  }

  pub fn path(&self) -> &'static str {
    match self {
      Endpoint::CmcExchangeMap => "/v1/exchange/map",
      Endpoint::CmcExchangeInfo => "/v1/exchange/info",
      Endpoint::CmcGainersLosers => "/v1/cryptocurrency/trending/gainers-losers",
      Endpoint::CgCoinsList => "/coins/list",
      Endpoint::CgCoinsMarkets => "/coins/markets",
      Endpoint::CgSearchTrending => "/search/trending",
      Endpoint::BinanceKlines => "/api/v3/klines",
      Endpoint::KyberSwapRoutes => "/api/v1/routes",
    }
  }
}

impl std::fmt::Display for Endpoint {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}{}", self.provider(), self.path())
  }
}

/// Base URLs
pub const COINMARKETCAP_BASE_URL: &str = "https://pro-api.coinmarketcap.com";
pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const COINGECKO_PRO_BASE_URL: &str = "https://pro-api.coingecko.com/api/v3";
pub const BINANCE_BASE_URL: &str = "https://api.binance.com";
pub const KYBERSWAP_BASE_URL: &str = "https://aggregator-api.kyberswap.com";

/// Per-provider request budgets
pub const COINMARKETCAP_RATE_LIMIT: u32 = 30; // requests per minute (basic plan)
pub const COINGECKO_RATE_LIMIT: u32 = 30; // requests per minute (demo plan)
pub const BINANCE_RATE_LIMIT: u32 = 1200; // request weight per minute
pub const KYBERSWAP_RATE_LIMIT: u32 = 60;

/// Provider page caps
pub const CMC_SLUG_CHUNK_SIZE: usize = 200;
pub const CMC_EXCHANGE_MAP_LIMIT: usize = 5000;
pub const COINGECKO_MARKETS_PAGE_SIZE: usize = 250;
pub const BINANCE_KLINES_LIMIT: usize = 1000;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_endpoint_provider_mapping() {
    assert_eq!(Endpoint::CmcExchangeInfo.provider(), Provider::CoinMarketCap);
    assert_eq!(Endpoint::CgSearchTrending.provider(), Provider::CoinGecko);
    assert_eq!(Endpoint::BinanceKlines.provider(), Provider::Binance);
    assert_eq!(Endpoint::KyberSwapRoutes.provider(), Provider::KyberSwap);
  }

  #[test]
  fn test_endpoint_display() {
    assert_eq!(Endpoint::CmcExchangeInfo.to_string(), "coinmarketcap/v1/exchange/info");
    assert_eq!(Endpoint::BinanceKlines.to_string(), "binance/api/v3/klines");
  }

  #[test]
  fn test_provider_defaults() {
    assert_eq!(Provider::Binance.default_base_url(), BINANCE_BASE_URL);
    assert_eq!(Provider::CoinGecko.default_rate_limit(), 30);
    assert!(CMC_SLUG_CHUNK_SIZE <= CMC_EXCHANGE_MAP_LIMIT);
  }
}
