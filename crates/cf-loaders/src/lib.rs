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

//! # cf-loaders
//!
//! Fetch-and-upsert handlers behind coinfeed's refresh queues.
//!
//! Each domain has a name enum, a [`JobHandler`](cf_jobs::JobHandler) and one
//! or more [`DataLoader`]s:
//! - `exchange`: CoinMarketCap exchange metadata, chunked by 200 slugs
//! - `coingecko-asset`: CoinGecko coin list and market pages
//! - `asset-trending`: trending searches and 24h gainers/losers
//! - `binance`: candlesticks, with a sync job that fans out per symbol and interval
//! - `token-price`: KyberSwap route quotes
//!
//! Errors pass through the configured [`FailurePolicy`](cf_core::FailurePolicy)
//! before they reach the worker.

pub mod asset_trending_loader;
pub mod batch_processor;
pub mod candle_loader;
pub mod coingecko_asset_loader;
pub mod error;
pub mod exchange_loader;
pub mod handlers;
pub mod loader;
pub mod policy;
pub mod registry;
pub mod token_price_loader;

// Re-export commonly used types
pub use batch_processor::{BatchConfig, BatchProcessor, BatchResult};
pub use error::{LoaderError, LoaderResult};
pub use loader::{DataLoader, LoaderConfig, LoaderContext};
pub use policy::SwallowedFailures;
pub use registry::{Domain, run_once};

// Re-export loaders
pub use asset_trending_loader::{GainersLosersLoader, TrendingLoader};
pub use candle_loader::{CandleFetchInput, CandleLoader, CandleSyncInput, CandleSyncLoader};
pub use coingecko_asset_loader::{CoingeckoListLoader, CoingeckoMarketsInput, CoingeckoMarketsLoader};
pub use exchange_loader::{ExchangeLoader, ExchangeLoaderInput, ExchangeLoaderOutput};
pub use handlers::{AssetTrendingJob, BinanceJob, CoingeckoAssetJob, ExchangeJob, TokenPriceJob};
pub use token_price_loader::{TokenPriceInput, TokenPriceLoader};

// Prelude for convenient imports
pub mod prelude {
  pub use crate::{
    DataLoader, Domain, LoaderConfig, LoaderContext, LoaderError, LoaderResult, run_once,
  };
}
