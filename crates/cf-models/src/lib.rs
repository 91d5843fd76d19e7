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

//! # cf-models
//!
//! Data models for the upstream market-data APIs consumed by coinfeed.
//!
//! Each provider gets its own module. Field names follow the provider's JSON;
//! renaming into the internal schema happens in the loaders, not here.
//!
//! ## Usage
//!
//! ```ignore
//! use cf_models::coinmarketcap::{CmcResponse, CmcExchangeInfo};
//!
//! let info: CmcResponse<HashMap<String, CmcExchangeInfo>> = serde_json::from_str(&body)?;
//! ```

#![warn(clippy::all)]

pub mod binance;
pub mod coingecko;
pub mod coinmarketcap;
pub mod kyberswap;

pub use binance::{BinanceError, Kline};
pub use coingecko::{CgCoinListItem, CgMarketRow, CgTrendingCoin, CgTrendingResponse};
pub use coinmarketcap::{
  CmcExchangeInfo, CmcExchangeMapItem, CmcGainersLosersItem, CmcQuote, CmcResponse, CmcStatus,
};
pub use kyberswap::{KyberRouteData, KyberRouteResponse, KyberRouteSummary};
