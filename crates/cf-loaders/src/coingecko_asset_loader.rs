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

use async_trait::async_trait;
use cf_core::COINGECKO_MARKETS_PAGE_SIZE;
use cf_database_postgres::UpsertSummary;
use cf_database_postgres::models::{NewCoingeckoListing, NewCoingeckoMarket};
use cf_models::coingecko::{CgCoinListItem, CgMarketRow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::batch_processor::BatchProcessor;
use crate::{DataLoader, LoaderContext, LoaderError, LoaderResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoingeckoAssetOutput {
  pub fetched: usize,
  pub summary: UpsertSummary,
}

/// Coin list with contract addresses per platform
pub struct CoingeckoListLoader;

impl CoingeckoListLoader {
  fn to_row(
    coin: CgCoinListItem,
    now: DateTime<Utc>,
    updated_by: &str,
  ) -> LoaderResult<NewCoingeckoListing> {
    // platforms without a contract address carry no information
    let platforms: serde_json::Map<String, serde_json::Value> = coin
      .platforms
      .into_iter()
      .filter_map(|(platform, address)| {
        address.filter(|a| !a.is_empty()).map(|a| (platform, serde_json::Value::String(a)))
      })
      .collect();

    Ok(NewCoingeckoListing {
      coingecko_id: coin.id,
      symbol: coin.symbol,
      name: coin.name,
      platforms: serde_json::Value::Object(platforms),
      created_at: now,
      updated_at: now,
      updated_by: updated_by.to_string(),
    })
  }
}

#[async_trait]
impl DataLoader for CoingeckoListLoader {
  type Input = ();
  type Output = CoingeckoAssetOutput;

  async fn load(&self, context: &LoaderContext, _input: ()) -> LoaderResult<Self::Output> {
    let coins = context.clients.coingecko().coins_list().await?;
    let now = context.now();
    let rows = coins
      .into_iter()
      .filter(|coin| !coin.id.is_empty())
      .map(|coin| Self::to_row(coin, now, &context.config.updated_by))
      .collect::<LoaderResult<Vec<_>>>()?;

    let summary = context.store.upsert_listings(&rows).await?;
    info!("CoinGecko listings: {} inserted, {} updated", summary.inserted, summary.updated);
    Ok(CoingeckoAssetOutput { fetched: rows.len(), summary })
  }

  fn name(&self) -> &'static str {
    "CoingeckoListLoader"
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoingeckoMarketsInput {
  /// Pages to fetch, defaults to the configured page count
  #[serde(default)]
  pub pages: Option<u32>,
  #[serde(default)]
  pub per_page: Option<usize>,
}

/// Market snapshots, paged by market cap
pub struct CoingeckoMarketsLoader;

impl CoingeckoMarketsLoader {
  fn to_row(row: CgMarketRow, now: DateTime<Utc>, updated_by: &str) -> NewCoingeckoMarket {
    NewCoingeckoMarket {
      coingecko_id: row.id,
      symbol: row.symbol,
      name: row.name,
      avatar: row.image,
      current_price: row.current_price,
      market_cap: row.market_cap,
      market_cap_rank: row.market_cap_rank.and_then(|r| i32::try_from(r).ok()),
      total_volume: row.total_volume,
      price_change_24h: row.price_change_percentage_24h,
      created_at: now,
      updated_at: now,
      updated_by: updated_by.to_string(),
    }
  }
}

#[async_trait]
impl DataLoader for CoingeckoMarketsLoader {
  type Input = CoingeckoMarketsInput;
  type Output = CoingeckoAssetOutput;

  async fn load(&self, context: &LoaderContext, input: Self::Input) -> LoaderResult<Self::Output> {
    self.validate_input(&input)?;
    let pages = input.pages.unwrap_or(context.config.markets_pages);
    let per_page = input.per_page.unwrap_or(COINGECKO_MARKETS_PAGE_SIZE);
    let coingecko = context.clients.coingecko();
    let coingecko = &coingecko;

    let result = BatchProcessor::with_concurrency(context.config.fetch_concurrency)
      .process((1..=pages).collect(), |page| async move {
        coingecko.coins_markets(page, per_page).await.map_err(LoaderError::from)
      })
      .await?;

    if result.all_failed() {
      return Err(
        result
          .first_error()
          .cloned()
          .unwrap_or_else(|| LoaderError::BatchProcessingError("every page failed".to_string())),
      );
    }
    if result.failure_count() > 0 {
      warn!("{} of {} market pages failed", result.failure_count(), pages);
    }

    let now = context.now();
    let rows: Vec<NewCoingeckoMarket> = result
      .success
      .into_iter()
      .flatten()
      .map(|row| Self::to_row(row, now, &context.config.updated_by))
      .collect();

    let summary = context.store.upsert_markets(&rows).await?;
    info!("CoinGecko markets: {} inserted, {} updated", summary.inserted, summary.updated);
    Ok(CoingeckoAssetOutput { fetched: rows.len(), summary })
  }

  fn validate_input(&self, input: &Self::Input) -> LoaderResult<()> {
    if input.pages == Some(0) {
      return Err(LoaderError::InvalidInput("pages must be at least 1".to_string()));
    }
    if matches!(input.per_page, Some(n) if n == 0 || n > COINGECKO_MARKETS_PAGE_SIZE) {
      return Err(LoaderError::InvalidInput(format!(
        "per_page must be between 1 and {}",
        COINGECKO_MARKETS_PAGE_SIZE
      )));
    }
    Ok(())
  }

  fn name(&self) -> &'static str {
    "CoingeckoMarketsLoader"
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  #[test]
  fn test_listing_drops_empty_platforms() {
    let coin = CgCoinListItem {
      id: "usd-coin".to_string(),
      symbol: "usdc".to_string(),
      name: "USDC".to_string(),
      platforms: HashMap::from([
        ("ethereum".to_string(), Some("0xa0b8".to_string())),
        ("tron".to_string(), None),
        ("solana".to_string(), Some(String::new())),
      ]),
    };
    let row = CoingeckoListLoader::to_row(coin, Utc::now(), "coinfeed").unwrap();
    assert_eq!(row.platforms, serde_json::json!({"ethereum": "0xa0b8"}));
  }

  #[test]
  fn test_market_image_becomes_avatar() {
    let market = CgMarketRow {
      id: "bitcoin".to_string(),
      symbol: "btc".to_string(),
      name: "Bitcoin".to_string(),
      image: Some("https://assets.coingecko.com/coins/images/1/large/bitcoin.png".to_string()),
      current_price: Some(64000.0),
      market_cap: None,
      market_cap_rank: Some(1),
      total_volume: None,
      price_change_percentage_24h: Some(-1.5),
      circulating_supply: None,
      last_updated: None,
    };
    let row = CoingeckoMarketsLoader::to_row(market, Utc::now(), "coinfeed");
    assert_eq!(row.avatar.as_deref(), Some("https://assets.coingecko.com/coins/images/1/large/bitcoin.png"));
    assert_eq!(row.market_cap_rank, Some(1));
    assert_eq!(row.price_change_24h, Some(-1.5));
  }

  #[test]
  fn test_markets_input_bounds() {
    let loader = CoingeckoMarketsLoader;
    assert!(loader.validate_input(&CoingeckoMarketsInput::default()).is_ok());
    assert!(loader.validate_input(&CoingeckoMarketsInput { pages: Some(0), per_page: None }).is_err());
    assert!(
      loader.validate_input(&CoingeckoMarketsInput { pages: None, per_page: Some(500) }).is_err()
    );
  }
}
