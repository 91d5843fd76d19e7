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

//! In-process store with the same upsert semantics as Postgres.
//!
//! Used when no `DATABASE_URL` is configured and by handler tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::models::{
  AssetTrending, Candle, CoingeckoAsset, Exchange, NewAssetTrending, NewCandle,
  NewCoingeckoListing, NewCoingeckoMarket, NewExchange, NewTokenQuote, TokenQuote, TrendingType,
};
use crate::repository::{
  AssetTrendingRepository, CandleRepository, CoingeckoAssetRepository, ExchangeRepository,
  RepositoryResult, TokenQuoteRepository, UpsertSummary,
};

type CandleKey = (String, String, DateTime<Utc>);
type QuoteKey = (String, String, String);

#[derive(Debug, Default)]
struct Tables {
  next_id: i32,
  exchanges: HashMap<String, Exchange>,
  assets: HashMap<String, CoingeckoAsset>,
  trending: HashMap<String, AssetTrending>,
  candles: HashMap<CandleKey, Candle>,
  quotes: HashMap<QuoteKey, TokenQuote>,
}

impl Tables {
  fn next_id(&mut self) -> i32 {
    self.next_id += 1;
    self.next_id
  }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn tables(&self) -> MutexGuard<'_, Tables> {
    self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  pub fn exchanges(&self) -> Vec<Exchange> {
    let mut rows: Vec<Exchange> = self.tables().exchanges.values().cloned().collect();
    rows.sort_by_key(|r| r.id);
    rows
  }

  pub fn candle_count(&self) -> usize {
    self.tables().candles.len()
  }
}

#[async_trait]
impl ExchangeRepository for MemoryStore {
  async fn upsert_exchanges(&self, rows: &[NewExchange]) -> RepositoryResult<UpsertSummary> {
    let mut tables = self.tables();
    let mut summary = UpsertSummary::default();
    for row in rows {
      let (id, created_at) = match tables.exchanges.get(&row.slug) {
        Some(existing) => {
          summary.updated += 1;
          (existing.id, existing.created_at)
        }
        None => {
          summary.inserted += 1;
          (tables.next_id(), row.created_at)
        }
      };
      tables.exchanges.insert(row.slug.clone(), row.clone().into_row(id, created_at));
    }
    Ok(summary)
  }

  async fn find_exchange(&self, slug: &str) -> RepositoryResult<Option<Exchange>> {
    Ok(self.tables().exchanges.get(slug).cloned())
  }

  async fn count_exchanges(&self) -> RepositoryResult<i64> {
    Ok(self.tables().exchanges.len() as i64)
  }
}

#[async_trait]
impl CoingeckoAssetRepository for MemoryStore {
  async fn upsert_listings(&self, rows: &[NewCoingeckoListing]) -> RepositoryResult<UpsertSummary> {
    let mut tables = self.tables();
    let mut summary = UpsertSummary::default();
    for row in rows {
      if let Some(existing) = tables.assets.get_mut(&row.coingecko_id) {
        existing.symbol = row.symbol.clone();
        existing.name = row.name.clone();
        existing.platforms = row.platforms.clone();
        existing.updated_at = row.updated_at;
        existing.updated_by = row.updated_by.clone();
        summary.updated += 1;
        continue;
      }
      let id = tables.next_id();
      tables.assets.insert(
        row.coingecko_id.clone(),
        CoingeckoAsset {
          id,
          coingecko_id: row.coingecko_id.clone(),
          symbol: row.symbol.clone(),
          name: row.name.clone(),
          platforms: row.platforms.clone(),
          avatar: None,
          current_price: None,
          market_cap: None,
          market_cap_rank: None,
          total_volume: None,
          price_change_24h: None,
          created_at: row.created_at,
          updated_at: row.updated_at,
          updated_by: row.updated_by.clone(),
        },
      );
      summary.inserted += 1;
    }
    Ok(summary)
  }

  async fn upsert_markets(&self, rows: &[NewCoingeckoMarket]) -> RepositoryResult<UpsertSummary> {
    let mut tables = self.tables();
    let mut summary = UpsertSummary::default();
    for row in rows {
      let (id, created_at, platforms) = match tables.assets.get(&row.coingecko_id) {
        Some(existing) => {
          summary.updated += 1;
          (existing.id, existing.created_at, existing.platforms.clone())
        }
        None => {
          summary.inserted += 1;
          (tables.next_id(), row.created_at, serde_json::json!({}))
        }
      };
      tables.assets.insert(
        row.coingecko_id.clone(),
        CoingeckoAsset {
          id,
          coingecko_id: row.coingecko_id.clone(),
          symbol: row.symbol.clone(),
          name: row.name.clone(),
          platforms,
          avatar: row.avatar.clone(),
          current_price: row.current_price,
          market_cap: row.market_cap,
          market_cap_rank: row.market_cap_rank,
          total_volume: row.total_volume,
          price_change_24h: row.price_change_24h,
          created_at,
          updated_at: row.updated_at,
          updated_by: row.updated_by.clone(),
        },
      );
    }
    Ok(summary)
  }

  async fn find_asset(&self, coingecko_id: &str) -> RepositoryResult<Option<CoingeckoAsset>> {
    Ok(self.tables().assets.get(coingecko_id).cloned())
  }

  async fn count_assets(&self) -> RepositoryResult<i64> {
    Ok(self.tables().assets.len() as i64)
  }
}

#[async_trait]
impl AssetTrendingRepository for MemoryStore {
  async fn upsert_trending(&self, row: &NewAssetTrending) -> RepositoryResult<UpsertSummary> {
    let mut tables = self.tables();
    let (id, created_at, summary) = match tables.trending.get(&row.trending_type) {
      Some(existing) => (existing.id, existing.created_at, UpsertSummary { inserted: 0, updated: 1 }),
      None => (tables.next_id(), row.created_at, UpsertSummary { inserted: 1, updated: 0 }),
    };
    tables.trending.insert(
      row.trending_type.clone(),
      AssetTrending {
        id,
        trending_type: row.trending_type.clone(),
        source: row.source.clone(),
        assets: row.assets.clone(),
        created_at,
        updated_at: row.updated_at,
        updated_by: row.updated_by.clone(),
      },
    );
    Ok(summary)
  }

  async fn find_trending(&self, kind: TrendingType) -> RepositoryResult<Option<AssetTrending>> {
    Ok(self.tables().trending.get(kind.as_str()).cloned())
  }
}

#[async_trait]
impl CandleRepository for MemoryStore {
  async fn upsert_candles(&self, rows: &[NewCandle]) -> RepositoryResult<UpsertSummary> {
    let mut tables = self.tables();
    let mut summary = UpsertSummary::default();
    for row in rows {
      let key = (row.symbol.clone(), row.timeframe.clone(), row.open_time);
      let mut candle = Candle::from(row.clone());
      match tables.candles.get(&key) {
        Some(existing) => {
          candle.created_at = existing.created_at;
          summary.updated += 1;
        }
        None => summary.inserted += 1,
      }
      tables.candles.insert(key, candle);
    }
    Ok(summary)
  }

  async fn latest_open_time(
    &self,
    symbol: &str,
    timeframe: &str,
  ) -> RepositoryResult<Option<DateTime<Utc>>> {
    Ok(
      self
        .tables()
        .candles
        .values()
        .filter(|c| c.symbol == symbol && c.timeframe == timeframe)
        .map(|c| c.open_time)
        .max(),
    )
  }

  async fn find_candles(
    &self,
    symbol: &str,
    timeframe: &str,
    limit: i64,
  ) -> RepositoryResult<Vec<Candle>> {
    let mut candles: Vec<Candle> = self
      .tables()
      .candles
      .values()
      .filter(|c| c.symbol == symbol && c.timeframe == timeframe)
      .cloned()
      .collect();
    candles.sort_by(|a, b| b.open_time.cmp(&a.open_time));
    candles.truncate(usize::try_from(limit).unwrap_or(0));
    Ok(candles)
  }
}

#[async_trait]
impl TokenQuoteRepository for MemoryStore {
  async fn upsert_quotes(&self, rows: &[NewTokenQuote]) -> RepositoryResult<UpsertSummary> {
    let mut tables = self.tables();
    let mut summary = UpsertSummary::default();
    for row in rows {
      let key = (row.chain.clone(), row.token_in.clone(), row.token_out.clone());
      let (id, created_at) = match tables.quotes.get(&key) {
        Some(existing) => {
          summary.updated += 1;
          (existing.id, existing.created_at)
        }
        None => {
          summary.inserted += 1;
          (tables.next_id(), row.created_at)
        }
      };
      tables.quotes.insert(
        key,
        TokenQuote {
          id,
          chain: row.chain.clone(),
          token_in: row.token_in.clone(),
          token_out: row.token_out.clone(),
          amount_in: row.amount_in.clone(),
          amount_out: row.amount_out.clone(),
          amount_in_usd: row.amount_in_usd.clone(),
          amount_out_usd: row.amount_out_usd.clone(),
          gas_usd: row.gas_usd.clone(),
          router_address: row.router_address.clone(),
          created_at,
          updated_at: row.updated_at,
          updated_by: row.updated_by.clone(),
        },
      );
    }
    Ok(summary)
  }

  async fn find_quote(
    &self,
    chain: &str,
    token_in: &str,
    token_out: &str,
  ) -> RepositoryResult<Option<TokenQuote>> {
    let key = (chain.to_string(), token_in.to_string(), token_out.to_string());
    Ok(self.tables().quotes.get(&key).cloned())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use bigdecimal::BigDecimal;
  use chrono::{Duration, TimeZone};
  use pretty_assertions::assert_eq;
  use serde_json::json;
  use std::str::FromStr;

  fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
  }

  fn exchange(slug: &str, weekly_visits: i64, now: DateTime<Utc>) -> NewExchange {
    NewExchange {
      slug: slug.to_string(),
      cmc_id: Some(270),
      name: "Binance".to_string(),
      avatar: Some("https://s2.coinmarketcap.com/static/img/exchanges/64x64/270.png".to_string()),
      description: None,
      launched: Some("2017-07-14T00:00:00.000Z".to_string()),
      notice: None,
      countries: json!([]),
      fiats: json!(["USD"]),
      urls: json!({}),
      exchange_type: None,
      maker_fee: Some(0.02),
      taker_fee: Some(0.04),
      weekly_visits: Some(weekly_visits),
      spot_volume_usd: None,
      created_at: now,
      updated_at: now,
      updated_by: "test".to_string(),
    }
  }

  #[tokio::test]
  async fn test_exchange_upsert_updates_in_place() {
    let store = MemoryStore::new();
    let first = store.upsert_exchanges(&[exchange("binance", 100, at(0))]).await.unwrap();
    assert_eq!(first, UpsertSummary { inserted: 1, updated: 0 });

    let second = store.upsert_exchanges(&[exchange("binance", 250, at(60))]).await.unwrap();
    assert_eq!(second, UpsertSummary { inserted: 0, updated: 1 });

    assert_eq!(store.count_exchanges().await.unwrap(), 1);
    let row = store.find_exchange("binance").await.unwrap().unwrap();
    assert_eq!(row.weekly_visits, Some(250));
    assert_eq!(row.created_at, at(0));
    assert_eq!(row.updated_at, at(60));
  }

  #[tokio::test]
  async fn test_listing_and_market_upserts_keep_each_others_columns() {
    let store = MemoryStore::new();
    store
      .upsert_listings(&[NewCoingeckoListing {
        coingecko_id: "bitcoin".into(),
        symbol: "btc".into(),
        name: "Bitcoin".into(),
        platforms: json!({"ethereum": "0xabc"}),
        created_at: at(0),
        updated_at: at(0),
        updated_by: "test".into(),
      }])
      .await
      .unwrap();
    store
      .upsert_markets(&[NewCoingeckoMarket {
        coingecko_id: "bitcoin".into(),
        symbol: "btc".into(),
        name: "Bitcoin".into(),
        avatar: Some("https://img/btc.png".into()),
        current_price: Some(64000.0),
        market_cap: None,
        market_cap_rank: Some(1),
        total_volume: None,
        price_change_24h: None,
        created_at: at(10),
        updated_at: at(10),
        updated_by: "test".into(),
      }])
      .await
      .unwrap();

    let asset = store.find_asset("bitcoin").await.unwrap().unwrap();
    assert_eq!(asset.platforms, json!({"ethereum": "0xabc"}));
    assert_eq!(asset.current_price, Some(64000.0));
    assert_eq!(asset.created_at, at(0));
    assert_eq!(store.count_assets().await.unwrap(), 1);
  }

  #[tokio::test]
  async fn test_candles_keyed_by_symbol_timeframe_open_time() {
    let store = MemoryStore::new();
    let candle = |open_secs: i64, close: &str| NewCandle {
      symbol: "BTCUSDT".into(),
      timeframe: "1h".into(),
      open_time: at(open_secs),
      partition_key: "btc_1h".into(),
      close_time: at(open_secs) + Duration::seconds(3599),
      open: BigDecimal::from(1),
      high: BigDecimal::from(2),
      low: BigDecimal::from(1),
      close: BigDecimal::from_str(close).unwrap(),
      volume: BigDecimal::from(10),
      quote_volume: BigDecimal::from(15),
      trades: 3,
      taker_buy_base_volume: BigDecimal::from(5),
      taker_buy_quote_volume: BigDecimal::from(7),
      created_at: at(0),
      updated_at: at(0),
      updated_by: "test".into(),
    };

    store.upsert_candles(&[candle(0, "1.5"), candle(3600, "1.7")]).await.unwrap();
    let summary = store.upsert_candles(&[candle(3600, "1.9")]).await.unwrap();

    assert_eq!(summary, UpsertSummary { inserted: 0, updated: 1 });
    assert_eq!(store.candle_count(), 2);
    assert_eq!(store.latest_open_time("BTCUSDT", "1h").await.unwrap(), Some(at(3600)));
    let newest = store.find_candles("BTCUSDT", "1h", 1).await.unwrap();
    assert_eq!(newest[0].close, BigDecimal::from_str("1.9").unwrap());
  }

  #[tokio::test]
  async fn test_trending_snapshot_replaced_per_type() {
    let store = MemoryStore::new();
    let snapshot = |assets: serde_json::Value, now| NewAssetTrending {
      trending_type: TrendingType::Gainers.to_string(),
      source: "coinmarketcap".into(),
      assets,
      created_at: now,
      updated_at: now,
      updated_by: "test".into(),
    };
    store.upsert_trending(&snapshot(json!([{"symbol": "A"}]), at(0))).await.unwrap();
    store.upsert_trending(&snapshot(json!([{"symbol": "B"}]), at(5))).await.unwrap();

    let row = store.find_trending(TrendingType::Gainers).await.unwrap().unwrap();
    assert_eq!(row.assets, json!([{"symbol": "B"}]));
    assert!(store.find_trending(TrendingType::Losers).await.unwrap().is_none());
  }
}
