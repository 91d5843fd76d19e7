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

//! Database repository abstraction layer
//!
//! One trait per refreshed collection, each keyed by its natural key. Every
//! write is an upsert: handlers may run twice for the same data (retries,
//! stalled-job re-delivery) and must converge on one row per key.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::result::Error as DieselError;
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::models::{
  AssetTrending, Candle, CoingeckoAsset, Exchange, NewAssetTrending, NewCandle,
  NewCoingeckoListing, NewCoingeckoMarket, NewExchange, NewTokenQuote, TokenQuote, TrendingType,
};

pub type DbPool = Pool<AsyncPgConnection>;
pub type DbConnection<'a> = PooledConnection<'a, AsyncPgConnection>;

const MAX_POOL_SIZE: u32 = 16;
const MIN_POOL_IDLE: u32 = 2;
/// Connection timeout in seconds - pool will fail instead of retrying forever
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Database repository errors
#[derive(Error, Debug)]
pub enum RepositoryError {
  #[error("Connection pool error: {0}")]
  PoolError(String),

  #[error("Database query error: {0}")]
  QueryError(String),

  #[error("Serialization error: {0}")]
  SerializationError(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Constraint violation: {0}")]
  ConstraintViolation(String),

  #[error("Migration error: {0}")]
  MigrationError(String),
}

impl From<DieselError> for RepositoryError {
  fn from(err: DieselError) -> Self {
    match err {
      DieselError::NotFound => RepositoryError::NotFound("Record not found".to_string()),
      DieselError::DatabaseError(kind, info) => match kind {
        diesel::result::DatabaseErrorKind::UniqueViolation
        | diesel::result::DatabaseErrorKind::ForeignKeyViolation => {
          RepositoryError::ConstraintViolation(info.message().to_string())
        }
        _ => RepositoryError::QueryError(info.message().to_string()),
      },
      _ => RepositoryError::QueryError(err.to_string()),
    }
  }
}

impl From<serde_json::Error> for RepositoryError {
  fn from(err: serde_json::Error) -> Self {
    RepositoryError::SerializationError(err.to_string())
  }
}

impl From<RepositoryError> for cf_jobs::JobError {
  fn from(err: RepositoryError) -> Self {
    cf_jobs::JobError::Backend(err.to_string())
  }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Rows written by one upsert call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
  pub inserted: usize,
  pub updated: usize,
}

impl UpsertSummary {
  pub fn total(&self) -> usize {
    self.inserted + self.updated
  }

  pub fn merge(&mut self, other: UpsertSummary) {
    self.inserted += other.inserted;
    self.updated += other.updated;
  }

  /// Count `xmax = 0` flags returned by `INSERT ... ON CONFLICT ... RETURNING`
  pub fn from_insert_flags(flags: &[bool]) -> Self {
    let inserted = flags.iter().filter(|f| **f).count();
    Self { inserted, updated: flags.len() - inserted }
  }
}

#[async_trait]
pub trait ExchangeRepository: Send + Sync {
  async fn upsert_exchanges(&self, rows: &[NewExchange]) -> RepositoryResult<UpsertSummary>;

  async fn find_exchange(&self, slug: &str) -> RepositoryResult<Option<Exchange>>;

  async fn count_exchanges(&self) -> RepositoryResult<i64>;
}

#[async_trait]
pub trait CoingeckoAssetRepository: Send + Sync {
  /// Upsert identity and platforms; market columns are left alone
  async fn upsert_listings(&self, rows: &[NewCoingeckoListing]) -> RepositoryResult<UpsertSummary>;

  /// Upsert market snapshots; platforms are left alone
  async fn upsert_markets(&self, rows: &[NewCoingeckoMarket]) -> RepositoryResult<UpsertSummary>;

  async fn find_asset(&self, coingecko_id: &str) -> RepositoryResult<Option<CoingeckoAsset>>;

  async fn count_assets(&self) -> RepositoryResult<i64>;
}

#[async_trait]
pub trait AssetTrendingRepository: Send + Sync {
  /// Replace the snapshot for `row.trending_type`
  async fn upsert_trending(&self, row: &NewAssetTrending) -> RepositoryResult<UpsertSummary>;

  async fn find_trending(&self, kind: TrendingType) -> RepositoryResult<Option<AssetTrending>>;
}

#[async_trait]
pub trait CandleRepository: Send + Sync {
  async fn upsert_candles(&self, rows: &[NewCandle]) -> RepositoryResult<UpsertSummary>;

  /// Open time of the newest stored candle, used to resume incremental fetches
  async fn latest_open_time(
    &self,
    symbol: &str,
    timeframe: &str,
  ) -> RepositoryResult<Option<DateTime<Utc>>>;

  async fn find_candles(
    &self,
    symbol: &str,
    timeframe: &str,
    limit: i64,
  ) -> RepositoryResult<Vec<Candle>>;
}

#[async_trait]
pub trait TokenQuoteRepository: Send + Sync {
  async fn upsert_quotes(&self, rows: &[NewTokenQuote]) -> RepositoryResult<UpsertSummary>;

  async fn find_quote(
    &self,
    chain: &str,
    token_in: &str,
    token_out: &str,
  ) -> RepositoryResult<Option<TokenQuote>>;
}

/// Every collection the refresh handlers write
pub trait RefreshStore:
  ExchangeRepository
  + CoingeckoAssetRepository
  + AssetTrendingRepository
  + CandleRepository
  + TokenQuoteRepository
{
}

impl<T> RefreshStore for T where
  T: ExchangeRepository
    + CoingeckoAssetRepository
    + AssetTrendingRepository
    + CandleRepository
    + TokenQuoteRepository
{
}

/// Keep the last row per key so one statement never touches a row twice
pub(crate) fn last_per_key<'a, T, K, F>(rows: &'a [T], key: F) -> Vec<&'a T>
where
  K: Eq + std::hash::Hash,
  F: Fn(&T) -> K,
{
  let mut positions = std::collections::HashMap::with_capacity(rows.len());
  let mut out: Vec<&T> = Vec::with_capacity(rows.len());
  for row in rows {
    match positions.get(&key(row)) {
      Some(&idx) => out[idx] = row,
      None => {
        positions.insert(key(row), out.len());
        out.push(row);
      }
    }
  }
  out
}

/// Database context that provides access to the connection pool
#[derive(Clone)]
pub struct DatabaseContext {
  pool: DbPool,
  database_url: String,
}

impl std::fmt::Debug for DatabaseContext {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DatabaseContext").field("state", &self.pool.state()).finish()
  }
}

impl DatabaseContext {
  /// Create a new database context with connection pooling
  ///
  /// Fails fast if the database is unavailable by checking out one connection at startup.
  pub async fn new(database_url: &str) -> RepositoryResult<Self> {
    Self::with_pool_config(database_url, MAX_POOL_SIZE, MIN_POOL_IDLE, CONNECTION_TIMEOUT_SECS)
      .await
  }

  pub async fn with_pool_config(
    database_url: &str,
    max_size: u32,
    min_idle: u32,
    timeout_secs: u64,
  ) -> RepositoryResult<Self> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder()
      .max_size(max_size)
      .min_idle(Some(min_idle))
      .connection_timeout(Duration::from_secs(timeout_secs))
      .build(manager)
      .await
      .map_err(|e| RepositoryError::PoolError(format!("Failed to build pool: {}", e)))?;

    {
      let _probe = pool
        .get()
        .await
        .map_err(|e| RepositoryError::PoolError(format!("Failed to connect to database: {}", e)))?;
    }
    debug!(max_size, min_idle, "Database pool ready");

    Ok(Self { pool, database_url: database_url.to_string() })
  }

  /// Get a connection from the pool
  pub async fn get_connection(&self) -> RepositoryResult<DbConnection<'_>> {
    self.pool.get().await.map_err(|e| RepositoryError::PoolError(e.to_string()))
  }

  pub fn pool(&self) -> &DbPool {
    &self.pool
  }

  pub fn database_url(&self) -> &str {
    &self.database_url
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_summary_from_insert_flags() {
    let summary = UpsertSummary::from_insert_flags(&[true, false, true]);
    assert_eq!(summary, UpsertSummary { inserted: 2, updated: 1 });
    assert_eq!(summary.total(), 3);
  }

  #[test]
  fn test_last_per_key_keeps_latest_in_first_position() {
    let rows = vec![("a", 1), ("b", 2), ("a", 3)];
    let kept = last_per_key(&rows, |r| r.0);
    assert_eq!(kept, vec![&("a", 3), &("b", 2)]);
  }
}
