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

//! Postgres implementations of the refresh repositories.
//!
//! Each upsert is one `INSERT ... ON CONFLICT (natural key) DO UPDATE` per
//! batch. `created_at` is only written on insert; `updated_at` and
//! `updated_by` come from the incoming row. `RETURNING xmax = 0` tells
//! inserted rows apart from updated ones.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::{max, sql};
use diesel::prelude::*;
use diesel::sql_types::Bool;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;

use crate::models::{
  AssetTrending, Candle, CoingeckoAsset, Exchange, NewAssetTrending, NewCandle,
  NewCoingeckoListing, NewCoingeckoMarket, NewExchange, NewTokenQuote, TokenQuote, TrendingType,
};
use crate::repository::{
  AssetTrendingRepository, CandleRepository, CoingeckoAssetRepository, DatabaseContext,
  ExchangeRepository, RepositoryResult, TokenQuoteRepository, UpsertSummary, last_per_key,
};
use crate::schema::{asset_trending, candlesticks, coingecko_assets, exchanges, token_quotes};

/// Rows per statement; keeps bind parameters well under the protocol limit
const UPSERT_BATCH_SIZE: usize = 1000;

fn inserted_flag() -> diesel::expression::SqlLiteral<Bool> {
  sql::<Bool>("xmax = 0")
}

/// Refresh repositories backed by a pooled Postgres connection
#[derive(Debug, Clone)]
pub struct PgStore {
  ctx: DatabaseContext,
}

impl PgStore {
  pub fn new(ctx: DatabaseContext) -> Self {
    Self { ctx }
  }

  pub fn context(&self) -> &DatabaseContext {
    &self.ctx
  }
}

#[async_trait]
impl ExchangeRepository for PgStore {
  async fn upsert_exchanges(&self, rows: &[NewExchange]) -> RepositoryResult<UpsertSummary> {
    let rows = last_per_key(rows, |r| r.slug.clone());
    let mut conn = self.ctx.get_connection().await?;
    let mut summary = UpsertSummary::default();

    for chunk in rows.chunks(UPSERT_BATCH_SIZE) {
      let batch: Vec<NewExchange> = chunk.iter().map(|r| (*r).clone()).collect();
      let flags = diesel::insert_into(exchanges::table)
        .values(&batch)
        .on_conflict(exchanges::slug)
        .do_update()
        .set((
          exchanges::cmc_id.eq(excluded(exchanges::cmc_id)),
          exchanges::name.eq(excluded(exchanges::name)),
          exchanges::avatar.eq(excluded(exchanges::avatar)),
          exchanges::description.eq(excluded(exchanges::description)),
          exchanges::launched.eq(excluded(exchanges::launched)),
          exchanges::notice.eq(excluded(exchanges::notice)),
          exchanges::countries.eq(excluded(exchanges::countries)),
          exchanges::fiats.eq(excluded(exchanges::fiats)),
          exchanges::urls.eq(excluded(exchanges::urls)),
          exchanges::exchange_type.eq(excluded(exchanges::exchange_type)),
          exchanges::maker_fee.eq(excluded(exchanges::maker_fee)),
          exchanges::taker_fee.eq(excluded(exchanges::taker_fee)),
          exchanges::weekly_visits.eq(excluded(exchanges::weekly_visits)),
          exchanges::spot_volume_usd.eq(excluded(exchanges::spot_volume_usd)),
          exchanges::updated_at.eq(excluded(exchanges::updated_at)),
          exchanges::updated_by.eq(excluded(exchanges::updated_by)),
        ))
        .returning(inserted_flag())
        .get_results::<bool>(&mut conn)
        .await?;
      summary.merge(UpsertSummary::from_insert_flags(&flags));
    }

    Ok(summary)
  }

  async fn find_exchange(&self, slug: &str) -> RepositoryResult<Option<Exchange>> {
    let mut conn = self.ctx.get_connection().await?;
    let result = exchanges::table
      .filter(exchanges::slug.eq(slug))
      .select(Exchange::as_select())
      .first(&mut conn)
      .await
      .optional()?;
    Ok(result)
  }

  async fn count_exchanges(&self) -> RepositoryResult<i64> {
    let mut conn = self.ctx.get_connection().await?;
    Ok(exchanges::table.count().get_result(&mut conn).await?)
  }
}

#[async_trait]
impl CoingeckoAssetRepository for PgStore {
  async fn upsert_listings(&self, rows: &[NewCoingeckoListing]) -> RepositoryResult<UpsertSummary> {
    let rows = last_per_key(rows, |r| r.coingecko_id.clone());
    let mut conn = self.ctx.get_connection().await?;
    let mut summary = UpsertSummary::default();

    for chunk in rows.chunks(UPSERT_BATCH_SIZE) {
      let batch: Vec<NewCoingeckoListing> = chunk.iter().map(|r| (*r).clone()).collect();
      let flags = diesel::insert_into(coingecko_assets::table)
        .values(&batch)
        .on_conflict(coingecko_assets::coingecko_id)
        .do_update()
        .set((
          coingecko_assets::symbol.eq(excluded(coingecko_assets::symbol)),
          coingecko_assets::name.eq(excluded(coingecko_assets::name)),
          coingecko_assets::platforms.eq(excluded(coingecko_assets::platforms)),
          coingecko_assets::updated_at.eq(excluded(coingecko_assets::updated_at)),
          coingecko_assets::updated_by.eq(excluded(coingecko_assets::updated_by)),
        ))
        .returning(inserted_flag())
        .get_results::<bool>(&mut conn)
        .await?;
      summary.merge(UpsertSummary::from_insert_flags(&flags));
    }

    Ok(summary)
  }

  async fn upsert_markets(&self, rows: &[NewCoingeckoMarket]) -> RepositoryResult<UpsertSummary> {
    let rows = last_per_key(rows, |r| r.coingecko_id.clone());
    let mut conn = self.ctx.get_connection().await?;
    let mut summary = UpsertSummary::default();

    for chunk in rows.chunks(UPSERT_BATCH_SIZE) {
      let batch: Vec<NewCoingeckoMarket> = chunk.iter().map(|r| (*r).clone()).collect();
      let flags = diesel::insert_into(coingecko_assets::table)
        .values(&batch)
        .on_conflict(coingecko_assets::coingecko_id)
        .do_update()
        .set((
          coingecko_assets::symbol.eq(excluded(coingecko_assets::symbol)),
          coingecko_assets::name.eq(excluded(coingecko_assets::name)),
          coingecko_assets::avatar.eq(excluded(coingecko_assets::avatar)),
          coingecko_assets::current_price.eq(excluded(coingecko_assets::current_price)),
          coingecko_assets::market_cap.eq(excluded(coingecko_assets::market_cap)),
          coingecko_assets::market_cap_rank.eq(excluded(coingecko_assets::market_cap_rank)),
          coingecko_assets::total_volume.eq(excluded(coingecko_assets::total_volume)),
          coingecko_assets::price_change_24h.eq(excluded(coingecko_assets::price_change_24h)),
          coingecko_assets::updated_at.eq(excluded(coingecko_assets::updated_at)),
          coingecko_assets::updated_by.eq(excluded(coingecko_assets::updated_by)),
        ))
        .returning(inserted_flag())
        .get_results::<bool>(&mut conn)
        .await?;
      summary.merge(UpsertSummary::from_insert_flags(&flags));
    }

    Ok(summary)
  }

  async fn find_asset(&self, coingecko_id: &str) -> RepositoryResult<Option<CoingeckoAsset>> {
    let mut conn = self.ctx.get_connection().await?;
    let result = coingecko_assets::table
      .filter(coingecko_assets::coingecko_id.eq(coingecko_id))
      .select(CoingeckoAsset::as_select())
      .first(&mut conn)
      .await
      .optional()?;
    Ok(result)
  }

  async fn count_assets(&self) -> RepositoryResult<i64> {
    let mut conn = self.ctx.get_connection().await?;
    Ok(coingecko_assets::table.count().get_result(&mut conn).await?)
  }
}

#[async_trait]
impl AssetTrendingRepository for PgStore {
  async fn upsert_trending(&self, row: &NewAssetTrending) -> RepositoryResult<UpsertSummary> {
    let mut conn = self.ctx.get_connection().await?;
    let flags = diesel::insert_into(asset_trending::table)
      .values(row)
      .on_conflict(asset_trending::trending_type)
      .do_update()
      .set((
        asset_trending::source.eq(excluded(asset_trending::source)),
        asset_trending::assets.eq(excluded(asset_trending::assets)),
        asset_trending::updated_at.eq(excluded(asset_trending::updated_at)),
        asset_trending::updated_by.eq(excluded(asset_trending::updated_by)),
      ))
      .returning(inserted_flag())
      .get_results::<bool>(&mut conn)
      .await?;
    Ok(UpsertSummary::from_insert_flags(&flags))
  }

  async fn find_trending(&self, kind: TrendingType) -> RepositoryResult<Option<AssetTrending>> {
    let mut conn = self.ctx.get_connection().await?;
    let result = asset_trending::table
      .filter(asset_trending::trending_type.eq(kind.as_str()))
      .select(AssetTrending::as_select())
      .first(&mut conn)
      .await
      .optional()?;
    Ok(result)
  }
}

#[async_trait]
impl CandleRepository for PgStore {
  async fn upsert_candles(&self, rows: &[NewCandle]) -> RepositoryResult<UpsertSummary> {
    let rows = last_per_key(rows, |r| (r.symbol.clone(), r.timeframe.clone(), r.open_time));
    let mut conn = self.ctx.get_connection().await?;
    let mut summary = UpsertSummary::default();

    for chunk in rows.chunks(UPSERT_BATCH_SIZE) {
      let batch: Vec<NewCandle> = chunk.iter().map(|r| (*r).clone()).collect();
      let flags = diesel::insert_into(candlesticks::table)
        .values(&batch)
        .on_conflict((candlesticks::symbol, candlesticks::timeframe, candlesticks::open_time))
        .do_update()
        .set((
          candlesticks::partition_key.eq(excluded(candlesticks::partition_key)),
          candlesticks::close_time.eq(excluded(candlesticks::close_time)),
          candlesticks::open.eq(excluded(candlesticks::open)),
          candlesticks::high.eq(excluded(candlesticks::high)),
          candlesticks::low.eq(excluded(candlesticks::low)),
          candlesticks::close.eq(excluded(candlesticks::close)),
          candlesticks::volume.eq(excluded(candlesticks::volume)),
          candlesticks::quote_volume.eq(excluded(candlesticks::quote_volume)),
          candlesticks::trades.eq(excluded(candlesticks::trades)),
          candlesticks::taker_buy_base_volume.eq(excluded(candlesticks::taker_buy_base_volume)),
          candlesticks::taker_buy_quote_volume.eq(excluded(candlesticks::taker_buy_quote_volume)),
          candlesticks::updated_at.eq(excluded(candlesticks::updated_at)),
          candlesticks::updated_by.eq(excluded(candlesticks::updated_by)),
        ))
        .returning(inserted_flag())
        .get_results::<bool>(&mut conn)
        .await?;
      summary.merge(UpsertSummary::from_insert_flags(&flags));
    }

    Ok(summary)
  }

  async fn latest_open_time(
    &self,
    symbol: &str,
    timeframe: &str,
  ) -> RepositoryResult<Option<DateTime<Utc>>> {
    let mut conn = self.ctx.get_connection().await?;
    let latest = candlesticks::table
      .filter(candlesticks::symbol.eq(symbol))
      .filter(candlesticks::timeframe.eq(timeframe))
      .select(max(candlesticks::open_time))
      .first::<Option<DateTime<Utc>>>(&mut conn)
      .await?;
    Ok(latest)
  }

  async fn find_candles(
    &self,
    symbol: &str,
    timeframe: &str,
    limit: i64,
  ) -> RepositoryResult<Vec<Candle>> {
    let mut conn = self.ctx.get_connection().await?;
    let candles = candlesticks::table
      .filter(candlesticks::symbol.eq(symbol))
      .filter(candlesticks::timeframe.eq(timeframe))
      .order(candlesticks::open_time.desc())
      .limit(limit)
      .select(Candle::as_select())
      .load(&mut conn)
      .await?;
    Ok(candles)
  }
}

#[async_trait]
impl TokenQuoteRepository for PgStore {
  async fn upsert_quotes(&self, rows: &[NewTokenQuote]) -> RepositoryResult<UpsertSummary> {
    let rows =
      last_per_key(rows, |r| (r.chain.clone(), r.token_in.clone(), r.token_out.clone()));
    let batch: Vec<NewTokenQuote> = rows.into_iter().cloned().collect();
    if batch.is_empty() {
      return Ok(UpsertSummary::default());
    }

    let mut conn = self.ctx.get_connection().await?;
    let flags = diesel::insert_into(token_quotes::table)
      .values(&batch)
      .on_conflict((token_quotes::chain, token_quotes::token_in, token_quotes::token_out))
      .do_update()
      .set((
        token_quotes::amount_in.eq(excluded(token_quotes::amount_in)),
        token_quotes::amount_out.eq(excluded(token_quotes::amount_out)),
        token_quotes::amount_in_usd.eq(excluded(token_quotes::amount_in_usd)),
        token_quotes::amount_out_usd.eq(excluded(token_quotes::amount_out_usd)),
        token_quotes::gas_usd.eq(excluded(token_quotes::gas_usd)),
        token_quotes::router_address.eq(excluded(token_quotes::router_address)),
        token_quotes::updated_at.eq(excluded(token_quotes::updated_at)),
        token_quotes::updated_by.eq(excluded(token_quotes::updated_by)),
      ))
      .returning(inserted_flag())
      .get_results::<bool>(&mut conn)
      .await?;
    Ok(UpsertSummary::from_insert_flags(&flags))
  }

  async fn find_quote(
    &self,
    chain: &str,
    token_in: &str,
    token_out: &str,
  ) -> RepositoryResult<Option<TokenQuote>> {
    let mut conn = self.ctx.get_connection().await?;
    let result = token_quotes::table
      .filter(token_quotes::chain.eq(chain))
      .filter(token_quotes::token_in.eq(token_in))
      .filter(token_quotes::token_out.eq(token_out))
      .select(TokenQuote::as_select())
      .first(&mut conn)
      .await
      .optional()?;
    Ok(result)
  }
}
