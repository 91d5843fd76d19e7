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

//! Exchange metadata from CoinMarketCap.
//!
//! The exchange map gives every slug; exchange info is fetched in chunks of
//! `chunk_size` slugs with bounded parallelism and upserted by slug.

use async_trait::async_trait;
use cf_database_postgres::UpsertSummary;
use cf_database_postgres::models::NewExchange;
use cf_models::coinmarketcap::CmcExchangeInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::batch_processor::{BatchProcessor, create_batches};
use crate::{DataLoader, LoaderContext, LoaderError, LoaderResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangeLoaderInput {
  /// Refresh only these slugs; empty means every active exchange on the map
  #[serde(default)]
  pub slugs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExchangeLoaderOutput {
  pub requested: usize,
  pub fetched: usize,
  pub failed_chunks: usize,
  pub summary: UpsertSummary,
}

pub struct ExchangeLoader;

impl ExchangeLoader {
  async fn resolve_slugs(context: &LoaderContext, input: ExchangeLoaderInput) -> LoaderResult<Vec<String>> {
    if !input.slugs.is_empty() {
      return Ok(input.slugs);
    }

    let map = context.clients.coinmarketcap().exchange_map().await?;
    let slugs: Vec<String> =
      map.into_iter().filter(|item| item.is_active != Some(0)).map(|item| item.slug).collect();
    debug!("Exchange map returned {} active slugs", slugs.len());
    Ok(slugs)
  }

  fn to_row(
    info: CmcExchangeInfo,
    now: DateTime<Utc>,
    updated_by: &str,
  ) -> LoaderResult<NewExchange> {
    Ok(NewExchange {
      cmc_id: i32::try_from(info.id).ok(),
      avatar: info.logo,
      launched: info.date_launched,
      countries: serde_json::to_value(&info.countries)?,
      fiats: serde_json::to_value(&info.fiats)?,
      urls: serde_json::to_value(&info.urls)?,
      slug: info.slug,
      name: info.name,
      description: info.description,
      notice: info.notice,
      exchange_type: info.exchange_type,
      maker_fee: info.maker_fee,
      taker_fee: info.taker_fee,
      weekly_visits: info.weekly_visits,
      spot_volume_usd: info.spot_volume_usd,
      created_at: now,
      updated_at: now,
      updated_by: updated_by.to_string(),
    })
  }
}

#[async_trait]
impl DataLoader for ExchangeLoader {
  type Input = ExchangeLoaderInput;
  type Output = ExchangeLoaderOutput;

  async fn load(&self, context: &LoaderContext, input: Self::Input) -> LoaderResult<Self::Output> {
    self.validate_input(&input)?;
    let slugs = Self::resolve_slugs(context, input).await?;
    if slugs.is_empty() {
      info!("No exchanges to refresh");
      return Ok(ExchangeLoaderOutput::default());
    }

    let requested = slugs.len();
    let chunks = create_batches(slugs.into_iter(), context.config.chunk_size);
    let cmc = context.clients.coinmarketcap();
    let cmc = &cmc;

    let result = BatchProcessor::with_concurrency(context.config.fetch_concurrency)
      .process(chunks, |chunk| async move {
        cmc.exchange_info(&chunk).await.map_err(LoaderError::from)
      })
      .await?;

    if result.all_failed() {
      return Err(
        result
          .first_error()
          .cloned()
          .unwrap_or_else(|| LoaderError::BatchProcessingError("every chunk failed".to_string())),
      );
    }
    if result.failure_count() > 0 {
      warn!(
        "{} of {} exchange info chunks failed; upserting the rest",
        result.failure_count(),
        result.total_processed
      );
    }

    let now = context.now();
    let rows = result
      .success
      .into_iter()
      .flat_map(|infos| infos.into_values())
      .map(|info| Self::to_row(info, now, &context.config.updated_by))
      .collect::<LoaderResult<Vec<_>>>()?;

    let summary = context.store.upsert_exchanges(&rows).await?;
    info!(
      "Exchanges refreshed: {} inserted, {} updated ({} requested)",
      summary.inserted, summary.updated, requested
    );

    Ok(ExchangeLoaderOutput {
      requested,
      fetched: rows.len(),
      failed_chunks: result.failures.len(),
      summary,
    })
  }

  fn validate_input(&self, input: &Self::Input) -> LoaderResult<()> {
    if input.slugs.iter().any(|s| s.trim().is_empty()) {
      return Err(LoaderError::InvalidInput("exchange slugs must not be blank".to_string()));
    }
    Ok(())
  }

  fn name(&self) -> &'static str {
    "ExchangeLoader"
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn binance_info() -> CmcExchangeInfo {
    CmcExchangeInfo {
      id: 270,
      name: "Binance".to_string(),
      slug: "binance".to_string(),
      logo: Some("https://s2.coinmarketcap.com/static/img/exchanges/64x64/270.png".to_string()),
      description: None,
      date_launched: Some("2017-07-14".to_string()),
      notice: None,
      countries: vec![],
      fiats: vec!["USD".to_string()],
      urls: HashMap::from([("website".to_string(), vec!["https://www.binance.com".to_string()])]),
      exchange_type: None,
      maker_fee: Some(0.02),
      taker_fee: Some(0.04),
      weekly_visits: Some(5_000_000),
      spot_volume_usd: None,
    }
  }

  #[test]
  fn test_logo_and_launch_date_are_renamed() {
    let now = Utc::now();
    let row = ExchangeLoader::to_row(binance_info(), now, "coinfeed").unwrap();

    assert_eq!(row.slug, "binance");
    assert_eq!(row.cmc_id, Some(270));
    assert_eq!(
      row.avatar.as_deref(),
      Some("https://s2.coinmarketcap.com/static/img/exchanges/64x64/270.png")
    );
    assert_eq!(row.launched.as_deref(), Some("2017-07-14"));
    assert_eq!(row.fiats, serde_json::json!(["USD"]));
    assert_eq!(row.urls["website"][0], "https://www.binance.com");
    assert_eq!(row.updated_at, now);
  }

  #[test]
  fn test_blank_slug_rejected() {
    let input = ExchangeLoaderInput { slugs: vec!["binance".to_string(), " ".to_string()] };
    assert!(matches!(ExchangeLoader.validate_input(&input), Err(LoaderError::InvalidInput(_))));
  }
}
