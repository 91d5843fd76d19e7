//! Trending and top-mover snapshots, one row per trending type

use async_trait::async_trait;
use cf_database_postgres::UpsertSummary;
use cf_database_postgres::models::{NewAssetTrending, TrendingType};
use cf_models::coinmarketcap::CmcGainersLosersItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cmp::Ordering;
use tracing::info;

use crate::{DataLoader, LoaderContext, LoaderError, LoaderResult};

const COINGECKO_SOURCE: &str = "coingecko";
const COINMARKETCAP_SOURCE: &str = "coinmarketcap";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssetTrendingOutput {
  pub assets: usize,
  pub summary: UpsertSummary,
}

fn snapshot(
  kind: TrendingType,
  source: &str,
  assets: serde_json::Value,
  now: DateTime<Utc>,
  updated_by: &str,
) -> NewAssetTrending {
  NewAssetTrending {
    trending_type: kind.to_string(),
    source: source.to_string(),
    assets,
    created_at: now,
    updated_at: now,
    updated_by: updated_by.to_string(),
  }
}

/// CoinGecko's most searched coins
pub struct TrendingLoader;

#[async_trait]
impl DataLoader for TrendingLoader {
  type Input = ();
  type Output = AssetTrendingOutput;

  async fn load(&self, context: &LoaderContext, _input: ()) -> LoaderResult<Self::Output> {
    let coins = context.clients.coingecko().search_trending().await?.into_coins();
    if coins.is_empty() {
      return Err(LoaderError::InvalidData("trending search returned no coins".to_string()));
    }

    let assets: Vec<serde_json::Value> = coins
      .iter()
      .map(|coin| {
        json!({
          "id": coin.id,
          "name": coin.name,
          "symbol": coin.symbol,
          "market_cap_rank": coin.market_cap_rank,
          "avatar": coin.large.as_ref().or(coin.thumb.as_ref()),
          "score": coin.score,
        })
      })
      .collect();

    let row = snapshot(
      TrendingType::Trending,
      COINGECKO_SOURCE,
      serde_json::Value::Array(assets),
      context.now(),
      &context.config.updated_by,
    );
    let summary = context.store.upsert_trending(&row).await?;
    info!("Trending snapshot stored with {} coins", coins.len());
    Ok(AssetTrendingOutput { assets: coins.len(), summary })
  }

  fn name(&self) -> &'static str {
    "TrendingLoader"
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GainersLosersInput {
  #[serde(default)]
  pub limit: Option<usize>,
}

/// CoinMarketCap 24h movers split into `gainers` and `losers`
pub struct GainersLosersLoader;

impl GainersLosersLoader {
  fn change(item: &CmcGainersLosersItem) -> Option<f64> {
    item.usd().and_then(|q| q.percent_change_24h)
  }

  fn to_asset(item: &CmcGainersLosersItem) -> serde_json::Value {
    let usd = item.usd();
    json!({
      "id": item.id,
      "name": item.name,
      "symbol": item.symbol,
      "slug": item.slug,
      "cmc_rank": item.cmc_rank,
      "price": usd.and_then(|q| q.price),
      "percent_change_24h": usd.and_then(|q| q.percent_change_24h),
      "volume_24h": usd.and_then(|q| q.volume_24h),
    })
  }

  /// Positive movers by descending change, negative movers by ascending change
  pub fn split(items: &[CmcGainersLosersItem]) -> (Vec<serde_json::Value>, Vec<serde_json::Value>) {
    let mut gainers: Vec<&CmcGainersLosersItem> =
      items.iter().filter(|i| Self::change(i).is_some_and(|c| c > 0.0)).collect();
    let mut losers: Vec<&CmcGainersLosersItem> =
      items.iter().filter(|i| Self::change(i).is_some_and(|c| c < 0.0)).collect();

    let by_change = |a: &&CmcGainersLosersItem, b: &&CmcGainersLosersItem| {
      Self::change(a).partial_cmp(&Self::change(b)).unwrap_or(Ordering::Equal)
    };
    gainers.sort_by(|a, b| by_change(b, a));
    losers.sort_by(by_change);

    (
      gainers.into_iter().map(Self::to_asset).collect(),
      losers.into_iter().map(Self::to_asset).collect(),
    )
  }
}

#[async_trait]
impl DataLoader for GainersLosersLoader {
  type Input = GainersLosersInput;
  type Output = AssetTrendingOutput;

  async fn load(&self, context: &LoaderContext, input: Self::Input) -> LoaderResult<Self::Output> {
    self.validate_input(&input)?;
    let limit = input.limit.unwrap_or(context.config.gainers_losers_limit);
    let items = context.clients.coinmarketcap().gainers_losers(limit).await?;
    let (gainers, losers) = Self::split(&items);
    let assets = gainers.len() + losers.len();

    let now = context.now();
    let mut summary = UpsertSummary::default();
    for (kind, list) in [(TrendingType::Gainers, gainers), (TrendingType::Losers, losers)] {
      let row = snapshot(
        kind,
        COINMARKETCAP_SOURCE,
        serde_json::Value::Array(list),
        now,
        &context.config.updated_by,
      );
      summary.merge(context.store.upsert_trending(&row).await?);
    }

    info!("Gainers/losers snapshot stored with {} movers", assets);
    Ok(AssetTrendingOutput { assets, summary })
  }

  fn validate_input(&self, input: &Self::Input) -> LoaderResult<()> {
    if input.limit == Some(0) {
      return Err(LoaderError::InvalidInput("limit must be at least 1".to_string()));
    }
    Ok(())
  }

  fn name(&self) -> &'static str {
    "GainersLosersLoader"
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use cf_models::coinmarketcap::CmcQuote;
  use std::collections::HashMap;

  fn mover(symbol: &str, change: Option<f64>) -> CmcGainersLosersItem {
    CmcGainersLosersItem {
      id: 1,
      name: symbol.to_string(),
      symbol: symbol.to_string(),
      slug: symbol.to_lowercase(),
      cmc_rank: None,
      quote: HashMap::from([(
        "USD".to_string(),
        CmcQuote {
          price: Some(1.0),
          volume_24h: None,
          percent_change_24h: change,
          market_cap: None,
          last_updated: None,
        },
      )]),
    }
  }

  #[test]
  fn test_split_orders_each_side_by_magnitude() {
    let items = vec![
      mover("AAA", Some(5.0)),
      mover("BBB", Some(-2.0)),
      mover("CCC", Some(12.5)),
      mover("DDD", Some(-9.0)),
      mover("EEE", None),
      mover("FFF", Some(0.0)),
    ];

    let (gainers, losers) = GainersLosersLoader::split(&items);
    let symbols = |v: &[serde_json::Value]| -> Vec<String> {
      v.iter().map(|a| a["symbol"].as_str().unwrap_or_default().to_string()).collect()
    };
    assert_eq!(symbols(&gainers), vec!["CCC", "AAA"]);
    assert_eq!(symbols(&losers), vec!["DDD", "BBB"]);
  }
}
