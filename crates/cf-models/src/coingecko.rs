use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Row of `/coins/list?include_platform=true`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CgCoinListItem {
  pub id: String,
  pub symbol: String,
  pub name: String,
  /// Chain name → contract address. Native coins carry an empty map.
  #[serde(default)]
  pub platforms: HashMap<String, Option<String>>,
}

/// Row of `/coins/markets`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CgMarketRow {
  pub id: String,
  pub symbol: String,
  pub name: String,
  #[serde(default)]
  pub image: Option<String>,
  #[serde(default)]
  pub current_price: Option<f64>,
  #[serde(default)]
  pub market_cap: Option<f64>,
  #[serde(default)]
  pub market_cap_rank: Option<i64>,
  #[serde(default)]
  pub total_volume: Option<f64>,
  #[serde(default)]
  pub price_change_percentage_24h: Option<f64>,
  #[serde(default)]
  pub circulating_supply: Option<f64>,
  #[serde(default)]
  pub last_updated: Option<String>,
}

/// Payload of `/search/trending`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CgTrendingResponse {
  #[serde(default)]
  pub coins: Vec<CgTrendingEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CgTrendingEntry {
  pub item: CgTrendingCoin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CgTrendingCoin {
  pub id: String,
  #[serde(default)]
  pub coin_id: Option<i64>,
  pub name: String,
  pub symbol: String,
  #[serde(default)]
  pub market_cap_rank: Option<i64>,
  #[serde(default)]
  pub thumb: Option<String>,
  #[serde(default)]
  pub large: Option<String>,
  #[serde(default)]
  pub score: Option<i64>,
}

impl CgTrendingResponse {
  pub fn into_coins(self) -> Vec<CgTrendingCoin> {
    self.coins.into_iter().map(|entry| entry.item).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_coin_list_with_platforms() {
    let json = r#"[
      {"id": "bitcoin", "symbol": "btc", "name": "Bitcoin", "platforms": {}},
      {"id": "usd-coin", "symbol": "usdc", "name": "USDC",
       "platforms": {"ethereum": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", "tron": null}}
    ]"#;
    let rows: Vec<CgCoinListItem> = serde_json::from_str(json).unwrap();
    assert!(rows[0].platforms.is_empty());
    assert_eq!(rows[1].platforms.len(), 2);
    assert_eq!(rows[1].platforms["tron"], None);
  }

  #[test]
  fn test_trending_unwraps_items() {
    let json = r#"{"coins": [
      {"item": {"id": "pepe", "coin_id": 29850, "name": "Pepe", "symbol": "PEPE", "score": 0}},
      {"item": {"id": "sui", "name": "Sui", "symbol": "SUI", "market_cap_rank": 20, "score": 1}}
    ], "nfts": []}"#;
    let resp: CgTrendingResponse = serde_json::from_str(json).unwrap();
    let coins = resp.into_coins();
    assert_eq!(coins.len(), 2);
    assert_eq!(coins[1].market_cap_rank, Some(20));
  }

  #[test]
  fn test_market_row_nulls() {
    let json = r#"{"id": "x", "symbol": "x", "name": "X", "current_price": null, "image": null}"#;
    let row: CgMarketRow = serde_json::from_str(json).unwrap();
    assert!(row.current_price.is_none());
  }
}
