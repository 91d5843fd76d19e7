use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Envelope every CoinMarketCap Pro endpoint answers with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmcResponse<T> {
  pub status: CmcStatus,
  /// Absent when `status.error_code` is non-zero
  pub data: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmcStatus {
  #[serde(default)]
  pub timestamp: Option<String>,
  #[serde(default)]
  pub error_code: i64,
  #[serde(default)]
  pub error_message: Option<String>,
  #[serde(default)]
  pub elapsed: Option<i64>,
  #[serde(default)]
  pub credit_count: Option<i64>,
}

impl CmcStatus {
  pub fn is_ok(&self) -> bool {
    self.error_code == 0
  }
}

/// Row of `/v1/exchange/map`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmcExchangeMapItem {
  pub id: i64,
  pub name: String,
  pub slug: String,
  #[serde(default)]
  pub is_active: Option<i32>,
  #[serde(default)]
  pub first_historical_data: Option<String>,
  #[serde(default)]
  pub last_historical_data: Option<String>,
}

/// Exchange metadata from `/v1/exchange/info`, keyed by slug in the response map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmcExchangeInfo {
  pub id: i64,
  pub name: String,
  pub slug: String,
  #[serde(default)]
  pub logo: Option<String>,
  #[serde(default)]
  pub description: Option<String>,
  /// ISO-8601 timestamp as sent by the provider, e.g. `2017-07-14T00:00:00.000Z`
  #[serde(default)]
  pub date_launched: Option<String>,
  #[serde(default)]
  pub notice: Option<String>,
  #[serde(default)]
  pub countries: Vec<String>,
  #[serde(default)]
  pub fiats: Vec<String>,
  #[serde(default)]
  pub urls: HashMap<String, Vec<String>>,
  #[serde(default, rename = "type")]
  pub exchange_type: Option<String>,
  #[serde(default)]
  pub maker_fee: Option<f64>,
  #[serde(default)]
  pub taker_fee: Option<f64>,
  #[serde(default)]
  pub weekly_visits: Option<i64>,
  #[serde(default)]
  pub spot_volume_usd: Option<f64>,
}

/// One row of `/v1/cryptocurrency/trending/gainers-losers`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmcGainersLosersItem {
  pub id: i64,
  pub name: String,
  pub symbol: String,
  pub slug: String,
  #[serde(default)]
  pub cmc_rank: Option<i64>,
  #[serde(default)]
  pub quote: HashMap<String, CmcQuote>,
}

impl CmcGainersLosersItem {
  pub fn usd(&self) -> Option<&CmcQuote> {
    self.quote.get("USD")
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CmcQuote {
  #[serde(default)]
  pub price: Option<f64>,
  #[serde(default)]
  pub volume_24h: Option<f64>,
  #[serde(default)]
  pub percent_change_24h: Option<f64>,
  #[serde(default)]
  pub market_cap: Option<f64>,
  #[serde(default)]
  pub last_updated: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exchange_info_minimal_payload() {
    let json = r#"{
      "status": {"timestamp": "2024-01-01T00:00:00.000Z", "error_code": 0, "error_message": null},
      "data": {
        "binance": {
          "id": 270,
          "name": "Binance",
          "slug": "binance",
          "logo": "https://s2.coinmarketcap.com/static/img/exchanges/64x64/270.png",
          "date_launched": "2017-07-14T00:00:00.000Z"
        }
      }
    }"#;

    let resp: CmcResponse<HashMap<String, CmcExchangeInfo>> = serde_json::from_str(json).unwrap();
    assert!(resp.status.is_ok());
    let binance = &resp.data.unwrap()["binance"];
    assert_eq!(binance.id, 270);
    assert_eq!(binance.date_launched.as_deref(), Some("2017-07-14T00:00:00.000Z"));
    assert!(binance.weekly_visits.is_none());
    assert!(binance.urls.is_empty());
  }

  #[test]
  fn test_error_envelope_without_data() {
    let json = r#"{"status": {"error_code": 1002, "error_message": "API key missing."}}"#;
    let resp: CmcResponse<Vec<CmcExchangeMapItem>> = serde_json::from_str(json).unwrap();
    assert!(!resp.status.is_ok());
    assert!(resp.data.is_none());
    assert_eq!(resp.status.error_message.as_deref(), Some("API key missing."));
  }

  #[test]
  fn test_gainers_losers_usd_quote() {
    let json = r#"{
      "id": 1, "name": "Bitcoin", "symbol": "BTC", "slug": "bitcoin", "cmc_rank": 1,
      "quote": {"USD": {"price": 64000.5, "percent_change_24h": 3.2}}
    }"#;
    let item: CmcGainersLosersItem = serde_json::from_str(json).unwrap();
    assert_eq!(item.usd().and_then(|q| q.percent_change_24h), Some(3.2));
  }
}
