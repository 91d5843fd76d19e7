use bigdecimal::BigDecimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// One candle from `/api/v3/klines`.
///
/// Binance sends each kline as a positional 12-element array:
/// `[open_time, open, high, low, close, volume, close_time, quote_volume,
///   trades, taker_buy_base, taker_buy_quote, ignore]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kline {
  pub open_time: i64,
  pub open: BigDecimal,
  pub high: BigDecimal,
  pub low: BigDecimal,
  pub close: BigDecimal,
  pub volume: BigDecimal,
  pub close_time: i64,
  pub quote_volume: BigDecimal,
  pub trades: i64,
  pub taker_buy_base_volume: BigDecimal,
  pub taker_buy_quote_volume: BigDecimal,
}

type RawKline = (
  i64,
  String,
  String,
  String,
  String,
  String,
  i64,
  String,
  i64,
  String,
  String,
  serde_json::Value,
);

impl<'de> Deserialize<'de> for Kline {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let raw = RawKline::deserialize(deserializer)?;
    let dec = |s: &str| BigDecimal::from_str(s).map_err(serde::de::Error::custom);

    Ok(Kline {
      open_time: raw.0,
      open: dec(&raw.1)?,
      high: dec(&raw.2)?,
      low: dec(&raw.3)?,
      close: dec(&raw.4)?,
      volume: dec(&raw.5)?,
      close_time: raw.6,
      quote_volume: dec(&raw.7)?,
      trades: raw.8,
      taker_buy_base_volume: dec(&raw.9)?,
      taker_buy_quote_volume: dec(&raw.10)?,
    })
  }
}

/// Error body Binance returns alongside a 4xx status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinanceError {
  pub code: i64,
  pub msg: String,
}

/// Interval strings accepted by `/api/v3/klines`, with their length in milliseconds
pub fn interval_millis(interval: &str) -> Option<i64> {
  const MINUTE: i64 = 60_000;
  let millis = match interval {
    "1s" => 1_000,
    "1m" => MINUTE,
    "3m" => 3 * MINUTE,
    "5m" => 5 * MINUTE,
    "15m" => 15 * MINUTE,
    "30m" => 30 * MINUTE,
    "1h" => 60 * MINUTE,
    "2h" => 120 * MINUTE,
    "4h" => 240 * MINUTE,
    "6h" => 360 * MINUTE,
    "8h" => 480 * MINUTE,
    "12h" => 720 * MINUTE,
    "1d" => 1_440 * MINUTE,
    "3d" => 3 * 1_440 * MINUTE,
    "1w" => 7 * 1_440 * MINUTE,
    _ => return None,
  };
  Some(millis)
}
