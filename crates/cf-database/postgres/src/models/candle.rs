use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::candlesticks;

/// Quote assets stripped when deriving a candle's partition key
const QUOTE_ASSETS: [&str; 8] = ["USDT", "USDC", "FDUSD", "BUSD", "TUSD", "BTC", "ETH", "BNB"];

/// `<base-asset>_<interval>`, e.g. `btc_1h` for BTCUSDT hourly candles
pub fn partition_key(symbol: &str, timeframe: &str) -> String {
    let symbol = symbol.to_uppercase();
    let base = QUOTE_ASSETS
        .iter()
        .find_map(|quote| symbol.strip_suffix(quote).filter(|base| !base.is_empty()))
        .unwrap_or(&symbol);
    format!("{}_{}", base.to_lowercase(), timeframe)
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = candlesticks)]
pub struct Candle {
    pub symbol: String,
    pub timeframe: String,
    pub open_time: DateTime<Utc>,
    pub partition_key: String,
    pub close_time: DateTime<Utc>,
    pub open: BigDecimal,
    pub high: BigDecimal,
    pub low: BigDecimal,
    pub close: BigDecimal,
    pub volume: BigDecimal,
    pub quote_volume: BigDecimal,
    pub trades: i64,
    pub taker_buy_base_volume: BigDecimal,
    pub taker_buy_quote_volume: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

/// Candle keyed by (symbol, timeframe, open_time)
#[derive(Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = candlesticks)]
pub struct NewCandle {
    pub symbol: String,
    pub timeframe: String,
    pub open_time: DateTime<Utc>,
    pub partition_key: String,
    pub close_time: DateTime<Utc>,
    pub open: BigDecimal,
    pub high: BigDecimal,
    pub low: BigDecimal,
    pub close: BigDecimal,
    pub volume: BigDecimal,
    pub quote_volume: BigDecimal,
    pub trades: i64,
    pub taker_buy_base_volume: BigDecimal,
    pub taker_buy_quote_volume: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl From<NewCandle> for Candle {
    fn from(c: NewCandle) -> Self {
        Candle {
            symbol: c.symbol,
            timeframe: c.timeframe,
            open_time: c.open_time,
            partition_key: c.partition_key,
            close_time: c.close_time,
            open: c.open,
            high: c.high,
            low: c.low,
            close: c.close,
            volume: c.volume,
            quote_volume: c.quote_volume,
            trades: c.trades,
            taker_buy_base_volume: c.taker_buy_base_volume,
            taker_buy_quote_volume: c.taker_buy_quote_volume,
            created_at: c.created_at,
            updated_at: c.updated_at,
            updated_by: c.updated_by,
        }
    }
}
