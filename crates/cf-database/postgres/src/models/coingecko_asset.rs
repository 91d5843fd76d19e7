use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::coingecko_assets;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = coingecko_assets)]
pub struct CoingeckoAsset {
    pub id: i32,
    pub coingecko_id: String,
    pub symbol: String,
    pub name: String,
    pub platforms: serde_json::Value,
    pub avatar: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<i32>,
    pub total_volume: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

/// Identity and contract addresses from the coin list
#[derive(Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = coingecko_assets)]
pub struct NewCoingeckoListing {
    pub coingecko_id: String,
    pub symbol: String,
    pub name: String,
    pub platforms: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

/// Market snapshot from the markets endpoint
#[derive(Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = coingecko_assets)]
pub struct NewCoingeckoMarket {
    pub coingecko_id: String,
    pub symbol: String,
    pub name: String,
    pub avatar: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<i32>,
    pub total_volume: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}
