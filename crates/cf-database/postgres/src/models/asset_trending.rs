use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::schema::asset_trending;

/// Which ranking a snapshot holds; one row per type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendingType {
    Trending,
    Gainers,
    Losers,
}

impl TrendingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendingType::Trending => "trending",
            TrendingType::Gainers => "gainers",
            TrendingType::Losers => "losers",
        }
    }
}

impl fmt::Display for TrendingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrendingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trending" => Ok(TrendingType::Trending),
            "gainers" => Ok(TrendingType::Gainers),
            "losers" => Ok(TrendingType::Losers),
            other => Err(format!("unknown trending type: {}", other)),
        }
    }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = asset_trending)]
pub struct AssetTrending {
    pub id: i32,
    pub trending_type: String,
    pub source: String,
    pub assets: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

#[derive(Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = asset_trending)]
pub struct NewAssetTrending {
    pub trending_type: String,
    pub source: String,
    pub assets: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}
