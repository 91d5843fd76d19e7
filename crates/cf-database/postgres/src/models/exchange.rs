use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::exchanges;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = exchanges)]
pub struct Exchange {
    pub id: i32,
    pub slug: String,
    pub cmc_id: Option<i32>,
    pub name: String,
    pub avatar: Option<String>,
    pub description: Option<String>,
    pub launched: Option<String>,
    pub notice: Option<String>,
    pub countries: serde_json::Value,
    pub fiats: serde_json::Value,
    pub urls: serde_json::Value,
    pub exchange_type: Option<String>,
    pub maker_fee: Option<f64>,
    pub taker_fee: Option<f64>,
    pub weekly_visits: Option<i64>,
    pub spot_volume_usd: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

/// Exchange row keyed by `slug`
#[derive(Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = exchanges)]
pub struct NewExchange {
    pub slug: String,
    pub cmc_id: Option<i32>,
    pub name: String,
    pub avatar: Option<String>,
    pub description: Option<String>,
    pub launched: Option<String>,
    pub notice: Option<String>,
    pub countries: serde_json::Value,
    pub fiats: serde_json::Value,
    pub urls: serde_json::Value,
    pub exchange_type: Option<String>,
    pub maker_fee: Option<f64>,
    pub taker_fee: Option<f64>,
    pub weekly_visits: Option<i64>,
    pub spot_volume_usd: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl NewExchange {
    pub fn into_row(self, id: i32, created_at: DateTime<Utc>) -> Exchange {
        Exchange {
            id,
            slug: self.slug,
            cmc_id: self.cmc_id,
            name: self.name,
            avatar: self.avatar,
            description: self.description,
            launched: self.launched,
            notice: self.notice,
            countries: self.countries,
            fiats: self.fiats,
            urls: self.urls,
            exchange_type: self.exchange_type,
            maker_fee: self.maker_fee,
            taker_fee: self.taker_fee,
            weekly_visits: self.weekly_visits,
            spot_volume_usd: self.spot_volume_usd,
            created_at,
            updated_at: self.updated_at,
            updated_by: self.updated_by,
        }
    }
}
