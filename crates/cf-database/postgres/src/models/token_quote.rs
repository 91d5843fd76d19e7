use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::token_quotes;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = token_quotes)]
pub struct TokenQuote {
    pub id: i32,
    pub chain: String,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: BigDecimal,
    pub amount_out: BigDecimal,
    pub amount_in_usd: Option<BigDecimal>,
    pub amount_out_usd: Option<BigDecimal>,
    pub gas_usd: Option<BigDecimal>,
    pub router_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

/// Latest swap quote keyed by (chain, token_in, token_out)
#[derive(Insertable, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[diesel(table_name = token_quotes)]
pub struct NewTokenQuote {
    pub chain: String,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: BigDecimal,
    pub amount_out: BigDecimal,
    pub amount_in_usd: Option<BigDecimal>,
    pub amount_out_usd: Option<BigDecimal>,
    pub gas_usd: Option<BigDecimal>,
    pub router_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}
