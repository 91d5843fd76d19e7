use async_trait::async_trait;
use bigdecimal::BigDecimal;
use cf_core::QuotePair;
use cf_database_postgres::UpsertSummary;
use cf_database_postgres::models::NewTokenQuote;
use cf_models::kyberswap::KyberRouteSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{info, warn};

use crate::batch_processor::BatchProcessor;
use crate::{DataLoader, LoaderContext, LoaderError, LoaderResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenPriceInput {
  /// Defaults to the configured chain
  #[serde(default)]
  pub chain: Option<String>,
  /// Defaults to the configured pairs
  #[serde(default)]
  pub pairs: Vec<QuotePair>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TokenPriceOutput {
  pub pairs: usize,
  pub quoted: usize,
  pub failed: usize,
  pub summary: UpsertSummary,
}

/// KyberSwap route quotes, upserted by (chain, token_in, token_out)
pub struct TokenPriceLoader;

fn decimal(field: &str, value: &str) -> LoaderResult<BigDecimal> {
  BigDecimal::from_str(value)
    .map_err(|e| LoaderError::InvalidData(format!("{} '{}' is not a number: {}", field, value, e)))
}

fn optional_decimal(value: Option<&String>) -> Option<BigDecimal> {
  value.and_then(|v| BigDecimal::from_str(v).ok())
}

impl TokenPriceLoader {
  pub fn to_row(
    chain: &str,
    pair: &QuotePair,
    route: &KyberRouteSummary,
    now: DateTime<Utc>,
    updated_by: &str,
  ) -> LoaderResult<NewTokenQuote> {
    Ok(NewTokenQuote {
      chain: chain.to_string(),
      token_in: pair.token_in.to_lowercase(),
      token_out: pair.token_out.to_lowercase(),
      amount_in: decimal("amountIn", &route.amount_in)?,
      amount_out: decimal("amountOut", &route.amount_out)?,
      amount_in_usd: optional_decimal(route.amount_in_usd.as_ref()),
      amount_out_usd: optional_decimal(route.amount_out_usd.as_ref()),
      gas_usd: optional_decimal(route.gas_usd.as_ref()),
      router_address: None,
      created_at: now,
      updated_at: now,
      updated_by: updated_by.to_string(),
    })
  }
}

#[async_trait]
impl DataLoader for TokenPriceLoader {
  type Input = TokenPriceInput;
  type Output = TokenPriceOutput;

  async fn load(&self, context: &LoaderContext, input: Self::Input) -> LoaderResult<Self::Output> {
    self.validate_input(&input)?;
    let chain = input.chain.unwrap_or_else(|| context.config.kyberswap_chain.clone());
    let pairs =
      if input.pairs.is_empty() { context.config.kyberswap_pairs.clone() } else { input.pairs };
    if pairs.is_empty() {
      info!("No KyberSwap pairs configured");
      return Ok(TokenPriceOutput::default());
    }

    let kyberswap = context.clients.kyberswap();
    let (kyberswap, chain_ref) = (&kyberswap, chain.as_str());
    let result = BatchProcessor::with_concurrency(context.config.fetch_concurrency)
      .process(pairs.clone(), |pair| async move {
        let route = kyberswap
          .route(chain_ref, &pair.token_in, &pair.token_out, &pair.amount_in)
          .await?;
        Ok::<_, LoaderError>((pair, route))
      })
      .await?;

    if result.all_failed() {
      return Err(
        result
          .first_error()
          .cloned()
          .unwrap_or_else(|| LoaderError::BatchProcessingError("every quote failed".to_string())),
      );
    }
    if result.failure_count() > 0 {
      warn!("{} of {} KyberSwap quotes failed", result.failure_count(), pairs.len());
    }

    let now = context.now();
    let rows = result
      .success
      .iter()
      .map(|(pair, route)| Self::to_row(&chain, pair, route, now, &context.config.updated_by))
      .collect::<LoaderResult<Vec<_>>>()?;
    let summary = context.store.upsert_quotes(&rows).await?;
    info!("KyberSwap quotes on {}: {} inserted, {} updated", chain, summary.inserted, summary.updated);

    Ok(TokenPriceOutput {
      pairs: pairs.len(),
      quoted: rows.len(),
      failed: result.failure_count(),
      summary,
    })
  }

  fn validate_input(&self, input: &Self::Input) -> LoaderResult<()> {
    if input.chain.as_deref().is_some_and(|c| c.trim().is_empty()) {
      return Err(LoaderError::InvalidInput("chain must not be blank".to_string()));
    }
    for pair in &input.pairs {
      if pair.token_in.is_empty() || pair.token_out.is_empty() {
        return Err(LoaderError::InvalidInput("quote pair tokens are required".to_string()));
      }
      if pair.amount_in.parse::<u128>().is_err() {
        return Err(LoaderError::InvalidInput(format!(
          "amount '{}' is not a base-unit integer",
          pair.amount_in
        )));
      }
    }
    Ok(())
  }

  fn name(&self) -> &'static str {
    "TokenPriceLoader"
  }
}
