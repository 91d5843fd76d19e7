/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

use crate::{Error, Provider, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Deployment environment. Recurring schedules only start in production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Environment {
  Production,
  Staging,
  #[default]
  Development,
  Test,
}

impl Environment {
  pub fn is_production(&self) -> bool {
    matches!(self, Environment::Production)
  }
}

impl FromStr for Environment {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "production" | "prod" => Ok(Environment::Production),
      "staging" => Ok(Environment::Staging),
      "development" | "dev" | "" => Ok(Environment::Development),
      "test" => Ok(Environment::Test),
      other => Err(Error::Config(format!("Invalid APP_ENV: {}", other))),
    }
  }
}

/// What a handler does with an upstream or storage error.
///
/// `Propagate` hands the error to the worker so the queue's attempts/backoff engage
/// and exhaustion raises an alert. `Swallow` logs the error, bumps a counter and lets
/// the job complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FailurePolicy {
  #[default]
  Propagate,
  Swallow,
}

impl FromStr for FailurePolicy {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "propagate" => Ok(FailurePolicy::Propagate),
      "swallow" => Ok(FailurePolicy::Swallow),
      other => Err(Error::Config(format!("Invalid HANDLER_FAILURE_POLICY: {}", other))),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
  pub api_key: Option<String>,
  pub base_url: String,
  pub rate_limit_per_minute: u32,
}

impl ProviderConfig {
  pub fn defaults_for(provider: Provider) -> Self {
    Self {
      api_key: None,
      base_url: provider.default_base_url().to_string(),
      rate_limit_per_minute: provider.default_rate_limit(),
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertConfig {
  pub discord_webhook_url: Option<String>,
  pub telegram_bot_token: Option<String>,
  pub telegram_chat_id: Option<String>,
}

/// A KyberSwap pair to quote, configured as `tokenIn:tokenOut:amountIn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotePair {
  pub token_in: String,
  pub token_out: String,
  pub amount_in: String,
}

impl FromStr for QuotePair {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let parts: Vec<&str> = s.trim().split(':').collect();
    match parts.as_slice() {
      [token_in, token_out, amount_in]
        if !token_in.is_empty() && !token_out.is_empty() && !amount_in.is_empty() =>
      {
        if amount_in.parse::<u128>().is_err() {
          return Err(Error::Config(format!("Invalid amount in quote pair: {}", s)));
        }
        Ok(QuotePair {
          token_in: token_in.to_string(),
          token_out: token_out.to_string(),
          amount_in: amount_in.to_string(),
        })
      }
      _ => Err(Error::Config(format!("Invalid quote pair (expected in:out:amount): {}", s))),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
  pub binance_symbols: Vec<String>,
  pub binance_intervals: Vec<String>,
  pub kyberswap_chain: String,
  pub kyberswap_pairs: Vec<QuotePair>,
  pub failure_policy: FailurePolicy,
  /// Max parallel upstream requests inside one handler (chunk fan-out)
  pub fetch_concurrency: usize,
}

impl Default for RefreshConfig {
  fn default() -> Self {
    Self {
      binance_symbols: vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()],
      binance_intervals: vec!["1h".to_string(), "1d".to_string()],
      kyberswap_chain: "ethereum".to_string(),
      kyberswap_pairs: Vec::new(),
      failure_policy: FailurePolicy::default(),
      fetch_concurrency: 4,
    }
  }
}

/// Configuration for the coinfeed workers and CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
  pub environment: Environment,
  pub database_url: Option<String>,
  pub timeout_secs: u64,
  pub coinmarketcap: ProviderConfig,
  pub coingecko: ProviderConfig,
  pub binance: ProviderConfig,
  pub kyberswap: ProviderConfig,
  pub alerts: AlertConfig,
  pub refresh: RefreshConfig,
}

impl Config {
  /// Load configuration from environment variables
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let environment = match env::var("APP_ENV") {
      Ok(value) => value.parse()?,
      Err(_) => Environment::default(),
    };

    let timeout_secs = parse_var("CF_TIMEOUT_SECS", 30u64)?;

    let mut coingecko = provider_from_env(Provider::CoinGecko, "COINGECKO")?;
    // Paid plans are served from a different host
    if env::var("COINGECKO_BASE_URL").is_err()
      && env::var("COINGECKO_PLAN").is_ok_and(|plan| plan.eq_ignore_ascii_case("pro"))
    {
      coingecko.base_url = crate::COINGECKO_PRO_BASE_URL.to_string();
    }

    let refresh = RefreshConfig {
      binance_symbols: list_var("BINANCE_SYMBOLS")
        .unwrap_or_else(|| RefreshConfig::default().binance_symbols),
      binance_intervals: list_var("BINANCE_INTERVALS")
        .unwrap_or_else(|| RefreshConfig::default().binance_intervals),
      kyberswap_chain: env::var("KYBERSWAP_CHAIN").unwrap_or_else(|_| "ethereum".to_string()),
      kyberswap_pairs: list_var("KYBERSWAP_PAIRS")
        .unwrap_or_default()
        .iter()
        .map(|p| p.parse())
        .collect::<Result<Vec<_>>>()?,
      failure_policy: match env::var("HANDLER_FAILURE_POLICY") {
        Ok(value) => value.parse()?,
        Err(_) => FailurePolicy::default(),
      },
      fetch_concurrency: parse_var("FETCH_CONCURRENCY", 4usize)?,
    };

    if refresh.fetch_concurrency == 0 {
      return Err(Error::Config("FETCH_CONCURRENCY must be at least 1".to_string()));
    }

    Ok(Config {
      environment,
      database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
      timeout_secs,
      coinmarketcap: provider_from_env(Provider::CoinMarketCap, "COINMARKETCAP")?,
      coingecko,
      binance: provider_from_env(Provider::Binance, "BINANCE")?,
      kyberswap: provider_from_env(Provider::KyberSwap, "KYBERSWAP")?,
      alerts: AlertConfig {
        discord_webhook_url: env::var("DISCORD_WEBHOOK_URL").ok().filter(|v| !v.is_empty()),
        telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN").ok().filter(|v| !v.is_empty()),
        telegram_chat_id: env::var("TELEGRAM_CHAT_ID").ok().filter(|v| !v.is_empty()),
      },
      refresh,
    })
  }

  /// Create a config with every provider pointed at one base URL (for testing)
  pub fn for_tests(base_url: &str) -> Self {
    let provider = |p: Provider| ProviderConfig {
      api_key: Some("test_key".to_string()),
      base_url: base_url.to_string(),
      rate_limit_per_minute: p.default_rate_limit().max(600),
    };

    Config {
      environment: Environment::Test,
      database_url: None,
      timeout_secs: 5,
      coinmarketcap: provider(Provider::CoinMarketCap),
      coingecko: provider(Provider::CoinGecko),
      binance: provider(Provider::Binance),
      kyberswap: provider(Provider::KyberSwap),
      alerts: AlertConfig::default(),
      refresh: RefreshConfig::default(),
    }
  }

  pub fn provider(&self, provider: Provider) -> &ProviderConfig {
    match provider {
      Provider::CoinMarketCap => &self.coinmarketcap,
      Provider::CoinGecko => &self.coingecko,
      Provider::Binance => &self.binance,
      Provider::KyberSwap => &self.kyberswap,
    }
  }
}

fn provider_from_env(provider: Provider, prefix: &str) -> Result<ProviderConfig> {
  let defaults = ProviderConfig::defaults_for(provider);

  let base_url = env::var(format!("{}_BASE_URL", prefix)).unwrap_or(defaults.base_url);
  url::Url::parse(&base_url)
    .map_err(|e| Error::Config(format!("Invalid {}_BASE_URL: {}", prefix, e)))?;

  let rate_limit_per_minute =
    parse_var(&format!("{}_RATE_LIMIT", prefix), defaults.rate_limit_per_minute)?;
  if rate_limit_per_minute == 0 {
    return Err(Error::Config(format!("{}_RATE_LIMIT must be at least 1", prefix)));
  }

  Ok(ProviderConfig {
    api_key: env::var(format!("{}_API_KEY", prefix)).ok().filter(|v| !v.is_empty()),
    base_url,
    rate_limit_per_minute,
  })
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T> {
  match env::var(name) {
    Ok(value) => value.trim().parse().map_err(|_| Error::Config(format!("Invalid {}", name))),
    Err(_) => Ok(default),
  }
}

fn list_var(name: &str) -> Option<Vec<String>> {
  let value = env::var(name).ok()?;
  let items: Vec<String> =
    value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
  if items.is_empty() { None } else { Some(items) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  const VARS: &[&str] = &[
    "APP_ENV",
    "CF_TIMEOUT_SECS",
    "COINGECKO_PLAN",
    "COINGECKO_BASE_URL",
    "BINANCE_RATE_LIMIT",
    "BINANCE_SYMBOLS",
    "KYBERSWAP_PAIRS",
    "HANDLER_FAILURE_POLICY",
    "FETCH_CONCURRENCY",
  ];

  fn clear_env() {
    for var in VARS {
      env::remove_var(var);
    }
  }

  #[test]
  #[serial]
  fn test_config_from_env_defaults() {
    clear_env();
    let config = Config::from_env().unwrap();
    assert!(!config.environment.is_production());
    assert_eq!(config.binance.base_url, crate::BINANCE_BASE_URL);
    assert_eq!(config.binance.rate_limit_per_minute, crate::BINANCE_RATE_LIMIT);
    assert_eq!(config.refresh.failure_policy, FailurePolicy::Propagate);
    assert_eq!(config.timeout_secs, 30);
  }

  #[test]
  #[serial]
  fn test_config_from_env_overrides() {
    clear_env();
    env::set_var("APP_ENV", "production");
    env::set_var("BINANCE_RATE_LIMIT", "600");
    env::set_var("BINANCE_SYMBOLS", "BTCUSDT, SOLUSDT");
    env::set_var("KYBERSWAP_PAIRS", "0xaaa:0xbbb:1000000");
    env::set_var("HANDLER_FAILURE_POLICY", "swallow");

    let config = Config::from_env().unwrap();
    assert!(config.environment.is_production());
    assert_eq!(config.binance.rate_limit_per_minute, 600);
    assert_eq!(config.refresh.binance_symbols, vec!["BTCUSDT", "SOLUSDT"]);
    assert_eq!(config.refresh.kyberswap_pairs[0].amount_in, "1000000");
    assert_eq!(config.refresh.failure_policy, FailurePolicy::Swallow);
    clear_env();
  }

  #[test]
  #[serial]
  fn test_config_rejects_bad_numbers() {
    clear_env();
    env::set_var("CF_TIMEOUT_SECS", "soon");
    assert!(matches!(Config::from_env(), Err(Error::Config(_))));
    clear_env();
  }

  #[test]
  #[serial]
  fn test_coingecko_pro_plan_switches_host() {
    clear_env();
    env::set_var("COINGECKO_PLAN", "pro");
    let config = Config::from_env().unwrap();
    assert_eq!(config.coingecko.base_url, crate::COINGECKO_PRO_BASE_URL);
    clear_env();
  }

  #[test]
  fn test_quote_pair_parse() {
    let pair: QuotePair = "0xa:0xb:42".parse().unwrap();
    assert_eq!(pair.token_in, "0xa");
    assert!("0xa:0xb".parse::<QuotePair>().is_err());
    assert!("0xa:0xb:lots".parse::<QuotePair>().is_err());
  }

  #[test]
  fn test_for_tests_points_everything_at_mock() {
    let config = Config::for_tests("http://127.0.0.1:9999");
    for p in [Provider::CoinMarketCap, Provider::CoinGecko, Provider::Binance, Provider::KyberSwap]
    {
      assert_eq!(config.provider(p).base_url, "http://127.0.0.1:9999");
    }
  }
}
