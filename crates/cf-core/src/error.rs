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

use thiserror::Error;

use crate::Provider;

/// The main error type for cf-* crates
#[derive(Error, Debug)]
pub enum Error {
  /// Environment variable error
  #[error("Environment variable error: {0}")]
  EnvVar(#[from] std::env::VarError),

  /// Configuration error
  #[error("Configuration error: {0}")]
  Config(String),

  /// API key error
  #[error("Missing API key for {0}")]
  ApiKey(Provider),

  /// Serialization/Deserialization error
  #[error("Serialization error: {0}")]
  Serde(#[from] serde_json::Error),

  /// Date/Time parsing error
  #[error("Date parsing error: {0}")]
  ParseDate(#[from] chrono::ParseError),

  /// Upstream rate limit exceeded (HTTP 429 / 418)
  #[error("Rate limit exceeded: {0}")]
  RateLimit(Provider),

  /// Invalid response from an upstream API
  #[error("Invalid API response: {0}")]
  InvalidResponse(String),

  /// HTTP transport error
  #[error("HTTP error: {0}")]
  Http(String),

  /// Error reported by the upstream API
  #[error("{provider} API error (status {status}): {message}")]
  Api { provider: Provider, status: u16, message: String },

  /// Parse error for data processing
  #[error("Parse error: {0}")]
  Parse(String),
}

impl Error {
  /// Errors worth another attempt later (network trouble, throttling, upstream 5xx)
  pub fn is_transient(&self) -> bool {
    match self {
      Error::Http(_) | Error::RateLimit(_) => true,
      Error::Api { status, .. } => *status >= 500,
      _ => false,
    }
  }
}

/// Result type alias for cf-* crates
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_api_error_display() {
    let err =
      Error::Api { provider: Provider::Binance, status: 400, message: "Invalid symbol.".to_string() };
    assert_eq!(err.to_string(), "binance API error (status 400): Invalid symbol.");
  }

  #[test]
  fn test_transient_classification() {
    assert!(Error::RateLimit(Provider::CoinGecko).is_transient());
    assert!(Error::Http("connection reset".to_string()).is_transient());
    assert!(
      Error::Api { provider: Provider::CoinMarketCap, status: 502, message: String::new() }
        .is_transient()
    );
    assert!(
      !Error::Api { provider: Provider::CoinMarketCap, status: 400, message: String::new() }
        .is_transient()
    );
    assert!(!Error::Parse("bad".to_string()).is_transient());
  }
}
