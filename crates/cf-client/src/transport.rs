//! HTTP transport layer for upstream provider requests

use cf_core::{Endpoint, Error, Provider, ProviderConfig, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

/// How a provider expects its API key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Header { name: &'static str, value: String },
    Query { name: &'static str, value: String },
}

/// Decoded body plus the HTTP status it arrived with
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: u16,
}

/// HTTP transport for one upstream provider.
///
/// A transport never retries. A failed request surfaces as an error and the
/// job queue decides whether and when to try again.
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    provider: Provider,
    base_url: String,
    auth: Auth,
    timeout: Duration,
}

impl Transport {
    /// Create a new transport instance
    pub fn new(provider: Provider, config: &ProviderConfig, timeout_secs: u64) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("coinfeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            provider,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth: auth_for(provider, config),
            timeout,
        })
    }

    /// Create a mock transport for testing
    #[cfg(test)]
    pub fn new_mock(provider: Provider) -> Self {
        let config = ProviderConfig {
            api_key: Some("test_key".to_string()),
            base_url: "https://mock.coinfeed.local".to_string(),
            rate_limit_per_minute: 60,
        };
        Self {
            client: Client::new(),
            provider,
            base_url: config.base_url.clone(),
            auth: auth_for(provider, &config),
            timeout: Duration::from_secs(30),
        }
    }

    /// GET an endpoint and decode the JSON body.
    ///
    /// `prefix` is inserted between the base URL and the endpoint path
    /// (KyberSwap routes are scoped by chain, e.g. `/ethereum/api/v1/routes`).
    #[instrument(skip(self, params), fields(provider = %self.provider, endpoint = %endpoint))]
    pub async fn get_json<T>(
        &self,
        endpoint: Endpoint,
        prefix: Option<&str>,
        params: &[(&str, String)],
    ) -> Result<ApiResponse<T>>
    where
        T: DeserializeOwned,
    {
        let url = self.build_url(endpoint, prefix, params)?;
        debug!("Making request to: {}", url.path());

        let mut request = self.client.get(url);
        if let Auth::Header { name, value } = &self.auth {
            request = request.header(*name, value);
        }

        let response = request.send().await.map_err(|e| Error::Http(format!("Request failed: {}", e)))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("Failed to read response body: {}", e)))?;

        debug!("Response status {} body length: {} bytes", status, text.len());

        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::IM_A_TEAPOT {
            return Err(Error::RateLimit(self.provider));
        }

        if !status.is_success() {
            error!("Request failed with status: {}", status);
            return Err(Error::Api {
                provider: self.provider,
                status: status.as_u16(),
                message: extract_error_message(&text).unwrap_or_else(|| excerpt(&text, 200).to_string()),
            });
        }

        match serde_json::from_str::<T>(&text) {
            Ok(data) => Ok(ApiResponse { data, status: status.as_u16() }),
            Err(e) => {
                error!("Failed to parse JSON response: {}", e);
                Err(Error::Parse(format!(
                    "Failed to parse {} response: {}. Response: {}",
                    endpoint,
                    e,
                    excerpt(&text, 200)
                )))
            }
        }
    }

    /// Build the full URL for an API request
    fn build_url(&self, endpoint: Endpoint, prefix: Option<&str>, params: &[(&str, String)]) -> Result<Url> {
        let prefix = prefix.map(|p| format!("/{}", p.trim_matches('/'))).unwrap_or_default();
        let mut url = Url::parse(&format!("{}{}{}", self.base_url, prefix, endpoint.path()))
            .map_err(|e| Error::Http(format!("Invalid base URL: {}", e)))?;

        if !params.is_empty() || matches!(self.auth, Auth::Query { .. }) {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in params {
                query_pairs.append_pair(key, value);
            }
            if let Auth::Query { name, value } = &self.auth {
                query_pairs.append_pair(name, value);
            }
        }

        Ok(url)
    }

    /// Get the provider this transport talks to
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Get the base URL being used
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get request timeout duration
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn auth_for(provider: Provider, config: &ProviderConfig) -> Auth {
    let Some(key) = config.api_key.clone() else {
        return match provider {
            Provider::KyberSwap => Auth::Header { name: "x-client-id", value: "coinfeed".to_string() },
            _ => Auth::None,
        };
    };

    match provider {
        Provider::CoinMarketCap => Auth::Header { name: "X-CMC_PRO_API_KEY", value: key },
        Provider::CoinGecko if config.base_url.contains("pro-api") => {
            Auth::Header { name: "x-cg-pro-api-key", value: key }
        }
        Provider::CoinGecko => Auth::Query { name: "x_cg_demo_api_key", value: key },
        // Public market data endpoints need no key
        Provider::Binance => Auth::None,
        Provider::KyberSwap => Auth::Header { name: "x-client-id", value: key },
    }
}

/// Pull a human-readable message out of the error bodies providers send
fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let candidates = [
        value.pointer("/status/error_message"),
        value.pointer("/error"),
        value.pointer("/msg"),
        value.pointer("/message"),
    ];
    let message = candidates.into_iter().flatten().find_map(|v| v.as_str().map(str::to_string));
    message
}

fn excerpt(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
