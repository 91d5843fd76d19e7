//! Outbound failure notifications.

use crate::error::{JobError, JobResult};
use async_trait::async_trait;
use cf_core::AlertConfig;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// What an operator sees when a job gives up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobAlert {
  pub queue: String,
  pub job_id: String,
  pub name: String,
  pub failed_reason: String,
  pub attempts_made: u32,
}

impl JobAlert {
  /// One-line chat message
  pub fn message(&self) -> String {
    format!(
      "[{}] job {} ({}) failed after {} attempt(s): {}",
      self.queue, self.job_id, self.name, self.attempts_made, self.failed_reason
    )
  }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertSink: Send + Sync {
  async fn send(&self, alert: &JobAlert) -> JobResult<()>;
}

/// Writes alerts to the log only
#[derive(Debug, Default)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
  async fn send(&self, alert: &JobAlert) -> JobResult<()> {
    error!(
      queue = %alert.queue,
      job_id = %alert.job_id,
      job = %alert.name,
      attempts = alert.attempts_made,
      "Job failed: {}",
      alert.failed_reason
    );
    Ok(())
  }
}

fn http_client() -> JobResult<reqwest::Client> {
  reqwest::Client::builder()
    .timeout(Duration::from_secs(10))
    .build()
    .map_err(|e| JobError::Alert(format!("Failed to create HTTP client: {}", e)))
}

/// Posts alerts to a Discord channel webhook
#[derive(Debug, Clone)]
pub struct DiscordWebhookSink {
  client: reqwest::Client,
  webhook_url: String,
}

impl DiscordWebhookSink {
  pub fn new(webhook_url: impl Into<String>) -> JobResult<Self> {
    Ok(Self { client: http_client()?, webhook_url: webhook_url.into() })
  }
}

#[async_trait]
impl AlertSink for DiscordWebhookSink {
  async fn send(&self, alert: &JobAlert) -> JobResult<()> {
    let response = self
      .client
      .post(&self.webhook_url)
      .json(&json!({ "content": alert.message() }))
      .send()
      .await
      .map_err(|e| JobError::Alert(format!("Discord webhook request failed: {}", e)))?;

    if !response.status().is_success() {
      return Err(JobError::Alert(format!("Discord webhook returned {}", response.status())));
    }
    Ok(())
  }
}

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Sends alerts through a Telegram bot
#[derive(Debug, Clone)]
pub struct TelegramSink {
  client: reqwest::Client,
  api_base: String,
  bot_token: String,
  chat_id: String,
}

impl TelegramSink {
  pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> JobResult<Self> {
    Self::with_api_base(TELEGRAM_API_BASE, bot_token, chat_id)
  }

  pub fn with_api_base(
    api_base: impl Into<String>,
    bot_token: impl Into<String>,
    chat_id: impl Into<String>,
  ) -> JobResult<Self> {
    Ok(Self {
      client: http_client()?,
      api_base: api_base.into().trim_end_matches('/').to_string(),
      bot_token: bot_token.into(),
      chat_id: chat_id.into(),
    })
  }
}

#[async_trait]
impl AlertSink for TelegramSink {
  async fn send(&self, alert: &JobAlert) -> JobResult<()> {
    let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
    let response = self
      .client
      .post(url)
      .json(&json!({ "chat_id": self.chat_id, "text": alert.message() }))
      .send()
      .await
      // the URL carries the token, keep it out of the error
      .map_err(|e| JobError::Alert(format!("Telegram request failed: {}", e.without_url())))?;

    if !response.status().is_success() {
      return Err(JobError::Alert(format!("Telegram returned {}", response.status())));
    }
    Ok(())
  }
}

/// Delivers every alert to all inner sinks; fails if any of them failed
pub struct FanoutAlertSink {
  sinks: Vec<Arc<dyn AlertSink>>,
}

impl FanoutAlertSink {
  pub fn new(sinks: Vec<Arc<dyn AlertSink>>) -> Self {
    Self { sinks }
  }

  pub fn len(&self) -> usize {
    self.sinks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.sinks.is_empty()
  }
}

#[async_trait]
impl AlertSink for FanoutAlertSink {
  async fn send(&self, alert: &JobAlert) -> JobResult<()> {
    let results = futures::future::join_all(self.sinks.iter().map(|s| s.send(alert))).await;
    let errors: Vec<String> =
      results.into_iter().filter_map(|r| r.err()).map(|e| e.to_string()).collect();

    if errors.is_empty() { Ok(()) } else { Err(JobError::Alert(errors.join("; "))) }
  }
}

/// Log sink plus whichever chat channels are configured
pub fn alert_sink_from_config(config: &AlertConfig) -> JobResult<Arc<dyn AlertSink>> {
  let mut sinks: Vec<Arc<dyn AlertSink>> = vec![Arc::new(LogAlertSink)];

  if let Some(url) = &config.discord_webhook_url {
    sinks.push(Arc::new(DiscordWebhookSink::new(url.clone())?));
  }

  match (&config.telegram_bot_token, &config.telegram_chat_id) {
    (Some(token), Some(chat)) => sinks.push(Arc::new(TelegramSink::new(token.clone(), chat.clone())?)),
    (Some(_), None) | (None, Some(_)) => {
      warn!("Telegram alerts need both TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID; skipping");
    }
    (None, None) => {}
  }

  Ok(Arc::new(FanoutAlertSink::new(sinks)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{body_partial_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn alert() -> JobAlert {
    JobAlert {
      queue: "exchange".into(),
      job_id: "exchange-daily".into(),
      name: "exchange:fetch:data".into(),
      failed_reason: "coinmarketcap API error (status 500): oops".into(),
      attempts_made: 3,
    }
  }

  #[test]
  fn test_alert_message_carries_id_name_and_reason() {
    let msg = alert().message();
    assert!(msg.contains("exchange-daily"));
    assert!(msg.contains("exchange:fetch:data"));
    assert!(msg.contains("status 500"));
  }

  #[tokio::test]
  async fn test_discord_webhook_posts_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/webhooks/1/abc"))
      .and(body_partial_json(json!({ "content": alert().message() })))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&server)
      .await;

    let sink = DiscordWebhookSink::new(format!("{}/api/webhooks/1/abc", server.uri())).unwrap();
    sink.send(&alert()).await.unwrap();
  }

  #[tokio::test]
  async fn test_telegram_error_status_is_alert_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/botTOKEN/sendMessage"))
      .and(body_partial_json(json!({ "chat_id": "42" })))
      .respond_with(ResponseTemplate::new(403))
      .mount(&server)
      .await;

    let sink = TelegramSink::with_api_base(server.uri(), "TOKEN", "42").unwrap();
    assert!(matches!(sink.send(&alert()).await, Err(JobError::Alert(_))));
  }

  #[tokio::test]
  async fn test_fanout_reaches_every_sink_and_reports_failures() {
    let mut ok = MockAlertSink::new();
    ok.expect_send().times(1).returning(|_| Ok(()));
    let mut broken = MockAlertSink::new();
    broken.expect_send().times(1).returning(|_| Err(JobError::Alert("webhook down".into())));

    let fanout = FanoutAlertSink::new(vec![Arc::new(ok), Arc::new(broken)]);
    let err = fanout.send(&alert()).await.unwrap_err();
    assert_eq!(err, JobError::Alert("Alert delivery failed: webhook down".into()));
  }

  #[test]
  fn test_sink_from_config_skips_partial_telegram() {
    let config = AlertConfig {
      discord_webhook_url: Some("http://127.0.0.1:1/hook".into()),
      telegram_bot_token: Some("t".into()),
      telegram_chat_id: None,
    };
    assert!(alert_sink_from_config(&config).is_ok());
  }
}
