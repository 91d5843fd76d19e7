//! Round trips against a live Postgres.
//!
//! Each test returns early when `DATABASE_URL` is not set.

use cf_database_postgres::models::{NewCandle, NewExchange, partition_key};
use cf_database_postgres::{
  CandleRepository, DatabaseContext, ExchangeRepository, PgQueueBackend, PgStore, UpsertSummary,
  run_migrations,
};
use cf_jobs::{EnqueueOutcome, Job, JobOptions, JobState, QueueBackend, Retention};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use serial_test::serial;

async fn context() -> Option<DatabaseContext> {
  dotenvy::dotenv().ok();
  let url = std::env::var("DATABASE_URL").ok()?;
  run_migrations(&url).await.expect("migrations");
  Some(DatabaseContext::with_pool_config(&url, 2, 0, 5).await.expect("pool"))
}

fn unique(prefix: &str) -> String {
  format!("{}-{}", prefix, uuid_like())
}

fn uuid_like() -> String {
  format!("{:x}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

fn now() -> DateTime<Utc> {
  // Postgres keeps microseconds
  Utc::now().trunc_subsecs(6)
}

fn exchange(slug: &str, weekly_visits: i64, at: DateTime<Utc>) -> NewExchange {
  NewExchange {
    slug: slug.to_string(),
    cmc_id: Some(270),
    name: "Binance".to_string(),
    avatar: Some("https://s2.coinmarketcap.com/static/img/exchanges/64x64/270.png".to_string()),
    description: Some("Spot and derivatives exchange".to_string()),
    launched: Some("2017-07-14T00:00:00.000Z".to_string()),
    notice: None,
    countries: json!([]),
    fiats: json!(["EUR", "USD"]),
    urls: json!({"website": ["https://www.binance.com/"]}),
    exchange_type: None,
    maker_fee: Some(0.02),
    taker_fee: Some(0.04),
    weekly_visits: Some(weekly_visits),
    spot_volume_usd: Some(1.5e10),
    created_at: at,
    updated_at: at,
    updated_by: "postgres_store_test".to_string(),
  }
}

#[tokio::test]
#[serial]
async fn test_exchange_upsert_is_atomic_and_idempotent() {
  let Some(ctx) = context().await else { return };
  let store = PgStore::new(ctx);
  let slug = unique("binance");
  let first_at = now();

  let summary = store.upsert_exchanges(&[exchange(&slug, 100, first_at)]).await.unwrap();
  assert_eq!(summary, UpsertSummary { inserted: 1, updated: 0 });

  let second_at = first_at + Duration::seconds(30);
  let summary = store
    .upsert_exchanges(&[exchange(&slug, 100, first_at), exchange(&slug, 250, second_at)])
    .await
    .unwrap();
  assert_eq!(summary, UpsertSummary { inserted: 0, updated: 1 });

  let row = store.find_exchange(&slug).await.unwrap().unwrap();
  assert_eq!(row.weekly_visits, Some(250));
  assert_eq!(row.created_at, first_at);
  assert_eq!(row.updated_at, second_at);
  assert_eq!(row.launched.as_deref(), Some("2017-07-14T00:00:00.000Z"));
}

#[tokio::test]
#[serial]
async fn test_candle_upsert_and_latest_open_time() {
  let Some(ctx) = context().await else { return };
  let store = PgStore::new(ctx);
  let symbol = format!("T{}USDT", uuid_like().to_uppercase());
  let at = now();
  let open = at - Duration::hours(2);

  let candle = |open_time: DateTime<Utc>, trades: i64| NewCandle {
    symbol: symbol.clone(),
    timeframe: "1h".into(),
    open_time,
    partition_key: partition_key(&symbol, "1h"),
    close_time: open_time + Duration::milliseconds(3_599_999),
    open: 1.into(),
    high: 2.into(),
    low: 1.into(),
    close: 2.into(),
    volume: 10.into(),
    quote_volume: 20.into(),
    trades,
    taker_buy_base_volume: 4.into(),
    taker_buy_quote_volume: 8.into(),
    created_at: at,
    updated_at: at,
    updated_by: "postgres_store_test".into(),
  };

  let summary = store
    .upsert_candles(&[candle(open, 5), candle(open + Duration::hours(1), 6)])
    .await
    .unwrap();
  assert_eq!(summary.inserted, 2);

  let summary = store.upsert_candles(&[candle(open + Duration::hours(1), 9)]).await.unwrap();
  assert_eq!(summary, UpsertSummary { inserted: 0, updated: 1 });
  assert_eq!(
    store.latest_open_time(&symbol, "1h").await.unwrap(),
    Some(open + Duration::hours(1))
  );
  assert_eq!(store.find_candles(&symbol, "1h", 10).await.unwrap()[0].trades, 9);
}

#[tokio::test]
#[serial]
async fn test_queue_backend_dedup_claim_and_complete() {
  let Some(ctx) = context().await else { return };
  let backend = PgQueueBackend::new(ctx, unique("queue"));
  let at = now();
  let options = JobOptions::default().with_job_id("daily");
  let job = Job::new(backend.queue(), "exchange:fetch:data", json!({}), options.clone(), at);

  assert_eq!(backend.push(job.clone()).await.unwrap(), EnqueueOutcome::Added("daily".into()));
  assert_eq!(backend.push(job.clone()).await.unwrap(), EnqueueOutcome::Duplicate("daily".into()));

  let claimed = backend.claim_next(at, at + Duration::seconds(30)).await.unwrap().unwrap();
  assert_eq!(claimed.state, JobState::Active);
  assert_eq!(claimed.attempts_made, 1);
  assert!(backend.claim_next(at, at + Duration::seconds(30)).await.unwrap().is_none());

  backend.complete("daily", at, Retention::Keep).await.unwrap();
  assert_eq!(backend.counts().await.unwrap().completed, 1);

  // terminal jobs are replaced by a new enqueue
  assert_eq!(backend.push(job).await.unwrap(), EnqueueOutcome::Added("daily".into()));
  let fresh = backend.get("daily").await.unwrap().unwrap();
  assert_eq!(fresh.state, JobState::Waiting);
  assert_eq!(fresh.attempts_made, 0);
}

#[tokio::test]
#[serial]
async fn test_queue_backend_recovers_stalled_jobs() {
  let Some(ctx) = context().await else { return };
  let backend = PgQueueBackend::new(ctx, unique("queue"));
  let at = now();
  let job = Job::new(backend.queue(), "binance:fetch:candles", json!({}), JobOptions::default(), at);
  let id = job.id.clone();
  backend.push(job).await.unwrap();

  backend.claim_next(at, at + Duration::seconds(1)).await.unwrap().unwrap();
  let recovery = backend.recover_stalled(at + Duration::seconds(5), 1).await.unwrap();
  assert_eq!(recovery.requeued.len(), 1);
  assert_eq!(recovery.requeued[0].attempts_made, 0);

  let later = at + Duration::seconds(10);
  backend.claim_next(later, later + Duration::seconds(1)).await.unwrap().unwrap();
  let recovery = backend.recover_stalled(later + Duration::seconds(5), 1).await.unwrap();
  assert_eq!(recovery.failed.len(), 1);
  assert_eq!(backend.get(&id).await.unwrap().unwrap().state, JobState::Failed);
}
