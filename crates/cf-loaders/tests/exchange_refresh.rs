mod common;

use cf_core::FailurePolicy;
use cf_database_postgres::ExchangeRepository;
use cf_jobs::{JobName, Queue, QueueEvent};
use cf_loaders::{Domain, ExchangeJob, run_once};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BINANCE_LOGO: &str = "https://s2.coinmarketcap.com/static/img/exchanges/64x64/270.png";

async fn mount_binance(server: &MockServer, weekly_visits: i64) {
  Mock::given(method("GET"))
    .and(path("/v1/exchange/map"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "status": {"error_code": 0, "error_message": null},
      "data": [{"id": 270, "name": "Binance", "slug": "binance", "is_active": 1}]
    })))
    .mount(server)
    .await;

  Mock::given(method("GET"))
    .and(path("/v1/exchange/info"))
    .and(query_param("slug", "binance"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "status": {"error_code": 0, "error_message": null},
      "data": {
        "binance": {
          "id": 270,
          "name": "Binance",
          "slug": "binance",
          "logo": BINANCE_LOGO,
          "date_launched": "2017-07-14",
          "weekly_visits": weekly_visits
        }
      }
    })))
    .mount(server)
    .await;
}

#[tokio::test]
async fn enqueued_fetch_stores_exchange_with_renamed_fields() {
  let server = MockServer::start().await;
  mount_binance(&server, 1_000_000).await;
  let h = common::harness(&server.uri(), FailurePolicy::Propagate);

  let queue = Queue::in_memory(ExchangeJob::QUEUE, Domain::Exchange.job_options());
  let mut events = queue.subscribe();
  let worker = Domain::Exchange.spawn_worker(queue.clone(), h.context.clone());

  queue.add(ExchangeJob::FetchData, json!({}), None).await.unwrap();

  let completed = tokio::time::timeout(Duration::from_secs(10), async {
    loop {
      match events.recv().await.unwrap() {
        event @ QueueEvent::Completed { .. } => break event,
        QueueEvent::Failed { failed_reason, .. } => panic!("job failed: {failed_reason}"),
        _ => {}
      }
    }
  })
  .await
  .unwrap();
  assert!(matches!(completed, QueueEvent::Completed { ref name, .. } if name == "exchange:fetch:data"));
  worker.shutdown().await;

  assert_eq!(h.store.count_exchanges().await.unwrap(), 1);
  let binance = h.store.find_exchange("binance").await.unwrap().unwrap();
  assert_eq!(binance.avatar.as_deref(), Some(BINANCE_LOGO));
  assert_eq!(binance.launched.as_deref(), Some("2017-07-14"));
  assert_eq!(binance.cmc_id, Some(270));
  assert_eq!(binance.updated_by, "coinfeed");
}

#[tokio::test]
async fn rerun_updates_existing_exchange_in_place() {
  let server = MockServer::start().await;
  mount_binance(&server, 1_000_000).await;
  let h = common::harness(&server.uri(), FailurePolicy::Propagate);

  run_once(h.context.clone(), "exchange:fetch:data", json!(null)).await.unwrap();
  let first = h.store.find_exchange("binance").await.unwrap().unwrap();
  assert_eq!(first.weekly_visits, Some(1_000_000));

  server.reset().await;
  mount_binance(&server, 1_250_000).await;
  h.clock.advance(chrono::Duration::hours(1));

  run_once(h.context.clone(), "exchange:fetch:data", json!(null)).await.unwrap();
  let second = h.store.find_exchange("binance").await.unwrap().unwrap();

  assert_eq!(h.store.count_exchanges().await.unwrap(), 1);
  assert_eq!(second.id, first.id);
  assert_eq!(second.weekly_visits, Some(1_250_000));
  assert_eq!(second.created_at, first.created_at);
  assert!(second.updated_at > first.updated_at);
}

#[tokio::test]
async fn identical_reruns_leave_one_row_with_latest_timestamp() {
  let server = MockServer::start().await;
  mount_binance(&server, 42).await;
  let h = common::harness(&server.uri(), FailurePolicy::Propagate);

  run_once(h.context.clone(), "exchange:fetch:data", json!({"slugs": ["binance"]})).await.unwrap();
  h.clock.advance(chrono::Duration::seconds(1));
  run_once(h.context.clone(), "exchange:fetch:data", json!({"slugs": ["binance"]})).await.unwrap();

  assert_eq!(h.store.count_exchanges().await.unwrap(), 1);
  let row = h.store.find_exchange("binance").await.unwrap().unwrap();
  assert_eq!(row.updated_at, h.context.now());
}

#[tokio::test]
async fn slugs_are_requested_in_chunks() {
  let server = MockServer::start().await;
  let slugs: Vec<String> = (0..450).map(|i| format!("ex-{}", i)).collect();

  Mock::given(method("GET"))
    .and(path("/v1/exchange/map"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "status": {"error_code": 0},
      "data": slugs.iter().enumerate().map(|(i, s)| json!({"id": i, "name": s, "slug": s})).collect::<Vec<_>>()
    })))
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/v1/exchange/info"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "status": {"error_code": 0},
      "data": {"ex-0": {"id": 0, "name": "ex-0", "slug": "ex-0"}}
    })))
    .expect(3)
    .mount(&server)
    .await;

  let h = common::harness(&server.uri(), FailurePolicy::Propagate);
  run_once(h.context.clone(), "exchange:fetch:data", json!({})).await.unwrap();

  server.verify().await;
  assert_eq!(h.store.count_exchanges().await.unwrap(), 1);
}
