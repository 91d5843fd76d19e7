mod common;

use cf_core::FailurePolicy;
use cf_database_postgres::ExchangeRepository;
use cf_jobs::{
  Backoff, JobError, JobName, JobOptions, Queue, QueueEvent, Worker, WorkerOptions,
};
use cf_loaders::handlers::ExchangeHandler;
use cf_loaders::{ExchangeJob, run_once};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn failing_upstream(expected_calls: u64) -> MockServer {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/v1/exchange/map"))
    .respond_with(ResponseTemplate::new(500).set_body_json(json!({
      "status": {"error_code": 500, "error_message": "Internal error"}
    })))
    .expect(expected_calls)
    .mount(&server)
    .await;
  server
}

fn quick_retries(attempts: u32) -> JobOptions {
  JobOptions { attempts, backoff: Backoff::fixed(Duration::from_millis(20)), ..JobOptions::default() }
}

async fn next_terminal(events: &mut Receiver<QueueEvent>) -> QueueEvent {
  tokio::time::timeout(Duration::from_secs(10), async {
    loop {
      let event = events.recv().await.unwrap();
      if matches!(event, QueueEvent::Completed { .. } | QueueEvent::Failed { .. }) {
        return event;
      }
    }
  })
  .await
  .unwrap()
}

#[tokio::test]
async fn propagate_hands_errors_to_retry_and_fails_after_attempts() {
  let server = failing_upstream(2).await;
  let h = common::harness(&server.uri(), FailurePolicy::Propagate);

  let queue = Queue::in_memory(ExchangeJob::QUEUE, quick_retries(2));
  let mut events = queue.subscribe();
  let worker = Worker::spawn(
    queue.clone(),
    Arc::new(ExchangeHandler::new(h.context.clone())),
    WorkerOptions::default(),
  );

  queue.add(ExchangeJob::FetchData, json!({}), None).await.unwrap();

  match next_terminal(&mut events).await {
    QueueEvent::Failed { name, failed_reason, attempts_made, .. } => {
      assert_eq!(name, "exchange:fetch:data");
      assert_eq!(attempts_made, 2);
      assert!(failed_reason.contains("status 500"), "{failed_reason}");
    }
    other => panic!("expected failure, got {other:?}"),
  }
  worker.shutdown().await;

  server.verify().await;
  assert_eq!(h.context.swallowed.total(), 0);
}

#[tokio::test]
async fn swallow_completes_job_and_counts_failure() {
  let server = failing_upstream(1).await;
  let h = common::harness(&server.uri(), FailurePolicy::Swallow);

  let queue = Queue::in_memory(ExchangeJob::QUEUE, quick_retries(3));
  let mut events = queue.subscribe();
  let worker = Worker::spawn(
    queue.clone(),
    Arc::new(ExchangeHandler::new(h.context.clone())),
    WorkerOptions::default(),
  );

  queue.add(ExchangeJob::FetchData, json!({}), None).await.unwrap();

  assert!(matches!(next_terminal(&mut events).await, QueueEvent::Completed { .. }));
  worker.shutdown().await;

  server.verify().await;
  assert_eq!(h.context.swallowed.count("exchange"), 1);
  assert_eq!(h.store.count_exchanges().await.unwrap(), 0);
}

#[tokio::test]
async fn invalid_payload_fails_even_when_swallowing() {
  let h = common::harness("http://127.0.0.1:9", FailurePolicy::Swallow);

  let err = run_once(h.context.clone(), "binance:fetch:candles", json!({"symbol": "BTCUSDT", "interval": "7m"}))
    .await
    .unwrap_err();

  assert!(matches!(err, JobError::InvalidPayload(_)));
  assert_eq!(h.context.swallowed.total(), 0);
}

#[tokio::test]
async fn unknown_job_name_is_rejected_inline() {
  let h = common::harness("http://127.0.0.1:9", FailurePolicy::Swallow);
  let err = run_once(h.context.clone(), "exchange:fetch:everything", json!(null)).await.unwrap_err();
  assert!(matches!(err, JobError::UnknownJobName { .. }));
}
