use crate::alert::{AlertSink, JobAlert};
use crate::queue::{Queue, QueueEvent};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Queue-level observer that turns failures into alerts.
///
/// Runs independently of the workers, so a failure is reported no matter
/// which worker (or stalled-lock sweep) recorded it.
pub struct EventListener;

impl EventListener {
  /// Subscribe to `queue` and forward failed jobs to `sink`.
  ///
  /// The task ends once every clone of the queue has been dropped.
  pub fn spawn(queue: &Queue, sink: Arc<dyn AlertSink>) -> JoinHandle<()> {
    let mut events = queue.subscribe();
    let queue_name = queue.name().to_string();

    tokio::spawn(async move {
      loop {
        match events.recv().await {
          Ok(event) => handle_event(&queue_name, sink.as_ref(), event).await,
          Err(RecvError::Lagged(skipped)) => {
            warn!(queue = %queue_name, skipped, "Event listener lagged; events dropped");
          }
          Err(RecvError::Closed) => break,
        }
      }
      debug!(queue = %queue_name, "Event listener stopped");
    })
  }
}

async fn handle_event(queue: &str, sink: &dyn AlertSink, event: QueueEvent) {
  match event {
    QueueEvent::Completed { job_id, name } => {
      debug!(queue, job_id = %job_id, job = %name, "Job completed");
    }
    QueueEvent::Retrying { job_id, name, attempt, delay, error } => {
      warn!(
        queue,
        job_id = %job_id,
        job = %name,
        attempt,
        delay_ms = delay.as_millis() as u64,
        "Job will be retried: {}",
        error
      );
    }
    QueueEvent::Stalled { job_id, name } => {
      warn!(queue, job_id = %job_id, job = %name, "Job stalled and was re-queued");
    }
    QueueEvent::Failed { job_id, name, failed_reason, attempts_made } => {
      let alert = JobAlert { queue: queue.to_string(), job_id, name, failed_reason, attempts_made };
      if let Err(e) = sink.send(&alert).await {
        error!(queue, job_id = %alert.job_id, "Failed to deliver job failure alert: {}", e);
      }
    }
    QueueEvent::Added { .. } | QueueEvent::Active { .. } => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::alert::MockAlertSink;
  use crate::error::JobError;
  use crate::job::{Job, JobName, JobOptions};
  use crate::worker::{JobHandler, Worker, WorkerOptions};
  use crate::JobResult;
  use async_trait::async_trait;
  use mockall::predicate::function;
  use serde_json::json;
  use std::time::Duration;
  use tokio::sync::oneshot;

  crate::job_names! {
    pub enum AlertJob in "alerts" {
      Ok => "alerts:ok",
      Broken => "alerts:broken",
    }
  }

  struct Handler;

  #[async_trait]
  impl JobHandler for Handler {
    type Name = AlertJob;

    async fn handle(&self, name: AlertJob, _job: &Job) -> JobResult<()> {
      match name {
        AlertJob::Ok => Ok(()),
        AlertJob::Broken => Err(JobError::Handler("binance API error (status 400)".into())),
      }
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_job_alerts_with_id_name_and_reason() {
    let queue = Queue::in_memory(AlertJob::QUEUE, JobOptions::default());
    let (tx, rx) = oneshot::channel();
    let tx = std::sync::Mutex::new(Some(tx));

    let mut sink = MockAlertSink::new();
    sink
      .expect_send()
      .with(function(|alert: &JobAlert| {
        alert.job_id == "broken-1"
          && alert.name == "alerts:broken"
          && alert.failed_reason.contains("status 400")
      }))
      .times(1)
      .returning(move |alert| {
        if let Some(tx) = tx.lock().unwrap().take() {
          let _ = tx.send(alert.clone());
        }
        Ok(())
      });

    let listener = EventListener::spawn(&queue, Arc::new(sink));
    let worker = Worker::spawn(queue.clone(), Arc::new(Handler), WorkerOptions::default());

    queue.add(AlertJob::Ok, json!({}), None).await;
    queue.add(AlertJob::Broken, json!({}), Some(JobOptions::default().with_job_id("broken-1"))).await;

    let alert = tokio::time::timeout(Duration::from_secs(5), rx).await.unwrap().unwrap();
    assert_eq!(alert.queue, "alerts");

    worker.shutdown().await;
    drop(queue);
    listener.await.unwrap();
  }

  #[tokio::test(start_paused = true)]
  async fn test_alert_delivery_failure_is_not_fatal() {
    let queue = Queue::in_memory(AlertJob::QUEUE, JobOptions::default());
    let mut sink = MockAlertSink::new();
    sink.expect_send().times(2).returning(|_| Err(JobError::Alert("webhook down".into())));

    let listener = EventListener::spawn(&queue, Arc::new(sink));
    let worker = Worker::spawn(queue.clone(), Arc::new(Handler), WorkerOptions::default());

    queue.add(AlertJob::Broken, json!({}), None).await;
    queue.add(AlertJob::Broken, json!({}), None).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    worker.shutdown().await;
    assert!(!listener.is_finished());
    drop(queue);
    listener.await.unwrap();
  }
}
