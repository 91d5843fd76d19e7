use async_trait::async_trait;
use cf_jobs::{
  AlertSink, Backoff, CronScheduler, EventListener, Job, JobAlert, JobError, JobHandler, JobName,
  JobOptions, JobResult, Queue, RecurringScheduler, RecurringTask, RetryPolicy, Worker,
  WorkerOptions,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

cf_jobs::job_names! {
  pub enum PipelineJob in "pipeline" {
    Refresh => "pipeline:refresh",
    Flaky => "pipeline:flaky",
  }
}

struct Handler;

#[async_trait]
impl JobHandler for Handler {
  type Name = PipelineJob;

  async fn handle(&self, name: PipelineJob, _job: &Job) -> JobResult<()> {
    match name {
      PipelineJob::Refresh => Ok(()),
      PipelineJob::Flaky => Err(JobError::Handler("coingecko request timed out".into())),
    }
  }
}

#[derive(Default)]
struct RecordingSink {
  alerts: Mutex<Vec<JobAlert>>,
  delivered: Notify,
}

#[async_trait]
impl AlertSink for RecordingSink {
  async fn send(&self, alert: &JobAlert) -> JobResult<()> {
    self.alerts.lock().unwrap().push(alert.clone());
    self.delivered.notify_one();
    Ok(())
  }
}

fn yearly(job: PipelineJob) -> RecurringTask {
  RecurringTask::new(job.as_str(), "0 0 1 1 *", format!("{}:recurring", job.as_str()))
    .run_on_start(true)
}

#[tokio::test]
async fn recurring_jobs_run_and_exhausted_retries_raise_one_alert() {
  let queue = Queue::in_memory(PipelineJob::QUEUE, JobOptions::default());
  let sink = Arc::new(RecordingSink::default());
  let listener = EventListener::spawn(&queue, sink.clone());

  let mut scheduler = CronScheduler::new(queue.clone());
  scheduler.schedule(yearly(PipelineJob::Refresh)).unwrap();
  let flaky_retry = RetryPolicy { attempts: 2, backoff: Backoff::fixed(Duration::from_millis(20)) };
  scheduler.schedule(yearly(PipelineJob::Flaky).with_retry(flaky_retry)).unwrap();
  assert_eq!(scheduler.tasks().len(), 2);

  let options = WorkerOptions { poll_interval: Duration::from_millis(50), ..WorkerOptions::default() };
  let worker = Worker::spawn(queue.clone(), Arc::new(Handler), options);
  let schedules = scheduler.start();

  tokio::time::timeout(Duration::from_secs(10), sink.delivered.notified()).await.unwrap();

  schedules.shutdown().await;
  worker.shutdown().await;

  let alerts = sink.alerts.lock().unwrap().clone();
  assert_eq!(alerts.len(), 1);
  assert_eq!(alerts[0].queue, "pipeline");
  assert_eq!(alerts[0].job_id, "pipeline:flaky:recurring");
  assert_eq!(alerts[0].attempts_made, 2);
  assert!(alerts[0].failed_reason.contains("timed out"));

  let counts = queue.counts().await.unwrap();
  assert_eq!(counts.completed, 1);
  assert_eq!(counts.failed, 1);

  drop(queue);
  listener.abort();
}
