use thiserror::Error;

/// Errors raised by the queue, the workers and job handlers
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JobError {
  #[error("Unknown job name '{name}' for queue {queue}")]
  UnknownJobName { queue: String, name: String },

  #[error("Invalid job payload: {0}")]
  InvalidPayload(String),

  #[error("Handler failed: {0}")]
  Handler(String),

  #[error("Handler panicked: {0}")]
  Panicked(String),

  #[error("Queue backend error: {0}")]
  Backend(String),

  #[error("Job not found: {0}")]
  NotFound(String),

  #[error("Lock lost for job {0}")]
  LockLost(String),

  #[error("Invalid cron pattern '{pattern}': {message}")]
  InvalidCron { pattern: String, message: String },

  #[error("Alert delivery failed: {0}")]
  Alert(String),
}

impl JobError {
  /// Permanent failures skip the remaining attempts
  pub fn is_permanent(&self) -> bool {
    matches!(self, JobError::UnknownJobName { .. } | JobError::InvalidPayload(_))
  }
}

impl From<serde_json::Error> for JobError {
  fn from(err: serde_json::Error) -> Self {
    JobError::InvalidPayload(err.to_string())
  }
}

impl From<cf_core::Error> for JobError {
  fn from(err: cf_core::Error) -> Self {
    JobError::Handler(err.to_string())
  }
}

pub type JobResult<T> = std::result::Result<T, JobError>;
