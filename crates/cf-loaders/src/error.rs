use cf_database_postgres::RepositoryError;
use cf_jobs::JobError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum LoaderError {
  #[error("API error: {0}")]
  ApiError(String),

  #[error("Rate limit exceeded: {0}")]
  RateLimitExceeded(String),

  #[error("Invalid input: {0}")]
  InvalidInput(String),

  #[error("Invalid data: {0}")]
  InvalidData(String),

  #[error("Serialization error: {0}")]
  SerializationError(String),

  #[error("Database error: {0}")]
  DatabaseError(String),

  #[error("Batch processing error: {0}")]
  BatchProcessingError(String),

  #[error("Queue error: {0}")]
  QueueError(String),

  #[error("Configuration error: {0}")]
  ConfigurationError(String),
}

impl LoaderError {
  /// Errors caused by the job itself; retrying or swallowing them hides a caller bug
  pub fn is_invalid_input(&self) -> bool {
    matches!(self, LoaderError::InvalidInput(_))
  }
}

impl From<cf_core::Error> for LoaderError {
  fn from(err: cf_core::Error) -> Self {
    match err {
      cf_core::Error::RateLimit(_) => LoaderError::RateLimitExceeded(err.to_string()),
      cf_core::Error::Config(msg) => LoaderError::ConfigurationError(msg),
      other => LoaderError::ApiError(other.to_string()),
    }
  }
}

impl From<RepositoryError> for LoaderError {
  fn from(err: RepositoryError) -> Self {
    LoaderError::DatabaseError(err.to_string())
  }
}

impl From<serde_json::Error> for LoaderError {
  fn from(err: serde_json::Error) -> Self {
    LoaderError::SerializationError(err.to_string())
  }
}

impl From<JobError> for LoaderError {
  fn from(err: JobError) -> Self {
    LoaderError::QueueError(err.to_string())
  }
}

impl From<LoaderError> for JobError {
  fn from(err: LoaderError) -> Self {
    match err {
      LoaderError::InvalidInput(msg) => JobError::InvalidPayload(msg),
      other => JobError::Handler(other.to_string()),
    }
  }
}

pub type LoaderResult<T> = Result<T, LoaderError>;

#[cfg(test)]
mod tests {
  use super::*;
  use cf_core::Provider;

  #[test]
  fn test_loader_error_display_api_error() {
    let err = LoaderError::ApiError("connection failed".to_string());
    assert_eq!(err.to_string(), "API error: connection failed");
  }

  #[test]
  fn test_rate_limit_from_core_error() {
    let err = LoaderError::from(cf_core::Error::RateLimit(Provider::Binance));
    assert!(matches!(err, LoaderError::RateLimitExceeded(_)));
  }

  #[test]
  fn test_upstream_status_maps_to_api_error() {
    let core_err = cf_core::Error::Api {
      provider: Provider::CoinMarketCap,
      status: 500,
      message: "Internal error".to_string(),
    };
    let err = LoaderError::from(core_err);
    assert!(matches!(err, LoaderError::ApiError(_)));
    assert!(err.to_string().contains("Internal error"));
  }

  #[test]
  fn test_invalid_input_becomes_permanent_job_error() {
    let job_err = JobError::from(LoaderError::InvalidInput("unknown interval '7m'".to_string()));
    assert!(job_err.is_permanent());

    let job_err = JobError::from(LoaderError::DatabaseError("pool timed out".to_string()));
    assert!(!job_err.is_permanent());
    assert_eq!(job_err.to_string(), "Handler failed: Database error: pool timed out");
  }

  #[test]
  fn test_loader_error_from_serde_json_error() {
    let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
    let err = LoaderError::from(json_err);
    assert!(matches!(err, LoaderError::SerializationError(_)));
  }
}
