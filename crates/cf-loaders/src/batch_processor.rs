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

//! Bounded-parallel fan-out for chunked upstream requests

use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::{debug, warn};

use crate::{LoaderError, LoaderResult};

/// Configuration for batch processing
#[derive(Debug, Clone)]
pub struct BatchConfig {
  /// Maximum number of items in flight at once
  pub max_concurrent: usize,

  /// Whether to continue processing on errors
  pub continue_on_error: bool,
}

impl Default for BatchConfig {
  fn default() -> Self {
    Self { max_concurrent: 4, continue_on_error: true }
  }
}

/// Result of batch processing
#[derive(Debug, Clone)]
pub struct BatchResult<T> {
  /// Outputs of the items that succeeded, in input order
  pub success: Vec<T>,

  /// Failed items with their errors
  pub failures: Vec<(usize, LoaderError)>,

  /// Total items processed
  pub total_processed: usize,
}

impl<T> Default for BatchResult<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> BatchResult<T> {
  pub fn new() -> Self {
    Self { success: Vec::new(), failures: Vec::new(), total_processed: 0 }
  }

  pub fn success_count(&self) -> usize {
    self.success.len()
  }

  pub fn failure_count(&self) -> usize {
    self.failures.len()
  }

  /// True when there was work and none of it succeeded
  pub fn all_failed(&self) -> bool {
    self.total_processed > 0 && self.success.is_empty()
  }

  /// The error of the lowest-indexed failed item
  pub fn first_error(&self) -> Option<&LoaderError> {
    self.failures.iter().min_by_key(|(idx, _)| *idx).map(|(_, e)| e)
  }
}

/// Runs one async call per item with at most `max_concurrent` in flight
#[derive(Debug, Clone)]
pub struct BatchProcessor {
  config: BatchConfig,
}

impl BatchProcessor {
  pub fn new(config: BatchConfig) -> Self {
    Self { config: BatchConfig { max_concurrent: config.max_concurrent.max(1), ..config } }
  }

  pub fn with_concurrency(max_concurrent: usize) -> Self {
    Self::new(BatchConfig { max_concurrent, ..BatchConfig::default() })
  }

  pub async fn process<T, F, Fut, O>(&self, items: Vec<T>, processor: F) -> LoaderResult<BatchResult<O>>
  where
    F: Fn(T) -> Fut,
    Fut: Future<Output = LoaderResult<O>>,
  {
    let total_items = items.len();
    debug!("Processing {} items, {} at a time", total_items, self.config.max_concurrent);

    let mut results = stream::iter(items.into_iter().enumerate())
      .map(|(idx, item)| {
        let fut = processor(item);
        async move { (idx, fut.await) }
      })
      .buffer_unordered(self.config.max_concurrent);

    let mut success = Vec::with_capacity(total_items);
    let mut failures = Vec::new();
    while let Some((idx, outcome)) = results.next().await {
      match outcome {
        Ok(output) => success.push((idx, output)),
        Err(e) => {
          warn!("Failed to process item {}: {}", idx, e);
          if !self.config.continue_on_error {
            return Err(LoaderError::BatchProcessingError(format!(
              "Batch processing failed at item {}: {}",
              idx, e
            )));
          }
          failures.push((idx, e));
        }
      }
    }
    success.sort_by_key(|(idx, _)| *idx);

    let result = BatchResult {
      success: success.into_iter().map(|(_, output)| output).collect(),
      failures,
      total_processed: total_items,
    };
    debug!(
      "Batch processing complete: {} successes, {} failures",
      result.success_count(),
      result.failure_count()
    );
    Ok(result)
  }
}

/// Helper function to create batches from an iterator
pub fn create_batches<T>(items: impl Iterator<Item = T>, batch_size: usize) -> Vec<Vec<T>> {
  let batch_size = batch_size.max(1);
  let mut batches = Vec::new();
  let mut current_batch = Vec::with_capacity(batch_size);

  for item in items {
    current_batch.push(item);
    if current_batch.len() >= batch_size {
      batches.push(std::mem::replace(&mut current_batch, Vec::with_capacity(batch_size)));
    }
  }

  if !current_batch.is_empty() {
    batches.push(current_batch);
  }

  batches
}
