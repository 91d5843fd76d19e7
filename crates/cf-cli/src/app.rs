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

//! Composition root: every long-lived service is built here once and handed
//! to the commands explicitly.

use anyhow::{Context, Result, bail};
use cf_client::ProviderClients;
use cf_core::Config;
use cf_database_postgres::{DatabaseContext, MemoryStore, PgQueueBackend, PgStore, RefreshStore};
use cf_jobs::{MemoryQueueBackend, MonotonicClock, Queue, QueueBackend};
use cf_loaders::{Domain, LoaderConfig, LoaderContext};
use std::sync::Arc;
use tracing::{info, warn};

pub struct App {
  pub config: Config,
  pub db: Option<DatabaseContext>,
  pub context: Arc<LoaderContext>,
}

impl App {
  pub async fn build(config: Config) -> Result<Self> {
    let db = match &config.database_url {
      Some(url) => {
        let ctx = DatabaseContext::new(url).await.context("Failed to connect to the database")?;
        info!("Connected to Postgres");
        Some(ctx)
      }
      None => {
        warn!("DATABASE_URL not set; using in-memory storage and queues");
        None
      }
    };
    Self::with_database(config, db)
  }

  pub fn with_database(config: Config, db: Option<DatabaseContext>) -> Result<Self> {
    let store: Arc<dyn RefreshStore> = match &db {
      Some(ctx) => Arc::new(PgStore::new(ctx.clone())),
      None => Arc::new(MemoryStore::new()),
    };
    let clients = ProviderClients::new(&config).context("Failed to build provider clients")?;
    let loader_config = LoaderConfig::from_refresh(&config.refresh);
    let context = Arc::new(LoaderContext::new(clients, store, loader_config));

    Ok(Self { config, db, context })
  }

  /// Queue for `domain`, Postgres-backed when a database is configured
  pub fn queue(&self, domain: Domain) -> Queue {
    let backend: Arc<dyn QueueBackend> = match &self.db {
      Some(ctx) => Arc::new(PgQueueBackend::new(ctx.clone(), domain.queue_name())),
      None => Arc::new(MemoryQueueBackend::new()),
    };
    Queue::new(domain.queue_name(), backend, domain.job_options(), MonotonicClock::shared())
  }

  /// Queue for commands whose effect must outlive the process
  pub fn durable_queue(&self, domain: Domain) -> Result<Queue> {
    if self.db.is_none() {
      bail!("DATABASE_URL is required to reach the '{}' queue", domain);
    }
    Ok(self.queue(domain))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_without_database_queues_are_in_memory() {
    let app = App::build(Config::for_tests("http://127.0.0.1:9")).await.unwrap();
    assert!(app.db.is_none());
    assert!(app.durable_queue(Domain::Exchange).is_err());

    let queue = app.queue(Domain::Binance);
    assert_eq!(queue.name(), "binance");
    assert_eq!(queue.defaults().attempts, Domain::Binance.job_options().attempts);
  }
}
