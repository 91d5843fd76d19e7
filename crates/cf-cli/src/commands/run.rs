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

use anyhow::Result;
use cf_jobs::{CronScheduler, EventListener, RecurringScheduler, alert_sink_from_config};
use clap::Args;
use std::time::Duration;
use tracing::{info, warn};

use super::select_domains;
use crate::app::App;

/// How long listeners get to flush alerts after the workers stop
const LISTENER_DRAIN: Duration = Duration::from_secs(5);

#[derive(Args, Debug)]
pub struct RunArgs {
  /// Start the recurring schedules even outside production
  #[arg(long, env = "CF_FORCE_SCHEDULE")]
  pub force_schedule: bool,

  /// Only serve these queues (comma separated)
  #[arg(short, long, value_delimiter = ',')]
  pub queue: Vec<String>,
}

pub async fn execute(args: RunArgs, app: App) -> Result<()> {
  let domains = select_domains(&args.queue)?;
  let sink = alert_sink_from_config(&app.config.alerts)?;
  let schedule = app.config.environment.is_production() || args.force_schedule;
  if !schedule {
    info!(
      "Environment is {:?}; recurring schedules disabled (use --force-schedule)",
      app.config.environment
    );
  }

  let mut workers = Vec::new();
  let mut schedulers = Vec::new();
  let mut listeners = Vec::new();

  for domain in domains {
    let queue = app.queue(domain);
    listeners.push(EventListener::spawn(&queue, sink.clone()));
    workers.push(domain.spawn_worker(queue.clone(), app.context.clone()));

    if schedule {
      let mut scheduler = CronScheduler::new(queue);
      domain.schedule_on(&mut scheduler)?;
      info!(queue = %domain, tasks = scheduler.tasks().len(), "Recurring schedule started");
      schedulers.push(scheduler.start());
    }
    info!(queue = %domain, "Worker started");
  }

  tokio::signal::ctrl_c().await?;
  info!("Shutdown requested; draining active jobs");

  for scheduler in schedulers {
    scheduler.shutdown().await;
  }
  for worker in workers {
    worker.shutdown().await;
  }
  for listener in listeners {
    if tokio::time::timeout(LISTENER_DRAIN, listener).await.is_err() {
      warn!("Event listener did not stop in time");
    }
  }

  let swallowed = app.context.swallowed.snapshot();
  if !swallowed.is_empty() {
    warn!("Failures swallowed this run: {:?}", swallowed);
  }
  info!("Stopped");
  Ok(())
}
