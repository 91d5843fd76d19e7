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

use anyhow::{Context, Result};
use cf_jobs::EnqueueOutcome;
use cf_loaders::{Domain, run_once};
use clap::Args;
use tracing::info;

use super::parse_payload;
use crate::app::App;

#[derive(Args, Debug)]
pub struct TriggerArgs {
  /// Job name, e.g. `exchange:fetch:data`
  pub job: String,

  /// JSON payload handed to the handler
  #[arg(short, long)]
  pub payload: Option<String>,

  /// Dedup key; a pending job with the same key is left alone
  #[arg(long)]
  pub job_id: Option<String>,
}

/// Enqueue one job into its domain's durable queue
pub async fn enqueue(args: TriggerArgs, app: App) -> Result<()> {
  let domain = Domain::for_job(&args.job).with_context(|| format!("Unknown job '{}'", args.job))?;
  let payload = parse_payload(args.payload.as_deref())?;
  let queue = app.durable_queue(domain)?;

  let mut options = queue.defaults().clone();
  if let Some(job_id) = args.job_id {
    options = options.with_job_id(job_id);
  }

  match queue.try_add_job(&args.job, payload, Some(options)).await? {
    EnqueueOutcome::Added(id) => info!(queue = %domain, job_id = %id, "Enqueued {}", args.job),
    EnqueueOutcome::Duplicate(id) => {
      info!(queue = %domain, job_id = %id, "{} is already pending; nothing enqueued", args.job)
    }
  }
  Ok(())
}

/// Run one handler in this process, bypassing the queue
pub async fn run_inline(args: TriggerArgs, app: App) -> Result<()> {
  let payload = parse_payload(args.payload.as_deref())?;
  run_once(app.context.clone(), &args.job, payload).await?;

  let swallowed = app.context.swallowed.total();
  if swallowed > 0 {
    anyhow::bail!("{} finished with {} swallowed failure(s); see the log", args.job, swallowed);
  }
  info!("{} finished", args.job);
  Ok(())
}
