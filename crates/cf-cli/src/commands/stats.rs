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
use clap::Args;

use super::select_domains;
use crate::app::App;

#[derive(Args, Debug)]
pub struct StatsArgs {
  /// Only report these queues (comma separated)
  #[arg(short, long, value_delimiter = ',')]
  pub queue: Vec<String>,
}

/// Print job counts per queue
pub async fn execute(args: StatsArgs, app: App) -> Result<()> {
  let domains = select_domains(&args.queue)?;

  println!(
    "{:<18} {:>8} {:>8} {:>8} {:>10} {:>8}",
    "queue", "waiting", "delayed", "active", "completed", "failed"
  );
  for domain in domains {
    let counts = app.durable_queue(domain)?.counts().await?;
    println!(
      "{:<18} {:>8} {:>8} {:>8} {:>10} {:>8}",
      domain.queue_name(),
      counts.waiting,
      counts.delayed,
      counts.active,
      counts.completed,
      counts.failed
    );
  }
  Ok(())
}
