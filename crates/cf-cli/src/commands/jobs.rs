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
use cf_jobs::Backoff;
use cf_loaders::Domain;

/// List every queue with its job names, limits and recurring patterns
pub fn execute() -> Result<()> {
  for domain in Domain::ALL {
    let retry = domain.retry_policy();
    let worker = domain.worker_options();
    let backoff = match retry.backoff {
      Backoff::Fixed { delay_ms } => format!("fixed {}ms", delay_ms),
      Backoff::Exponential { base_ms } => format!("exponential from {}ms", base_ms),
    };

    println!("{}", domain);
    println!("  concurrency: {}", worker.concurrency);
    if let Some(limit) = worker.limiter {
      println!("  rate limit:  {} per {:?}", limit.max, limit.duration);
    }
    println!("  retries:     {} attempts, {}", retry.attempts, backoff);
    for name in domain.job_names() {
      let pattern = domain
        .recurring_tasks()
        .into_iter()
        .find(|task| task.name == name)
        .map(|task| task.pattern)
        .unwrap_or_else(|| "-".to_string());
      println!("  {:<40} {}", name, pattern);
    }
    println!();
  }
  Ok(())
}
