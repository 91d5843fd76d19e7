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

use anyhow::{Context, Result, bail};
use cf_loaders::CandleLoader;
use chrono::{Duration, Utc};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::app::App;

#[derive(Args, Debug)]
pub struct BackfillArgs {
  /// Binance symbol, e.g. BTCUSDT
  #[arg(short, long)]
  pub symbol: String,

  /// Kline interval (1m, 5m, 1h, 1d, ...)
  #[arg(short, long, default_value = "1h")]
  pub interval: String,

  /// How many days back to fetch
  #[arg(short, long, default_value = "30")]
  pub days: i64,
}

pub async fn execute(args: BackfillArgs, app: App) -> Result<()> {
  if args.days <= 0 {
    bail!("--days must be positive");
  }
  let end = Utc::now();
  let start = end - Duration::days(args.days);
  let expected = CandleLoader::expected_candles(&args.interval, start, end)
    .with_context(|| format!("Unknown interval '{}'", args.interval))?;

  let progress = ProgressBar::new(expected);
  progress.set_style(
    ProgressStyle::default_bar()
      .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")?
      .progress_chars("##-"),
  );
  progress.set_message(format!("{} {}", args.symbol.to_uppercase(), args.interval));

  let bar = progress.clone();
  let result = CandleLoader::backfill(&app.context, &args.symbol, &args.interval, start, end, move |n| {
    bar.inc(n as u64)
  })
  .await;

  match result {
    Ok(output) => {
      progress.finish_with_message("done");
      info!(
        "Backfilled {} {}: {} candles ({} new, {} updated)",
        output.symbol, output.interval, output.fetched, output.summary.inserted, output.summary.updated
      );
      Ok(())
    }
    Err(e) => {
      progress.abandon_with_message("failed");
      Err(e.into())
    }
  }
}
