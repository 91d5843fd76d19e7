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
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

mod app;
mod commands;

use app::App;
use commands::{
  backfill::BackfillArgs, run::RunArgs, stats::StatsArgs, trigger::TriggerArgs,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "cf")]
#[command(propagate_version = true)]
struct Cli {
  #[command(subcommand)]
  command: Commands,

  /// Verbose output
  #[arg(short, long, global = true)]
  verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Run workers, alert listeners and (in production) the recurring schedules
  Run(RunArgs),

  /// List queues, job names and schedules
  Jobs,

  /// Enqueue one job
  Trigger(TriggerArgs),

  /// Execute one job inline without a queue
  RunOnce(TriggerArgs),

  /// Fetch historical Binance candles
  Backfill(BackfillArgs),

  /// Show job counts per queue
  Stats(StatsArgs),

  /// Apply database migrations
  Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
  // Load environment variables
  dotenv().ok();

  // Parse CLI arguments
  let cli = Cli::parse();

  // Initialize logging; RUST_LOG wins over -v
  let log_level = if cli.verbose { "debug" } else { "info" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
  tracing_subscriber::fmt().with_env_filter(filter).init();

  // Load configuration
  let config = cf_core::Config::from_env()?;

  match cli.command {
    Commands::Jobs => commands::jobs::execute(),
    Commands::Migrate => commands::migrate::execute(&config).await,
    Commands::Run(args) => commands::run::execute(args, App::build(config).await?).await,
    Commands::Trigger(args) => commands::trigger::enqueue(args, App::build(config).await?).await,
    Commands::RunOnce(args) => {
      commands::trigger::run_inline(args, App::build(config).await?).await
    }
    Commands::Backfill(args) => {
      commands::backfill::execute(args, App::build(config).await?).await
    }
    Commands::Stats(args) => commands::stats::execute(args, App::build(config).await?).await,
  }
}
