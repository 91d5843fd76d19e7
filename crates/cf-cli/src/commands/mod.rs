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

pub mod backfill;
pub mod jobs;
pub mod migrate;
pub mod run;
pub mod stats;
pub mod trigger;

use anyhow::{Context, Result};
use cf_loaders::Domain;

/// Parse a `--payload` argument; absent means `null`
pub fn parse_payload(raw: Option<&str>) -> Result<serde_json::Value> {
  match raw {
    Some(raw) => serde_json::from_str(raw).with_context(|| format!("Invalid JSON payload: {}", raw)),
    None => Ok(serde_json::Value::Null),
  }
}

/// Resolve `--queue` filters, defaulting to every domain
pub fn select_domains(queues: &[String]) -> Result<Vec<Domain>> {
  if queues.is_empty() {
    return Ok(Domain::ALL.to_vec());
  }
  queues.iter().map(|q| q.parse::<Domain>().map_err(anyhow::Error::from)).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_payload_defaults_to_null() {
    assert_eq!(parse_payload(None).unwrap(), serde_json::Value::Null);
    assert_eq!(parse_payload(Some(r#"{"limit": 5}"#)).unwrap()["limit"], 5);
    assert!(parse_payload(Some("{limit")).is_err());
  }

  #[test]
  fn test_queue_filter() {
    assert_eq!(select_domains(&[]).unwrap().len(), Domain::ALL.len());
    let picked = select_domains(&["binance".to_string(), "exchange".to_string()]).unwrap();
    assert_eq!(picked, vec![Domain::Binance, Domain::Exchange]);
    assert!(select_domains(&["stocks".to_string()]).is_err());
  }
}
