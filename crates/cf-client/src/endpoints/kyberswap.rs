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

use super::{DirectLimiter, EndpointBase, impl_endpoint_base};
use crate::transport::Transport;
use cf_core::{Endpoint, Error, Provider, Result};
use cf_models::kyberswap::{KyberRouteResponse, KyberRouteSummary};
use std::sync::Arc;
use tracing::instrument;

/// KyberSwap aggregator endpoints
pub struct KyberSwapEndpoints {
  transport: Arc<Transport>,
  rate_limiter: Arc<DirectLimiter>,
}

impl_endpoint_base!(KyberSwapEndpoints);

impl KyberSwapEndpoints {
  /// Best route quote for swapping `amount_in` base units of `token_in` into `token_out`
  #[instrument(skip(self))]
  pub async fn route(
    &self,
    chain: &str,
    token_in: &str,
    token_out: &str,
    amount_in: &str,
  ) -> Result<KyberRouteSummary> {
    self.wait_for_rate_limit().await?;

    let params = [
      ("tokenIn", token_in.to_string()),
      ("tokenOut", token_out.to_string()),
      ("amountIn", amount_in.to_string()),
    ];
    let response = self
      .transport
      .get_json::<KyberRouteResponse>(Endpoint::KyberSwapRoutes, Some(chain), &params)
      .await?;

    let body = response.data;
    if body.code != 0 {
      return Err(Error::Api {
        provider: Provider::KyberSwap,
        status: response.status,
        message: format!("code {}: {}", body.code, body.message),
      });
    }

    body
      .data
      .map(|d| d.route_summary)
      .ok_or_else(|| Error::InvalidResponse("KyberSwap route without routeSummary".to_string()))
  }
}
