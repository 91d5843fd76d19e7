pub mod binance;
pub mod coingecko;
pub mod coinmarketcap;
pub mod kyberswap;

use crate::transport::Transport;
use cf_core::Result;
use governor::{
  RateLimiter,
  clock::DefaultClock,
  middleware::NoOpMiddleware,
  state::{InMemoryState, NotKeyed},
};
use std::sync::Arc;

/// Per-provider request budget shared by every endpoint group of that provider
pub type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Base trait for endpoint implementations
///
/// Provides common functionality needed by all endpoint modules
pub trait EndpointBase {
  /// Wait for the provider's request budget before making a request
  async fn wait_for_rate_limit(&self) -> Result<()>;

  /// Get a reference to the transport layer
  fn transport(&self) -> &Arc<Transport>;
}

/// Macro to implement the EndpointBase trait for endpoint structs
macro_rules! impl_endpoint_base {
  ($struct_name:ident) => {
    impl $struct_name {
      /// Create a new endpoint group over a provider transport and its limiter
      pub fn new(
        transport: std::sync::Arc<$crate::transport::Transport>,
        rate_limiter: std::sync::Arc<$crate::endpoints::DirectLimiter>,
      ) -> Self {
        Self { transport, rate_limiter }
      }
    }

    impl $crate::endpoints::EndpointBase for $struct_name {
      async fn wait_for_rate_limit(&self) -> cf_core::Result<()> {
        self.rate_limiter.until_ready().await;
        Ok(())
      }

      fn transport(&self) -> &std::sync::Arc<$crate::transport::Transport> {
        &self.transport
      }
    }
  };
}

pub(crate) use impl_endpoint_base;
