pub mod asset_trending;
pub mod candle;
pub mod coingecko_asset;
pub mod exchange;
pub mod queue_job;
pub mod token_quote;

pub use asset_trending::{AssetTrending, NewAssetTrending, TrendingType};
pub use candle::{Candle, NewCandle, partition_key};
pub use coingecko_asset::{CoingeckoAsset, NewCoingeckoListing, NewCoingeckoMarket};
pub use exchange::{Exchange, NewExchange};
pub use queue_job::QueueJobRow;
pub use token_quote::{NewTokenQuote, TokenQuote};
