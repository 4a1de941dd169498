//! Upstream price sources
//!
//! Each adapter wraps exactly one HTTP price API and normalizes its response
//! into a [`PriceReading`](pricewatch_core::PriceReading). Adapters never
//! retry; fallback policy lives in the resolver.

pub mod coincap;
pub mod coingecko;
pub mod error;
pub mod http;
pub mod jupiter;
pub mod source;

pub use coincap::CoinCapSource;
pub use coingecko::{CoinGeckoSource, CoinGeckoTokenSource};
pub use error::SourceError;
pub use http::{build_http_client, Quote};
pub use jupiter::JupiterSource;
pub use source::PriceSource;
