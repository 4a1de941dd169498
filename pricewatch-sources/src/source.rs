//! Price source trait

use async_trait::async_trait;
use pricewatch_core::PriceReading;

use crate::error::SourceError;

/// One upstream price API
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Short identifier used in configuration and logs (e.g. "coingecko")
    fn name(&self) -> &str;

    /// Fetch the current price of `asset_id` quoted in `currency`.
    ///
    /// Issues at most one request. Implementations must not retry.
    async fn fetch(&self, asset_id: &str, currency: &str) -> Result<PriceReading, SourceError>;
}
