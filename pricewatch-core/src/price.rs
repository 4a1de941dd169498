//! Canonical price readings

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::PricewatchError;

/// A single resolved price observation
///
/// Readings are immutable once constructed: every upstream response is
/// normalized into one of these and then shared read-only by the cache and
/// every alert that references the asset. Only constructible through
/// [`PriceReading::new`], so a stored reading never carries a negative price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceReading {
    asset_id: String,
    currency: String,
    price: Decimal,
    observed_at: DateTime<Utc>,
    /// Name of the source that produced this reading
    source: String,
    /// 24h change in percent, when the upstream reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    change_24h: Option<Decimal>,
}

impl PriceReading {
    /// Build a reading, rejecting negative prices
    pub fn new(
        asset_id: impl Into<String>,
        currency: impl Into<String>,
        price: Decimal,
        observed_at: DateTime<Utc>,
        source: impl Into<String>,
    ) -> Result<Self, PricewatchError> {
        let asset_id = asset_id.into();
        if price.is_sign_negative() && !price.is_zero() {
            return Err(PricewatchError::invalid_input(format!(
                "negative price {} for {}",
                price, asset_id
            )));
        }

        Ok(Self {
            asset_id,
            currency: currency.into(),
            price,
            observed_at,
            source: source.into(),
            change_24h: None,
        })
    }

    /// Attach the upstream's 24h change percentage
    pub fn with_change_24h(mut self, change_24h: Option<Decimal>) -> Self {
        self.change_24h = change_24h;
        self
    }

    pub fn asset_id(&self) -> &str {
        &self.asset_id
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn change_24h(&self) -> Option<Decimal> {
        self.change_24h
    }
}
