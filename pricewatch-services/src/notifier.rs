//! Alert notifications
//!
//! The evaluator hands every fired alert to a [`Notifier`] exactly once.
//! Delivery failures are reported back but never retried.

use async_trait::async_trait;
use pricewatch_core::{Alert, AlertId, Direction, PriceReading};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

/// Everything a recipient needs to know about a fired alert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertNotification {
    pub alert_id: AlertId,
    pub owner_id: String,
    pub asset_id: String,
    pub target_price: Decimal,
    pub direction: Direction,
    pub current_price: Decimal,
    pub currency: String,
}

impl AlertNotification {
    pub fn new(alert: &Alert, reading: &PriceReading) -> Self {
        Self {
            alert_id: alert.id,
            owner_id: alert.owner_id.clone(),
            asset_id: alert.asset_id.clone(),
            target_price: alert.target_price,
            direction: alert.direction,
            current_price: reading.price(),
            currency: reading.currency().to_string(),
        }
    }

    /// Human-readable message body
    pub fn message(&self) -> String {
        let currency = self.currency.to_uppercase();
        format!(
            "🚨 Price Alert Triggered!\nToken: {}\nCurrent Price: {:.2} {}\nTarget Price: {:.2} {} ({})",
            self.asset_id.to_uppercase(),
            self.current_price,
            currency,
            self.target_price,
            currency,
            self.direction,
        )
    }
}

/// Delivery channel for fired alerts
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &AlertNotification) -> Result<(), NotifyError>;
}

/// Notifier that only logs; used when no chat integration is configured
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &AlertNotification) -> Result<(), NotifyError> {
        info!(
            alert_id = notification.alert_id,
            owner_id = %notification.owner_id,
            "{}",
            notification.message().replace('\n', " | ")
        );
        Ok(())
    }
}

/// Errors from notification delivery
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Delivery unavailable: {0}")]
    DeliveryUnavailable(String),
}
