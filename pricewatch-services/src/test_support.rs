//! In-process fakes for unit tests

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use pricewatch_core::PriceReading;
use pricewatch_sources::{PriceSource, SourceError};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::notifier::{AlertNotification, Notifier, NotifyError};

/// Price source whose answers are set by the test
pub struct ScriptedSource {
    name: String,
    prices: Mutex<HashMap<String, Result<Decimal, SourceError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            prices: Mutex::new(HashMap::new()),
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_price(&self, asset_id: &str, price: Decimal) {
        self.prices.lock().insert(asset_id.to_string(), Ok(price));
    }

    pub fn set_failure(&self, asset_id: &str) {
        self.prices.lock().insert(
            asset_id.to_string(),
            Err(SourceError::unavailable(&self.name, "HTTP 503")),
        );
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, asset_id: &str, currency: &str) -> Result<PriceReading, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self.prices.lock().get(asset_id).cloned();
        match scripted {
            Some(Ok(price)) => Ok(PriceReading::new(asset_id, currency, price, Utc::now(), &self.name)
                .map_err(|e| SourceError::malformed(&self.name, e.to_string()))?),
            Some(Err(e)) => Err(e),
            None => Err(SourceError::unavailable(&self.name, "not scripted")),
        }
    }
}

/// Notifier that records deliveries and can be told to fail
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<AlertNotification>>,
    fail: std::sync::atomic::AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn sent(&self) -> Vec<AlertNotification> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &AlertNotification) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::DeliveryUnavailable(
                "channel closed".to_string(),
            ));
        }
        self.sent.lock().push(notification.clone());
        Ok(())
    }
}
