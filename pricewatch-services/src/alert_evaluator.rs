//! Alert Evaluator
//!
//! Compares a pass's price snapshot against pending alerts and fires the
//! ones whose condition holds. Firing is claim-before-notify: the store's
//! conditional `mark_fired` decides ownership, and only the winner sends a
//! notification. A lost notification is logged, never retried, and the
//! alert stays fired.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::alert_store::{AlertStore, AlertStoreError};
use crate::error::ServiceError;
use crate::notifier::{AlertNotification, Notifier};
use crate::price_resolver::PriceSet;

/// Log target for failures an operator needs to see
pub const OPERATOR_TARGET: &str = "pricewatch::operator";

/// Counters from one evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationReport {
    /// Pending alerts compared against a price
    pub checked: usize,
    /// Alerts this evaluation claimed
    pub fired: usize,
    /// Alerts whose condition held but were claimed or removed elsewhere
    pub skipped: usize,
    /// Fired alerts whose notification could not be delivered
    pub notify_failures: usize,
}

/// Evaluates pending alerts against resolved prices
pub struct AlertEvaluator {
    store: Arc<dyn AlertStore>,
    notifier: Arc<dyn Notifier>,
}

impl AlertEvaluator {
    pub fn new(store: Arc<dyn AlertStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Evaluate every pending alert for the assets present in `prices`.
    ///
    /// Assets missing from the set are left alone; their alerts wait for a
    /// later pass. Store failures other than the benign `AlreadyFired` /
    /// `NotFound` outcomes abort the evaluation.
    pub async fn evaluate(&self, prices: &PriceSet) -> Result<EvaluationReport, ServiceError> {
        let mut report = EvaluationReport::default();

        for (asset_id, reading) in prices {
            let pending = self.store.list_pending(asset_id)?;
            let price = reading.price();

            for alert in pending {
                report.checked += 1;
                if !alert.should_fire(price) {
                    continue;
                }

                match self.store.mark_fired(alert.id) {
                    Ok(()) => {}
                    Err(AlertStoreError::AlreadyFired(id)) | Err(AlertStoreError::NotFound(id)) => {
                        debug!("Alert {} was claimed elsewhere, not notifying", id);
                        report.skipped += 1;
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
                report.fired += 1;

                let notification = AlertNotification::new(&alert, reading);
                match self.notifier.notify(&notification).await {
                    Ok(()) => {
                        info!(
                            "Alert {} fired: {} {} {} at {}",
                            alert.id, alert.asset_id, alert.direction, alert.target_price, price
                        );
                    }
                    Err(e) => {
                        report.notify_failures += 1;
                        error!(
                            target: OPERATOR_TARGET,
                            alert_id = alert.id,
                            owner_id = %alert.owner_id,
                            "Alert fired but notification was not delivered: {}",
                            e
                        );
                    }
                }
            }
        }

        Ok(report)
    }
}
