//! Price resolution and alert triggering services
//!
//! This crate ties the price sources to a cache and a fallback resolver,
//! persists user alerts, and runs the periodic refresh-then-evaluate pass
//! that fires them.

pub mod alert_evaluator;
pub mod alert_store;
pub mod config;
#[cfg(feature = "discord")]
pub mod discord_notifier;
pub mod error;
pub mod notifier;
pub mod price_cache;
pub mod price_resolver;
pub mod scheduler;

#[cfg(test)]
mod test_support;

pub use alert_evaluator::{AlertEvaluator, EvaluationReport, OPERATOR_TARGET};
pub use alert_store::{AlertStore, AlertStoreError, SqliteAlertStore};
pub use config::{ConfigError, PricewatchConfig, SourceKind};
#[cfg(feature = "discord")]
pub use discord_notifier::DiscordNotifier;
pub use error::ServiceError;
pub use notifier::{AlertNotification, LogNotifier, Notifier, NotifyError};
pub use price_cache::{CacheLookup, CacheStats, PriceCache};
pub use price_resolver::{PriceResolver, PriceSet, ResolveError, ResolvedPrices, ResolverConfig};
pub use scheduler::{PassReport, Scheduler, SchedulerConfig, SchedulerStatus, TickOutcome};
