//! Price Scheduler
//!
//! Drives the refresh-then-evaluate pass on a fixed interval. At most one
//! pass runs at a time: a tick that arrives while a pass is still running is
//! dropped, not queued.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::alert_evaluator::{AlertEvaluator, EvaluationReport};
use crate::error::ServiceError;
use crate::price_resolver::PriceResolver;

/// Configuration for the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between passes
    pub interval: Duration,
    /// Assets resolved on every pass
    pub tracked_assets: Vec<String>,
    /// Currency prices are quoted in
    pub currency: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            tracked_assets: vec![
                "bitcoin".to_string(),
                "ethereum".to_string(),
                "solana".to_string(),
                "cardano".to_string(),
            ],
            currency: "usd".to_string(),
        }
    }
}

/// Summary of one completed pass
#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Assets priced this pass
    pub resolved: usize,
    /// Assets no source could price; their alerts are deferred
    pub skipped: Vec<String>,
    pub evaluation: EvaluationReport,
}

/// What happened to a tick
#[derive(Debug)]
pub enum TickOutcome {
    Completed(PassReport),
    /// The pass started but failed; the scheduler keeps going
    Failed(ServiceError),
    /// Another pass was still running
    Dropped,
}

/// Point-in-time view of the scheduler for health reporting
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub pass_in_progress: bool,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub interval_secs: u64,
    pub tracked_assets: Vec<String>,
}

/// Process-wide schedule state, owned by the scheduler alone
#[derive(Debug, Default)]
struct ScheduleState {
    pass_in_progress: AtomicBool,
    last_tick_at: Mutex<Option<DateTime<Utc>>>,
}

/// Holds `pass_in_progress` for the lifetime of one pass
struct PassGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Periodic driver for price refresh and alert evaluation
pub struct Scheduler {
    resolver: Arc<PriceResolver>,
    evaluator: Arc<AlertEvaluator>,
    config: SchedulerConfig,
    state: ScheduleState,
    running: AtomicBool,
    stop_tx: watch::Sender<bool>,
}

impl Scheduler {
    pub fn new(
        resolver: Arc<PriceResolver>,
        evaluator: Arc<AlertEvaluator>,
        config: SchedulerConfig,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            resolver,
            evaluator,
            config,
            state: ScheduleState::default(),
            running: AtomicBool::new(false),
            stop_tx,
        }
    }

    /// Start the background tick loop.
    ///
    /// The first tick fires immediately. Each tick runs its pass on its own
    /// task so a slow pass never delays tick delivery; overlapping ticks are
    /// dropped by [`Scheduler::tick`].
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let mut stop_rx = self.stop_tx.subscribe();

        tokio::spawn(async move {
            if *stop_rx.borrow() {
                return;
            }

            info!(
                "Starting price scheduler with {}s interval for {} assets",
                self.config.interval.as_secs(),
                self.config.tracked_assets.len()
            );
            self.running.store(true, Ordering::Release);

            let mut ticker = interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;

                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        let this = Arc::clone(&self);
                        tokio::spawn(async move {
                            this.tick().await;
                        });
                    }
                }
            }

            self.running.store(false, Ordering::Release);
            info!("Price scheduler stopped");
        })
    }

    /// Stop scheduling new ticks. A pass already running is left to finish.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    /// Run one pass unless another is in progress
    pub async fn tick(&self) -> TickOutcome {
        let Some(_guard) = PassGuard::acquire(&self.state.pass_in_progress) else {
            warn!("Previous price pass still running, dropping tick");
            return TickOutcome::Dropped;
        };

        *self.state.last_tick_at.lock() = Some(Utc::now());

        match self.run_pass().await {
            Ok(report) => {
                info!(
                    "Price pass complete: {} resolved, {} skipped, {} alerts checked, {} fired",
                    report.resolved,
                    report.skipped.len(),
                    report.evaluation.checked,
                    report.evaluation.fired
                );
                TickOutcome::Completed(report)
            }
            Err(e) => {
                error!("Price pass failed: {}", e);
                TickOutcome::Failed(e)
            }
        }
    }

    /// Refresh every tracked asset upstream, then evaluate alerts against
    /// that snapshot
    async fn run_pass(&self) -> Result<PassReport, ServiceError> {
        let started_at = Utc::now();

        let resolved = self
            .resolver
            .refresh_many(&self.config.tracked_assets, &self.config.currency)
            .await;
        debug!(
            "Resolved {}/{} tracked assets",
            resolved.prices.len(),
            self.config.tracked_assets.len()
        );

        let evaluation = self.evaluator.evaluate(&resolved.prices).await?;

        Ok(PassReport {
            started_at,
            finished_at: Utc::now(),
            resolved: resolved.prices.len(),
            skipped: resolved.skipped,
            evaluation,
        })
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.running.load(Ordering::Acquire),
            pass_in_progress: self.state.pass_in_progress.load(Ordering::Acquire),
            last_tick_at: *self.state.last_tick_at.lock(),
            interval_secs: self.config.interval.as_secs(),
            tracked_assets: self.config.tracked_assets.clone(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<PriceResolver> {
        &self.resolver
    }
}
