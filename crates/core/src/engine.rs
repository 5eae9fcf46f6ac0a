//! Per-asset lifecycle engine.
//!
//! Owns every [`AssetRecord`], buys newly discovered assets, and runs one
//! recurring check per monitored asset that evaluates the threshold rules.
//!
//! Locking: the registry is a `DashMap` of `Arc<Mutex<AssetRecord>>`. A
//! record's mutex is held for the full duration of a tick or follow-up so
//! two evaluations of the same asset never interleave, while different
//! assets proceed independently. Closing a record happens under its lock and
//! signals the record's watch channel, and every task re-checks state after
//! taking the lock, so nothing acts on a closed record.

use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::config::{SniperConfig, ThresholdConfig};
use crate::ledger::DedupLedger;
use crate::record::{AssetRecord, AssetSnapshot, AssetState};
use crate::rules::{self, Rule};
use sniper_api::{ExecutionEndpoint, NoopNotifier, Notifier, TradeOrder, ValuationSource};

type RecordHandle = Arc<Mutex<AssetRecord>>;

/// Engine parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base-currency amount spent on each buy
    pub buy_amount: f64,
    /// Threshold rules
    pub thresholds: ThresholdConfig,
    /// Recurring check interval
    pub poll_interval: Duration,
    /// Delay before the take-profit follow-up
    pub follow_up_delay: Duration,
    /// Maximum open records (0 = unlimited)
    pub max_tracked_assets: usize,
    /// Market cap that triggers a one-time alert per record (0 = off)
    pub alert_market_cap: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(&SniperConfig::default())
    }
}

impl From<&SniperConfig> for EngineConfig {
    fn from(cfg: &SniperConfig) -> Self {
        Self {
            buy_amount: cfg.trade.buy_amount,
            thresholds: cfg.thresholds.clone(),
            poll_interval: cfg.timing.poll_interval(),
            follow_up_delay: cfg.timing.follow_up_delay(),
            max_tracked_assets: cfg.limits.max_tracked_assets,
            alert_market_cap: cfg.alerts.market_cap,
        }
    }
}

/// Outcome of handing an identifier to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    /// Identifier was already acted upon
    AlreadySeen,
    /// Too many open records; identifier left unseen
    AtCapacity,
    /// Buy instruction failed; identifier stays seen
    BuyFailed,
    /// Bought and reference captured
    Monitoring,
    /// Bought, reference will be captured on a later tick
    AwaitingValuation,
}

struct Inner {
    valuation: Arc<dyn ValuationSource>,
    executor: Arc<dyn ExecutionEndpoint>,
    notifier: Arc<dyn Notifier>,
    ledger: DedupLedger,
    records: DashMap<String, RecordHandle>,
    /// Records holding a capacity slot (buy in flight, Bought, Monitoring)
    active: AtomicUsize,
    config: EngineConfig,
}

/// Lifecycle engine. Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct LifecycleEngine {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for LifecycleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEngine")
            .field("tracked", &self.inner.records.len())
            .field("active", &self.active_count())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl LifecycleEngine {
    /// Engine without operator alerts.
    pub fn new(
        valuation: Arc<dyn ValuationSource>,
        executor: Arc<dyn ExecutionEndpoint>,
        config: EngineConfig,
    ) -> Self {
        Self::with_notifier(valuation, executor, Arc::new(NoopNotifier), config)
    }

    pub fn with_notifier(
        valuation: Arc<dyn ValuationSource>,
        executor: Arc<dyn ExecutionEndpoint>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        info!(
            live = executor.is_live(),
            buy_amount = config.buy_amount,
            max_tracked = config.max_tracked_assets,
            alert_market_cap = config.alert_market_cap,
            "Lifecycle engine initialized"
        );

        Self {
            inner: Arc::new(Inner {
                valuation,
                executor,
                notifier,
                ledger: DedupLedger::new(),
                records: DashMap::new(),
                active: AtomicUsize::new(0),
                config,
            }),
        }
    }

    /// Handle a newly created asset.
    ///
    /// At most one buy is ever issued per identifier: the ledger entry is
    /// written before the buy and kept even if the buy fails.
    #[instrument(skip(self))]
    pub async fn on_asset_discovered(&self, id: &str) -> Discovery {
        if self.inner.ledger.has_seen(id) {
            debug!("Already seen, ignoring");
            return Discovery::AlreadySeen;
        }

        if !self.try_reserve_slot() {
            info!(
                max = self.inner.config.max_tracked_assets,
                "Tracking limit reached, skipping"
            );
            return Discovery::AtCapacity;
        }

        if !self.inner.ledger.check_and_mark(id) {
            // Lost the race to a concurrent notice for the same asset
            self.release_slot();
            return Discovery::AlreadySeen;
        }

        let handle: RecordHandle = Arc::new(Mutex::new(AssetRecord::new(id)));
        // Locked before publishing so readers wait for the buy to settle
        let mut record = handle.lock().await;
        self.inner.records.insert(id.to_string(), handle.clone());

        let order = TradeOrder::buy(id, self.inner.config.buy_amount);
        let receipt = match self.inner.executor.execute(&order).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(error = %e, "Buy failed, asset will not be retried");
                self.close_record(&mut record);
                drop(record);
                self.inner.records.remove(id);
                return Discovery::BuyFailed;
            }
        };

        info!(
            amount = self.inner.config.buy_amount,
            signature = %receipt.signature,
            "Bought new asset"
        );
        record.mark_bought(receipt.signature);

        let outcome = match self.inner.valuation.quote(id).await {
            Ok(quote) => {
                record.ticker = quote.ticker;
                if record.capture_reference(quote.valuation) {
                    info!(
                        ticker = record.ticker.as_deref().unwrap_or("?"),
                        reference = quote.valuation,
                        "Monitoring started"
                    );
                    Discovery::Monitoring
                } else {
                    warn!(valuation = quote.valuation, "Unusable initial valuation");
                    Discovery::AwaitingValuation
                }
            }
            Err(e) => {
                warn!(error = %e, "Initial valuation lookup failed, retrying on next tick");
                Discovery::AwaitingValuation
            }
        };

        let cancel = record.subscribe_cancel();
        drop(record);
        self.spawn_monitor(id.to_string(), handle, cancel);

        outcome
    }

    /// Close a record and stop its recurring check and pending follow-up.
    ///
    /// Returns `false` for unknown or already closed identifiers.
    #[instrument(skip(self))]
    pub async fn cancel_monitoring(&self, id: &str) -> bool {
        let Some(handle) = self.handle(id) else {
            return false;
        };
        let mut record = handle.lock().await;
        let closed = self.close_record(&mut record);
        if closed {
            info!("Monitoring cancelled");
        }
        closed
    }

    /// Close every open record. Returns how many were closed.
    pub async fn shutdown(&self) -> usize {
        let handles: Vec<RecordHandle> = self
            .inner
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let mut closed = 0;
        for handle in handles {
            let mut record = handle.lock().await;
            if self.close_record(&mut record) {
                closed += 1;
            }
        }

        info!(closed, "Lifecycle engine shut down");
        closed
    }

    pub async fn snapshot(&self, id: &str) -> Option<AssetSnapshot> {
        let handle = self.handle(id)?;
        let record = handle.lock().await;
        Some(record.snapshot())
    }

    pub async fn state(&self, id: &str) -> Option<AssetState> {
        let handle = self.handle(id)?;
        let state = handle.lock().await.state();
        Some(state)
    }

    /// Records currently holding a capacity slot.
    pub fn active_count(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Records in the registry, closed ones included.
    pub fn tracked_count(&self) -> usize {
        self.inner.records.len()
    }

    pub fn has_seen(&self, id: &str) -> bool {
        self.inner.ledger.has_seen(id)
    }

    fn handle(&self, id: &str) -> Option<RecordHandle> {
        // Clone out so no map guard is held across an await
        self.inner.records.get(id).map(|entry| entry.value().clone())
    }

    fn try_reserve_slot(&self) -> bool {
        let max = self.inner.config.max_tracked_assets;
        self.inner
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (max == 0 || n < max).then_some(n + 1)
            })
            .is_ok()
    }

    fn release_slot(&self) {
        self.inner.active.fetch_sub(1, Ordering::SeqCst);
    }

    fn close_record(&self, record: &mut AssetRecord) -> bool {
        let closed = record.close();
        if closed {
            self.release_slot();
        }
        closed
    }

    fn spawn_monitor(&self, id: String, handle: RecordHandle, mut cancel: watch::Receiver<bool>) {
        let engine = self.clone();

        tokio::spawn(async move {
            let mut ticker = interval(engine.inner.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.changed() => break,
                    _ = ticker.tick() => {}
                }

                if engine.tick(&handle).await == AssetState::Closed {
                    break;
                }
            }

            debug!(mint = %id, "Recurring check stopped");
        });
    }

    /// One evaluation of the threshold rules. Returns the resulting state.
    async fn tick(&self, handle: &RecordHandle) -> AssetState {
        let mut record = handle.lock().await;
        if record.is_closed() {
            return AssetState::Closed;
        }

        let quote = match self.inner.valuation.quote(&record.id).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(mint = %record.id, error = %e, "Valuation lookup failed, skipping tick");
                return record.state();
            }
        };

        if record.ticker.is_none() {
            record.ticker = quote.ticker.clone();
        }

        self.alert_market_cap(&mut record, quote.valuation).await;

        if record.state() == AssetState::Bought {
            if record.capture_reference(quote.valuation) {
                info!(mint = %record.id, reference = quote.valuation, "Monitoring started");
            }
            return record.state();
        }

        let Some(reference) = record.reference_valuation() else {
            return record.state();
        };
        let cfg = &self.inner.config.thresholds;

        debug!(
            mint = %record.id,
            valuation = quote.valuation,
            progress = quote.progress,
            reference,
            "Tick"
        );

        if rules::take_profit_hit(cfg, quote.valuation, reference, record.partial_profit_taken())
            && self.sell(&mut record, Rule::TakeProfit).await
        {
            record.record_partial_profit(quote.valuation);
            self.schedule_follow_up(handle.clone(), record.subscribe_cancel());
        }

        // Measured against the reference as left by take-profit
        let reference = record.reference_valuation().unwrap_or(reference);
        if rules::stop_loss_hit(cfg, quote.valuation, reference)
            && self.sell(&mut record, Rule::StopLoss).await
        {
            self.close_record(&mut record);
            info!(mint = %record.id, valuation = quote.valuation, reference, "Position closed");
        }

        // Independent of the rules above, a closing tick may still trim here
        if rules::progress_cap_hit(cfg, quote.progress) {
            self.sell(&mut record, Rule::ProgressCap).await;
        }

        record.state()
    }

    fn schedule_follow_up(&self, handle: RecordHandle, mut cancel: watch::Receiver<bool>) {
        let engine = self.clone();
        let delay = self.inner.config.follow_up_delay;

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.changed() => return,
                _ = sleep(delay) => {}
            }
            engine.follow_up(&handle).await;
        });
    }

    /// Delayed second take-profit tranche.
    async fn follow_up(&self, handle: &RecordHandle) {
        let mut record = handle.lock().await;
        if record.state() != AssetState::Monitoring {
            return;
        }

        let quote = match self.inner.valuation.quote(&record.id).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(mint = %record.id, error = %e, "Follow-up lookup failed");
                return;
            }
        };
        let Some(reference) = record.reference_valuation() else {
            return;
        };

        if rules::follow_up_hit(&self.inner.config.thresholds, quote.valuation, reference) {
            self.sell(&mut record, Rule::FollowUp).await;
        } else {
            debug!(
                mint = %record.id,
                valuation = quote.valuation,
                reference,
                "Follow-up threshold no longer met"
            );
        }
    }

    /// Send the one-time market cap alert once `valuation` reaches the alert level.
    ///
    /// A failed delivery is retried on the next tick.
    async fn alert_market_cap(&self, record: &mut AssetRecord, valuation: f64) {
        let level = self.inner.config.alert_market_cap;
        if level <= 0.0 || record.alerted() || valuation < level {
            return;
        }

        let message = format!(
            "Token {} ({}) has a market cap of ${:.0}.",
            record.id,
            record.ticker.as_deref().unwrap_or("?"),
            valuation
        );

        match self.inner.notifier.notify(&message).await {
            Ok(()) => {
                record.mark_alerted();
                info!(mint = %record.id, valuation, level, "Market cap alert sent");
            }
            Err(e) => {
                warn!(mint = %record.id, error = %e, "Market cap alert failed");
            }
        }
    }

    /// Issue a sell for `rule`. Returns whether it succeeded.
    async fn sell(&self, record: &mut AssetRecord, rule: Rule) -> bool {
        let pct = rule.sell_pct(&self.inner.config.thresholds);
        let order = TradeOrder::sell(record.id.as_str(), pct);

        match self.inner.executor.execute(&order).await {
            Ok(receipt) => {
                record.record_sell();
                info!(
                    mint = %record.id,
                    rule = %rule,
                    pct,
                    signature = %receipt.signature,
                    "Sell executed"
                );
                true
            }
            Err(e) => {
                warn!(mint = %record.id, rule = %rule, pct, error = %e, "Sell failed");
                false
            }
        }
    }
}
