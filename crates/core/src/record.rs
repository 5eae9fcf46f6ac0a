//! Per-asset lifecycle record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Lifecycle state of a tracked asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetState {
    /// First sighting, buy in flight
    Discovered,
    /// Buy succeeded, reference valuation not yet captured
    Bought,
    /// Reference captured, recurring check running
    Monitoring,
    /// Fully sold or cancelled. Terminal.
    Closed,
}

impl AssetState {
    /// Whether the record holds a capacity slot.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Bought | Self::Monitoring)
    }
}

impl std::fmt::Display for AssetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Discovered => "discovered",
            Self::Bought => "bought",
            Self::Monitoring => "monitoring",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Mutable state for one asset. Only the lifecycle engine holds these.
#[derive(Debug)]
pub struct AssetRecord {
    pub id: String,
    pub ticker: Option<String>,
    state: AssetState,
    acquired_at: Option<DateTime<Utc>>,
    buy_signature: Option<String>,
    reference_valuation: Option<f64>,
    partial_profit_taken: bool,
    alerted: bool,
    sells: u32,
    cancel: watch::Sender<bool>,
}

impl AssetRecord {
    pub fn new(id: impl Into<String>) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            id: id.into(),
            ticker: None,
            state: AssetState::Discovered,
            acquired_at: None,
            buy_signature: None,
            reference_valuation: None,
            partial_profit_taken: false,
            alerted: false,
            sells: 0,
            cancel,
        }
    }

    pub fn state(&self) -> AssetState {
        self.state
    }

    pub fn reference_valuation(&self) -> Option<f64> {
        self.reference_valuation
    }

    pub fn partial_profit_taken(&self) -> bool {
        self.partial_profit_taken
    }

    /// Whether the market cap alert has been delivered.
    pub fn alerted(&self) -> bool {
        self.alerted
    }

    pub fn mark_alerted(&mut self) {
        self.alerted = true;
    }

    pub fn is_closed(&self) -> bool {
        self.state == AssetState::Closed
    }

    /// Discovered -> Bought.
    pub fn mark_bought(&mut self, signature: impl Into<String>) {
        debug_assert_eq!(self.state, AssetState::Discovered);
        self.state = AssetState::Bought;
        self.acquired_at = Some(Utc::now());
        self.buy_signature = Some(signature.into());
    }

    /// Record the reference valuation and enter `Monitoring`.
    ///
    /// Returns `false` (and changes nothing) for a non-positive valuation or
    /// a record that is not `Bought`.
    pub fn capture_reference(&mut self, valuation: f64) -> bool {
        if self.state != AssetState::Bought || valuation.is_nan() || valuation <= 0.0 {
            return false;
        }
        self.reference_valuation = Some(valuation);
        self.state = AssetState::Monitoring;
        true
    }

    /// First take-profit tranche sold at `valuation`, which becomes the new reference.
    pub fn record_partial_profit(&mut self, valuation: f64) {
        self.partial_profit_taken = true;
        if valuation > 0.0 {
            self.reference_valuation = Some(valuation);
        }
    }

    pub fn record_sell(&mut self) {
        self.sells += 1;
    }

    /// Transition to `Closed` and signal every task watching this record.
    ///
    /// Returns `true` if the record was open before the call.
    pub fn close(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.state = AssetState::Closed;
        self.cancel.send_replace(true);
        true
    }

    /// Receiver that flips to `true` when the record closes.
    pub fn subscribe_cancel(&self) -> watch::Receiver<bool> {
        self.cancel.subscribe()
    }

    pub fn snapshot(&self) -> AssetSnapshot {
        AssetSnapshot {
            id: self.id.clone(),
            ticker: self.ticker.clone(),
            state: self.state,
            acquired_at: self.acquired_at,
            buy_signature: self.buy_signature.clone(),
            reference_valuation: self.reference_valuation,
            partial_profit_taken: self.partial_profit_taken,
            alerted: self.alerted,
            sells: self.sells,
        }
    }
}

/// Read-only copy of an [`AssetRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetSnapshot {
    pub id: String,
    pub ticker: Option<String>,
    pub state: AssetState,
    pub acquired_at: Option<DateTime<Utc>>,
    pub buy_signature: Option<String>,
    pub reference_valuation: Option<f64>,
    pub partial_profit_taken: bool,
    pub alerted: bool,
    pub sells: u32,
}
