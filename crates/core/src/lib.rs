//! Sniper core logic.
//!
//! This crate provides the per-asset lifecycle engine:
//! - Dedup ledger guaranteeing at most one buy per asset
//! - Asset records and their Discovered/Bought/Monitoring/Closed lifecycle
//! - Take-profit, stop-loss and progress-cap rules
//! - Per-asset recurring checks with deterministic cancellation
//! - Feed orchestration with resubscribe on disconnect

pub mod config;
mod engine;
mod ledger;
mod record;
pub mod rules;
mod sniper;

pub use config::SniperConfig;
pub use engine::{Discovery, EngineConfig, LifecycleEngine};
pub use ledger::DedupLedger;
pub use record::{AssetRecord, AssetSnapshot, AssetState};
pub use rules::Rule;
pub use sniper::Sniper;
