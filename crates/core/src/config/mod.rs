//! Runtime configuration for the sniper.
//!
//! Profiles, TOML files and `SNIPER_*` environment overrides all resolve
//! into a single [`SniperConfig`].

mod bot;

pub use bot::{
    AlertConfig, LimitConfig, SniperConfig, ThresholdConfig, TimingConfig, TradeConfig,
};
