//! Configuration management with profile support.
//!
//! Provides centralized configuration for all sniper parameters with
//! support for different profiles (default, cautious, dry-run), TOML files
//! and environment overrides.

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure containing all sniper parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SniperConfig {
    /// Profile name (for logging/identification)
    #[serde(default = "default_profile_name")]
    pub profile: String,

    /// Paper trading: instructions are logged, never sent
    #[serde(default)]
    pub dry_run: bool,

    /// Trade instruction parameters
    #[serde(default)]
    pub trade: TradeConfig,

    /// Take-profit / stop-loss / progress-cap thresholds
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Polling and reconnect timing
    #[serde(default)]
    pub timing: TimingConfig,

    /// Tracking limits
    #[serde(default)]
    pub limits: LimitConfig,

    /// Market cap alerts
    #[serde(default)]
    pub alerts: AlertConfig,
}

fn default_profile_name() -> String {
    "default".to_string()
}

/// Trade instruction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeConfig {
    /// Base-currency (SOL) amount spent on each buy
    #[serde(default = "default_buy_amount")]
    pub buy_amount: f64,

    /// Slippage tolerance (percentage)
    #[serde(default = "default_slippage")]
    pub slippage_pct: f64,

    /// Priority fee in SOL
    #[serde(default = "default_priority_fee")]
    pub priority_fee: f64,

    /// Trading venue
    #[serde(default = "default_pool")]
    pub pool: String,
}

fn default_buy_amount() -> f64 {
    0.01189
}
fn default_slippage() -> f64 {
    15.0
}
fn default_priority_fee() -> f64 {
    0.0005
}
fn default_pool() -> String {
    "pump".to_string()
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            buy_amount: default_buy_amount(),
            slippage_pct: default_slippage(),
            priority_fee: default_priority_fee(),
            pool: default_pool(),
        }
    }
}

/// Threshold rules evaluated on every monitoring tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Valuation / reference ratio at or above which profit is taken
    #[serde(default = "default_take_profit_ratio")]
    pub take_profit_ratio: f64,

    /// Valuation / reference ratio at or below which the position is closed
    #[serde(default = "default_stop_loss_ratio")]
    pub stop_loss_ratio: f64,

    /// Bonding curve progress at or above which holdings are trimmed
    #[serde(default = "default_progress_cap")]
    pub progress_cap: f64,

    /// Percentage sold on the first take-profit
    #[serde(default = "default_take_profit_sell")]
    pub take_profit_sell_pct: u8,

    /// Percentage sold by the delayed follow-up check
    #[serde(default = "default_follow_up_sell")]
    pub follow_up_sell_pct: u8,

    /// Percentage sold on stop-loss
    #[serde(default = "default_stop_loss_sell")]
    pub stop_loss_sell_pct: u8,

    /// Percentage sold when the progress cap is reached
    #[serde(default = "default_progress_cap_sell")]
    pub progress_cap_sell_pct: u8,
}

fn default_take_profit_ratio() -> f64 {
    1.25
}
fn default_stop_loss_ratio() -> f64 {
    0.90
}
fn default_progress_cap() -> f64 {
    1.5
}
fn default_take_profit_sell() -> u8 {
    50
}
fn default_follow_up_sell() -> u8 {
    25
}
fn default_stop_loss_sell() -> u8 {
    100
}
fn default_progress_cap_sell() -> u8 {
    75
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            take_profit_ratio: default_take_profit_ratio(),
            stop_loss_ratio: default_stop_loss_ratio(),
            progress_cap: default_progress_cap(),
            take_profit_sell_pct: default_take_profit_sell(),
            follow_up_sell_pct: default_follow_up_sell(),
            stop_loss_sell_pct: default_stop_loss_sell(),
            progress_cap_sell_pct: default_progress_cap_sell(),
        }
    }
}

/// Timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Monitoring tick interval (milliseconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Delay before the take-profit follow-up check (milliseconds)
    #[serde(default = "default_follow_up_delay")]
    pub follow_up_delay_ms: u64,

    /// Delay before resubscribing after a feed disconnect (seconds)
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    /// HTTP request timeout (seconds)
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Feed keepalive ping interval (seconds)
    #[serde(default = "default_feed_ping")]
    pub feed_ping_interval_secs: u64,

    /// Feed silence after which the connection is dropped (seconds)
    #[serde(default = "default_feed_idle")]
    pub feed_idle_timeout_secs: u64,
}

fn default_poll_interval() -> u64 {
    5_000
}
fn default_follow_up_delay() -> u64 {
    20_000
}
fn default_reconnect_delay() -> u64 {
    5
}
fn default_http_timeout() -> u64 {
    15
}
fn default_feed_ping() -> u64 {
    30
}
fn default_feed_idle() -> u64 {
    90
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            follow_up_delay_ms: default_follow_up_delay(),
            reconnect_delay_secs: default_reconnect_delay(),
            http_timeout_secs: default_http_timeout(),
            feed_ping_interval_secs: default_feed_ping(),
            feed_idle_timeout_secs: default_feed_idle(),
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn follow_up_delay(&self) -> Duration {
        Duration::from_millis(self.follow_up_delay_ms)
    }
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
    pub fn feed_ping_interval(&self) -> Duration {
        Duration::from_secs(self.feed_ping_interval_secs)
    }
    pub fn feed_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_idle_timeout_secs)
    }
}

/// Tracking limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Maximum assets bought and not yet closed (0 = unlimited)
    #[serde(default)]
    pub max_tracked_assets: usize,
}

/// Notification settings. Telegram credentials come from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Market cap (USD) at which a one-time alert is sent per asset (0 = off)
    #[serde(default = "default_alert_market_cap")]
    pub market_cap: f64,
}

fn default_alert_market_cap() -> f64 {
    75_000.0
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            market_cap: default_alert_market_cap(),
        }
    }
}

impl Default for SniperConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            dry_run: false,
            trade: TradeConfig::default(),
            thresholds: ThresholdConfig::default(),
            timing: TimingConfig::default(),
            limits: LimitConfig::default(),
            alerts: AlertConfig::default(),
        }
    }
}

impl SniperConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Profile that caps concurrently tracked assets at 10.
    pub fn cautious() -> Self {
        Self {
            profile: "cautious".to_string(),
            limits: LimitConfig {
                max_tracked_assets: 10,
            },
            ..Self::default()
        }
    }

    /// Paper-trading profile: no instruction leaves the process.
    pub fn dry_run() -> Self {
        Self {
            profile: "dry-run".to_string(),
            dry_run: true,
            limits: LimitConfig {
                max_tracked_assets: 25,
            },
            ..Self::default()
        }
    }

    /// Look up a named profile.
    /// Supported values: default, cautious, dry-run
    pub fn from_profile(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "cautious" | "safe" => Self::cautious(),
            "dry-run" | "dry_run" | "paper" => Self::dry_run(),
            _ => Self::default(),
        }
    }

    /// Build from the process environment.
    ///
    /// `SNIPER_CONFIG` points at a TOML file; otherwise `SNIPER_PROFILE`
    /// selects a profile. Individual `SNIPER_*` overrides are applied last.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = match std::env::var("SNIPER_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => {
                let profile = std::env::var("SNIPER_PROFILE").unwrap_or_else(|_| "default".to_string());
                Self::from_profile(&profile)
            }
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SNIPER_*` overrides using `lookup` to resolve variable names.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(name: &str, raw: String) -> anyhow::Result<T> {
            raw.trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid value for {name}: {raw:?}"))
        }

        macro_rules! apply {
            ($($name:literal => $field:expr),+ $(,)?) => {
                $(
                    if let Some(v) = lookup($name) {
                        $field = parse($name, v)?;
                    }
                )+
            };
        }

        apply! {
            "SNIPER_BUY_AMOUNT" => self.trade.buy_amount,
            "SNIPER_SLIPPAGE_PCT" => self.trade.slippage_pct,
            "SNIPER_PRIORITY_FEE" => self.trade.priority_fee,
            "SNIPER_TAKE_PROFIT_RATIO" => self.thresholds.take_profit_ratio,
            "SNIPER_STOP_LOSS_RATIO" => self.thresholds.stop_loss_ratio,
            "SNIPER_PROGRESS_CAP" => self.thresholds.progress_cap,
            "SNIPER_TAKE_PROFIT_SELL_PCT" => self.thresholds.take_profit_sell_pct,
            "SNIPER_FOLLOW_UP_SELL_PCT" => self.thresholds.follow_up_sell_pct,
            "SNIPER_STOP_LOSS_SELL_PCT" => self.thresholds.stop_loss_sell_pct,
            "SNIPER_PROGRESS_CAP_SELL_PCT" => self.thresholds.progress_cap_sell_pct,
            "SNIPER_POLL_INTERVAL_MS" => self.timing.poll_interval_ms,
            "SNIPER_FOLLOW_UP_DELAY_MS" => self.timing.follow_up_delay_ms,
            "SNIPER_RECONNECT_DELAY_SECS" => self.timing.reconnect_delay_secs,
            "SNIPER_HTTP_TIMEOUT_SECS" => self.timing.http_timeout_secs,
            "SNIPER_FEED_PING_INTERVAL_SECS" => self.timing.feed_ping_interval_secs,
            "SNIPER_FEED_IDLE_TIMEOUT_SECS" => self.timing.feed_idle_timeout_secs,
            "SNIPER_MAX_TRACKED_ASSETS" => self.limits.max_tracked_assets,
            "SNIPER_ALERT_MARKET_CAP" => self.alerts.market_cap,
        }
        if let Some(v) = lookup("SNIPER_DRY_RUN") {
            self.dry_run = matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    /// Reject values that would make the rules meaningless.
    pub fn validate(&self) -> anyhow::Result<()> {
        let t = &self.thresholds;
        ensure!(self.trade.buy_amount > 0.0, "buy_amount must be positive");
        ensure!(t.take_profit_ratio > 1.0, "take_profit_ratio must be above 1.0");
        ensure!(
            t.stop_loss_ratio > 0.0 && t.stop_loss_ratio < 1.0,
            "stop_loss_ratio must be between 0 and 1"
        );
        for (name, pct) in [
            ("take_profit_sell_pct", t.take_profit_sell_pct),
            ("follow_up_sell_pct", t.follow_up_sell_pct),
            ("stop_loss_sell_pct", t.stop_loss_sell_pct),
            ("progress_cap_sell_pct", t.progress_cap_sell_pct),
        ] {
            ensure!((1..=100).contains(&pct), "{name} must be within 1..=100");
        }
        ensure!(self.timing.poll_interval_ms > 0, "poll_interval_ms must be positive");
        ensure!(
            self.timing.feed_ping_interval_secs > 0,
            "feed_ping_interval_secs must be positive"
        );
        ensure!(
            self.timing.feed_idle_timeout_secs > self.timing.feed_ping_interval_secs,
            "feed_idle_timeout_secs must exceed feed_ping_interval_secs"
        );
        ensure!(self.alerts.market_cap >= 0.0, "alerts.market_cap must not be negative");
        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        tracing::info!(profile = %self.profile, dry_run = self.dry_run, "Sniper configuration loaded");
        tracing::info!(
            buy_amount = self.trade.buy_amount,
            slippage = self.trade.slippage_pct,
            priority_fee = self.trade.priority_fee,
            pool = %self.trade.pool,
            "Trade parameters"
        );
        tracing::info!(
            take_profit = self.thresholds.take_profit_ratio,
            stop_loss = self.thresholds.stop_loss_ratio,
            progress_cap = self.thresholds.progress_cap,
            "Thresholds"
        );
        tracing::info!(
            poll_ms = self.timing.poll_interval_ms,
            follow_up_ms = self.timing.follow_up_delay_ms,
            max_tracked = self.limits.max_tracked_assets,
            "Timing and limits"
        );
        tracing::info!(alert_market_cap = self.alerts.market_cap, "Alerts");
    }
}
