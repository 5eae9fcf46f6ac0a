//! Pump.fun New Token Sniper
//!
//! Buys every newly created token announced on the PumpPortal feed and
//! manages each position independently:
//! - At-most-once buys per mint
//! - Take-profit with a delayed follow-up tranche
//! - Stop-loss that closes the position
//! - Bonding curve progress cap

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sniper_api::{
    DryRunExecutor, ExecutionEndpoint, NoopNotifier, Notifier, PumpPageClient, PumpPortalClient,
    TelegramNotifier, TradeSettings,
};
use sniper_core::{EngineConfig, LifecycleEngine, Sniper, SniperConfig};
use sniper_feed::{FeedListener, DEFAULT_FEED_URL};

/// Environment variable names.
mod env {
    pub const API_KEY: &str = "PUMP_PORTAL_API_KEY";
    pub const FEED_URL: &str = "SNIPER_FEED_URL";
    pub const LOG_JSON: &str = "SNIPER_LOG_JSON";
    pub const TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
    pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
}

const DEFAULT_LOG_FILTER: &str = "info,sniper_core=debug,sniper_feed=debug";

#[tokio::main]
async fn main() -> Result<()> {
    // Print startup banner
    print_banner();

    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    // SNIPER_PROFILE selects default, cautious or dry-run; SNIPER_CONFIG a TOML file
    let config = SniperConfig::from_env()?;
    config.log_config();

    let executor = build_executor(&config)?;
    let valuation = Arc::new(
        PumpPageClient::new(config.timing.http_timeout())
            .context("Failed to build valuation client")?,
    );

    let notifier = build_notifier(&config)?;

    let engine =
        LifecycleEngine::with_notifier(valuation, executor, notifier, EngineConfig::from(&config));

    let feed_url = std::env::var(env::FEED_URL).unwrap_or_else(|_| DEFAULT_FEED_URL.to_string());
    let feed = Arc::new(FeedListener::new(feed_url).with_keepalive(
        config.timing.feed_ping_interval(),
        config.timing.feed_idle_timeout(),
    ));

    let sniper = Sniper::new(engine.clone(), feed, config.timing.reconnect_delay());

    info!("Starting main event loop...");
    tokio::select! {
        result = sniper.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    let closed = engine.shutdown().await;
    info!(closed, "Sniper stopped");

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if std::env::var(env::LOG_JSON).is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

fn build_executor(config: &SniperConfig) -> Result<Arc<dyn ExecutionEndpoint>> {
    if config.dry_run {
        warn!("DRY RUN: trades are logged, never sent");
        return Ok(Arc::new(DryRunExecutor::new()));
    }

    let api_key = std::env::var(env::API_KEY)
        .with_context(|| format!("Missing env var: {} (or set SNIPER_DRY_RUN=1)", env::API_KEY))?;

    let settings = TradeSettings {
        slippage_pct: config.trade.slippage_pct,
        priority_fee: config.trade.priority_fee,
        pool: config.trade.pool.clone(),
    };

    let client = PumpPortalClient::new(api_key, settings, config.timing.http_timeout())
        .context("Failed to build trade client")?;
    Ok(Arc::new(client))
}

fn build_notifier(config: &SniperConfig) -> Result<Arc<dyn Notifier>> {
    let token = std::env::var(env::TELEGRAM_BOT_TOKEN).ok();
    let chat_id = std::env::var(env::TELEGRAM_CHAT_ID).ok();

    match (token, chat_id) {
        (Some(token), Some(chat_id)) if config.alerts.market_cap > 0.0 => {
            info!(
                market_cap = config.alerts.market_cap,
                "Telegram alerts enabled"
            );
            let client = TelegramNotifier::new(token, chat_id, config.timing.http_timeout())
                .context("Failed to build Telegram client")?;
            Ok(Arc::new(client))
        }
        _ => {
            info!(
                "Telegram alerts disabled (set {} and {})",
                env::TELEGRAM_BOT_TOKEN,
                env::TELEGRAM_CHAT_ID
            );
            Ok(Arc::new(NoopNotifier))
        }
    }
}

fn print_banner() {
    println!(
        r#"
 ____  _   _ ___ ____  _____ ____
/ ___|| \ | |_ _|  _ \| ____|  _ \
\___ \|  \| || || |_) |  _| | |_) |
 ___) | |\  || ||  __/| |___|  _ <
|____/|_| \_|___|_|   |_____|_| \_\

    Pump.fun New Token Sniper
    "#
    );
}
