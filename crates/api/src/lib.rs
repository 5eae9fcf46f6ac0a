//! External service clients for the sniper.
//!
//! This crate provides:
//! - `ValuationSource`: market cap and bonding-curve progress lookups
//!   (`PumpPageClient` reads them off the token page)
//! - `ExecutionEndpoint`: buy/sell instructions (`PumpPortalClient` for the
//!   live trade API, `DryRunExecutor` for paper trading)
//! - `Notifier`: operator alerts (`TelegramNotifier`, `NoopNotifier`)

mod dry_run;
mod error;
mod execution;
mod notify;
mod pump_page;
mod pumpportal;
mod valuation;

pub use dry_run::{DryRunExecutor, RecordedTrade};
pub use error::{ExecutionError, LookupError, NotifyError};
pub use execution::{ExecutionEndpoint, TradeAction, TradeAmount, TradeOrder, TradeReceipt};
pub use notify::{NoopNotifier, Notifier, TelegramNotifier};
pub use pump_page::PumpPageClient;
pub use pumpportal::{PumpPortalClient, TradeSettings};
pub use valuation::{Quote, ValuationSource};
