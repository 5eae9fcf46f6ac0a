//! Valuation source abstraction.

use async_trait::async_trait;

use crate::error::LookupError;

/// Point-in-time valuation of an asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// Market cap in USD
    pub valuation: f64,
    /// Bonding curve progress (percentage, e.g. 1.5 = 1.5%)
    pub progress: f64,
    /// Display ticker, when the source exposes one
    pub ticker: Option<String>,
}

impl Quote {
    pub fn new(valuation: f64, progress: f64) -> Self {
        Self {
            valuation,
            progress,
            ticker: None,
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }
}

/// Looks up the current valuation of an asset by identifier.
///
/// How the numbers are obtained (page inspection, REST) is opaque to callers.
#[async_trait]
pub trait ValuationSource: Send + Sync {
    async fn quote(&self, mint: &str) -> Result<Quote, LookupError>;
}
