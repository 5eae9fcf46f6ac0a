//! Token page valuation source.
//!
//! Reads the `Market cap`, `bonding curve progress` and `Ticker` fields
//! from the pump.fun token page. Each field is rendered as
//! `<label>: <value><`, so the value is the text between the first colon
//! after the label and the next tag.

use async_trait::async_trait;
use regex_lite::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::LookupError;
use crate::valuation::{Quote, ValuationSource};

const DEFAULT_BASE_URL: &str = "https://pump.fun";

const MARKET_CAP_LABEL: &str = "Market cap";
const PROGRESS_LABEL: &str = "bonding curve progress";
const TICKER_LABEL: &str = "Ticker";

/// Page-inspection valuation client.
#[derive(Clone)]
pub struct PumpPageClient {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for PumpPageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PumpPageClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl PumpPageClient {
    pub fn new(timeout: Duration) -> Result<Self, LookupError> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    /// Create a client with custom base URL.
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (X11; Linux x86_64)")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Parse a quote out of page source.
    fn parse_page(source: &str) -> Result<Quote, LookupError> {
        let raw_cap =
            extract_field(source, MARKET_CAP_LABEL).ok_or(LookupError::MissingField("market cap"))?;
        let valuation = parse_amount(raw_cap).ok_or_else(|| LookupError::Parse {
            field: "market cap",
            raw: raw_cap.to_string(),
        })?;
        if valuation <= 0.0 {
            return Err(LookupError::NonPositive(valuation));
        }

        // Missing progress means the curve has not moved yet
        let progress = match extract_field(source, PROGRESS_LABEL) {
            Some(raw) => parse_amount(raw).ok_or_else(|| LookupError::Parse {
                field: "bonding curve progress",
                raw: raw.to_string(),
            })?,
            None => 0.0,
        };

        let mut quote = Quote::new(valuation, progress);
        if let Some(ticker) = extract_field(source, TICKER_LABEL).filter(|t| !t.is_empty()) {
            quote = quote.with_ticker(ticker);
        }
        Ok(quote)
    }
}

#[async_trait]
impl ValuationSource for PumpPageClient {
    #[instrument(skip(self))]
    async fn quote(&self, mint: &str) -> Result<Quote, LookupError> {
        let url = format!("{}/{}", self.base_url, mint);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::Status {
                status: response.status(),
            });
        }

        let source = response.text().await?;
        let quote = Self::parse_page(&source)?;

        debug!(
            ticker = quote.ticker.as_deref().unwrap_or("?"),
            market_cap = quote.valuation,
            progress = quote.progress,
            "Token page scraped"
        );

        Ok(quote)
    }
}

/// Text between the first `:` after `label` and the next `<`, trimmed.
fn extract_field<'a>(source: &'a str, label: &str) -> Option<&'a str> {
    let start = source.find(label)? + label.len();
    let rest = &source[start..];
    let value = &rest[rest.find(':')? + 1..];
    let end = value.find('<').unwrap_or(value.len());
    Some(value[..end].trim())
}

fn amount_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\$?\s*([0-9][0-9,]*(?:\.[0-9]+)?)\s*([KkMmBb])?\s*%?$")
            .expect("amount regex is valid")
    })
}

/// Parse `$12,345.6`, `45%`, `5.2K` style amounts.
fn parse_amount(raw: &str) -> Option<f64> {
    let caps = amount_regex().captures(raw.trim())?;
    let number: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str()) {
        Some("K" | "k") => 1e3,
        Some("M" | "m") => 1e6,
        Some("B" | "b") => 1e9,
        _ => 1.0,
    };
    Some(number * multiplier)
}
