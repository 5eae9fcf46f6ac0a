//! Error types for valuation lookups and trade execution.

use thiserror::Error;

/// Valuation lookup failed. Recoverable: the caller skips the current tick.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("valuation request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("valuation source returned {status}")]
    Status { status: reqwest::StatusCode },

    #[error("field `{0}` not found in page")]
    MissingField(&'static str),

    #[error("field `{field}` has unparsable value {raw:?}")]
    Parse { field: &'static str, raw: String },

    #[error("non-positive valuation {0}")]
    NonPositive(f64),
}

/// Trade instruction failed.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("trade request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("trade endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("trade rejected: {}", .0.join("; "))]
    Rejected(Vec<String>),

    #[error("trade response carried no signature")]
    MissingSignature,

    #[error("no API key configured for live trading")]
    MissingApiKey,
}

/// Alert delivery failed. Never affects trading.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("notification endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("notification rejected: {0}")]
    Rejected(String),
}
