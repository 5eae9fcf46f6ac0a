//! Feed error types.

use thiserror::Error;

/// Transport-level failure. Recoverable: the host resubscribes.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("websocket transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

/// A notice that carries no usable asset identifier.
#[derive(Debug, Error)]
pub enum MalformedNotice {
    #[error("notice is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("notice has no mint")]
    MissingMint,
}
