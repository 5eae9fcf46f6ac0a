//! Live feed of newly created tokens.
//!
//! This crate provides:
//! - `FeedListener`: websocket subscription to new-token notices
//! - `NewTokenNotice`: a parsed creation notice
//! - Notice parsing that discards malformed payloads

mod error;
mod listener;
mod notice;

pub use error::{FeedError, MalformedNotice};
pub use listener::{FeedListener, NoticeStream, DEFAULT_FEED_URL};
pub use notice::{parse_notice, subscribe_request, NewTokenNotice};
