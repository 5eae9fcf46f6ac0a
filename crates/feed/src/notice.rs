//! New-token notice parsing.

use serde::Deserialize;

use crate::error::MalformedNotice;

/// A token-creation notice from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTokenNotice {
    /// Asset identifier
    pub mint: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

impl NewTokenNotice {
    pub fn new(mint: impl Into<String>) -> Self {
        Self {
            mint: mint.into(),
            name: None,
            symbol: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawNotice {
    #[serde(default)]
    mint: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    symbol: Option<String>,
}

/// Subscription request sent once the transport is up.
pub fn subscribe_request() -> String {
    serde_json::json!({ "method": "subscribeNewToken" }).to_string()
}

/// Parse a text frame into a notice.
///
/// Any frame without a non-empty string `mint` (subscription acks, trade
/// events, garbage) is malformed.
pub fn parse_notice(text: &str) -> Result<NewTokenNotice, MalformedNotice> {
    let raw: RawNotice = serde_json::from_str(text)?;
    let mint = raw
        .mint
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .ok_or(MalformedNotice::MissingMint)?;

    Ok(NewTokenNotice {
        mint,
        name: raw.name,
        symbol: raw.symbol,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_creation_notice() {
        let text = r#"{"signature":"s","mint":"7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU","traderPublicKey":"t","txType":"create","name":"Dog","symbol":"DOG","marketCapSol":30.5}"#;
        let notice = parse_notice(text).unwrap();
        assert_eq!(notice.mint, "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU");
        assert_eq!(notice.symbol.as_deref(), Some("DOG"));
        assert_eq!(notice.name.as_deref(), Some("Dog"));
    }

    #[test]
    fn test_parse_minimal_notice() {
        assert_eq!(parse_notice(r#"{"mint":"abc"}"#).unwrap(), NewTokenNotice::new("abc"));
    }

    #[test]
    fn test_subscription_ack_is_malformed() {
        let ack = r#"{"message":"Successfully subscribed to token creation events."}"#;
        assert!(matches!(parse_notice(ack), Err(MalformedNotice::MissingMint)));
    }

    #[test]
    fn test_empty_or_wrong_typed_mint_is_malformed() {
        assert!(parse_notice(r#"{"mint":""}"#).is_err());
        assert!(parse_notice(r#"{"mint":"   "}"#).is_err());
        assert!(matches!(parse_notice(r#"{"mint":42}"#), Err(MalformedNotice::Json(_))));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        assert!(matches!(parse_notice("not json"), Err(MalformedNotice::Json(_))));
        assert!(parse_notice("[1,2,3]").is_err());
    }

    #[test]
    fn test_subscribe_request() {
        let value: serde_json::Value = serde_json::from_str(&subscribe_request()).unwrap();
        assert_eq!(value, serde_json::json!({"method": "subscribeNewToken"}));
    }
}
