//! PumpPortal trade API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::ExecutionError;
use crate::execution::{ExecutionEndpoint, TradeAction, TradeAmount, TradeOrder, TradeReceipt};

const DEFAULT_BASE_URL: &str = "https://pumpportal.fun";

/// Per-trade parameters sent with every instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeSettings {
    /// Slippage tolerance (percentage)
    pub slippage_pct: f64,
    /// Priority fee in SOL
    pub priority_fee: f64,
    /// Trading venue
    pub pool: String,
}

impl Default for TradeSettings {
    fn default() -> Self {
        Self {
            slippage_pct: 15.0,
            priority_fee: 0.0005,
            pool: "pump".to_string(),
        }
    }
}

/// PumpPortal lightning trade client.
#[derive(Clone)]
pub struct PumpPortalClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    settings: TradeSettings,
}

impl std::fmt::Debug for PumpPortalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PumpPortalClient")
            .field("base_url", &self.base_url)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl PumpPortalClient {
    /// Create a new client against the public endpoint.
    pub fn new(
        api_key: impl Into<String>,
        settings: TradeSettings,
        timeout: Duration,
    ) -> Result<Self, ExecutionError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key, settings, timeout)
    }

    /// Create a client with custom base URL.
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        settings: TradeSettings,
        timeout: Duration,
    ) -> Result<Self, ExecutionError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ExecutionError::MissingApiKey);
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            settings,
        })
    }

    fn build_request<'a>(&'a self, order: &'a TradeOrder) -> TradeRequest<'a> {
        TradeRequest {
            action: order.action,
            mint: &order.mint,
            amount: order.amount,
            denominated_in_sol: if order.amount.is_base() { "true" } else { "false" },
            slippage: self.settings.slippage_pct,
            priority_fee: self.settings.priority_fee,
            pool: &self.settings.pool,
        }
    }
}

#[async_trait]
impl ExecutionEndpoint for PumpPortalClient {
    #[instrument(skip(self, order), fields(action = %order.action, mint = %order.mint, amount = %order.amount))]
    async fn execute(&self, order: &TradeOrder) -> Result<TradeReceipt, ExecutionError> {
        let url = format!("{}/api/trade", self.base_url);
        let request = self.build_request(order);

        debug!("Sending trade instruction");

        let response = self
            .client
            .post(&url)
            .query(&[("api-key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Error bodies usually still follow the `{errors: [...]}` shape
            if let Ok(parsed) = serde_json::from_str::<TradeResponse>(&body) {
                if !parsed.errors.is_empty() {
                    warn!(status = %status, errors = ?parsed.errors, "Trade rejected");
                    return Err(ExecutionError::Rejected(parsed.errors));
                }
            }
            return Err(ExecutionError::Status { status, body });
        }

        let parsed: TradeResponse = response.json().await?;
        let receipt = parsed.into_receipt()?;

        info!(
            signature = %receipt.signature,
            tx = %receipt.explorer_url(),
            "Trade executed"
        );

        Ok(receipt)
    }
}

/// Trade request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TradeRequest<'a> {
    action: TradeAction,
    mint: &'a str,
    amount: TradeAmount,
    denominated_in_sol: &'static str,
    slippage: f64,
    priority_fee: f64,
    pool: &'a str,
}

/// Trade response body: `{signature}` or `{errors: [...]}`.
#[derive(Debug, Deserialize)]
struct TradeResponse {
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

impl TradeResponse {
    fn into_receipt(self) -> Result<TradeReceipt, ExecutionError> {
        if !self.errors.is_empty() {
            return Err(ExecutionError::Rejected(self.errors));
        }
        match self.signature {
            Some(sig) if !sig.is_empty() => Ok(TradeReceipt::new(sig)),
            _ => Err(ExecutionError::MissingSignature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> PumpPortalClient {
        PumpPortalClient::with_base_url(
            base_url,
            "test-key",
            TradeSettings::default(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_buy_request_body() {
        let client = client("http://localhost");
        let order = TradeOrder::buy("Mint111", 0.01189);
        let body = serde_json::to_value(client.build_request(&order)).unwrap();

        assert_eq!(body["action"], "buy");
        assert_eq!(body["mint"], "Mint111");
        assert_eq!(body["amount"], 0.01189);
        assert_eq!(body["denominatedInSol"], "true");
        assert_eq!(body["slippage"], 15.0);
        assert_eq!(body["priorityFee"], 0.0005);
        assert_eq!(body["pool"], "pump");
    }

    #[test]
    fn test_sell_request_body() {
        let client = client("http://localhost");
        let order = TradeOrder::sell("Mint111", 50);
        let body = serde_json::to_value(client.build_request(&order)).unwrap();

        assert_eq!(body["action"], "sell");
        assert_eq!(body["amount"], "50%");
        assert_eq!(body["denominatedInSol"], "false");
    }

    #[test]
    fn test_response_parsing() {
        let ok: TradeResponse = serde_json::from_str(r#"{"signature":"abc"}"#).unwrap();
        assert_eq!(ok.into_receipt().unwrap().signature, "abc");

        let rejected: TradeResponse =
            serde_json::from_str(r#"{"errors":["insufficient balance"]}"#).unwrap();
        assert!(matches!(
            rejected.into_receipt(),
            Err(ExecutionError::Rejected(e)) if e == vec!["insufficient balance".to_string()]
        ));

        let empty: TradeResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            empty.into_receipt(),
            Err(ExecutionError::MissingSignature)
        ));
    }

    #[test]
    fn test_missing_api_key() {
        let result = PumpPortalClient::new("", TradeSettings::default(), Duration::from_secs(5));
        assert!(matches!(result, Err(ExecutionError::MissingApiKey)));
    }

    #[tokio::test]
    async fn test_execute_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/trade"))
            .and(query_param("api-key", "test-key"))
            .and(body_partial_json(serde_json::json!({"action": "sell", "amount": "100%"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"signature": "sig123"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let receipt = client(&server.uri())
            .execute(&TradeOrder::sell("Mint111", 100))
            .await
            .unwrap();
        assert_eq!(receipt.signature, "sig123");
    }

    #[tokio::test]
    async fn test_execute_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/trade"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"errors": ["slippage exceeded"]})),
            )
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .execute(&TradeOrder::buy("Mint111", 0.01))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_execute_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/trade"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .execute(&TradeOrder::buy("Mint111", 0.01))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Status { .. }));
    }
}
