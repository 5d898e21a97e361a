//! Coinbase Advanced Trade adapter.
//!
//! Market IOC orders via `POST /api/v3/brokerage/orders`. Requests carry
//! `CB-ACCESS-*` headers with a hex HMAC-SHA256 signature over
//! `timestamp + method + path + body`. Coinbase deduplicates on
//! `client_order_id` natively, so a resend of the same command cannot
//! double-execute.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, info};

use edge_core::{OrderSide, Venue};

use crate::adapter::{BoxFuture, OrderRequest, VenueAdapter, VenueCredentials, VenueReceipt};
use crate::error::{Result, VenueError};

const DEFAULT_BASE_URL: &str = "https://api.coinbase.com";
const ORDERS_PATH: &str = "/api/v3/brokerage/orders";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
struct MarketIoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    quote_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_size: Option<String>,
}

#[derive(Debug, Serialize)]
struct OrderConfiguration {
    market_market_ioc: MarketIoc,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest {
    client_order_id: String,
    product_id: String,
    side: String,
    order_configuration: OrderConfiguration,
}

#[derive(Debug, Deserialize)]
struct SuccessResponse {
    order_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CreateOrderResponse {
    success: bool,
    success_response: Option<SuccessResponse>,
    error_response: Option<ErrorResponse>,
}

pub struct CoinbaseAdapter {
    http: reqwest::Client,
    base_url: String,
    credentials: VenueCredentials,
}

impl CoinbaseAdapter {
    pub fn new(credentials: VenueCredentials) -> Result<Self> {
        Self::with_base_url(credentials, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(credentials: VenueCredentials, base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| VenueError::Transient(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// "BTC/USDC" -> "BTC-USDC".
    fn product_id(symbol: &str) -> String {
        symbol.replace('/', "-")
    }

    fn sign(&self, timestamp: u64, method: &str, path: &str, body: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.credentials.api_secret.as_bytes())
            .expect("hmac accepts any key length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(method.as_bytes());
        mac.update(path.as_bytes());
        mac.update(body.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn build_body(request: &OrderRequest) -> CreateOrderRequest {
        let size = request.amount.to_string();
        let market_market_ioc = match request.side {
            // Buy spends quote currency, sell disposes base quantity.
            OrderSide::Buy => MarketIoc {
                quote_size: Some(size),
                base_size: None,
            },
            OrderSide::Sell => MarketIoc {
                quote_size: None,
                base_size: Some(size),
            },
        };
        CreateOrderRequest {
            client_order_id: request.client_order_id.to_string(),
            product_id: Self::product_id(&request.symbol),
            side: match request.side {
                OrderSide::Buy => "BUY".to_string(),
                OrderSide::Sell => "SELL".to_string(),
            },
            order_configuration: OrderConfiguration { market_market_ioc },
        }
    }
}

impl VenueAdapter for CoinbaseAdapter {
    fn venue(&self) -> Venue {
        Venue::Coinbase
    }

    fn supports_idempotency(&self) -> bool {
        true
    }

    fn place_market_order(&self, request: OrderRequest) -> BoxFuture<'_, Result<VenueReceipt>> {
        Box::pin(async move {
            let body = serde_json::to_string(&Self::build_body(&request))
                .map_err(|e| VenueError::Transient(format!("serialize order: {e}")))?;

            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            let signature = self.sign(timestamp, "POST", ORDERS_PATH, &body);

            debug!(
                product = %Self::product_id(&request.symbol),
                side = %request.side,
                client_order_id = %request.client_order_id,
                "submitting coinbase order"
            );

            let response = self
                .http
                .post(format!("{}{ORDERS_PATH}", self.base_url))
                .header("CB-ACCESS-KEY", &self.credentials.api_key)
                .header("CB-ACCESS-SIGN", signature)
                .header("CB-ACCESS-TIMESTAMP", timestamp.to_string())
                .header("Content-Type", "application/json")
                .body(body)
                .send()
                .await
                .map_err(|e| VenueError::from_transport(&e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(VenueError::from_status(status.as_u16(), body));
            }

            let parsed: CreateOrderResponse = response
                .json()
                .await
                .map_err(|e| VenueError::Transient(format!("response cut short: {e}")))?;

            if parsed.success {
                let order_id = parsed
                    .success_response
                    .map(|r| r.order_id)
                    .ok_or_else(|| {
                        VenueError::Transient("accepted but no order id returned".to_string())
                    })?;
                info!(order_id = %order_id, "coinbase order accepted");
                Ok(VenueReceipt { order_id })
            } else {
                let reason = parsed
                    .error_response
                    .map(|e| format!("{}: {}", e.error, e.message))
                    .unwrap_or_else(|| "unspecified rejection".to_string());
                Err(VenueError::RejectedByVenue(reason))
            }
        })
    }
}
