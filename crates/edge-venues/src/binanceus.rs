//! Binance.US adapter.
//!
//! Market orders via `POST /api/v3/order` with the parameters carried as a
//! signed query string: hex HMAC-SHA256 over the query, appended as
//! `signature`. The `newClientOrderId` parameter gives native dedup on the
//! client order id.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, info};

use edge_core::{OrderSide, Venue};

use crate::adapter::{BoxFuture, OrderRequest, VenueAdapter, VenueCredentials, VenueReceipt};
use crate::error::{Result, VenueError};

const DEFAULT_BASE_URL: &str = "https://api.binance.us";
const ORDER_PATH: &str = "/api/v3/order";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const RECV_WINDOW_MS: u64 = 5_000;

#[derive(Debug, Deserialize)]
struct OrderAck {
    #[serde(rename = "orderId")]
    order_id: u64,
}

pub struct BinanceUsAdapter {
    http: reqwest::Client,
    base_url: String,
    credentials: VenueCredentials,
}

impl BinanceUsAdapter {
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

    /// "BTC/USDC" -> "BTCUSDC".
    fn wire_symbol(symbol: &str) -> String {
        symbol.replace('/', "")
    }

    fn build_query(request: &OrderRequest, timestamp_ms: u64) -> String {
        let side = match request.side {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        };
        // Buy spends quote currency (quoteOrderQty); sell gives base quantity.
        let amount_param = match request.side {
            OrderSide::Buy => "quoteOrderQty",
            OrderSide::Sell => "quantity",
        };
        format!(
            "symbol={}&side={}&type=MARKET&{}={}&newClientOrderId={}&recvWindow={}&timestamp={}",
            Self::wire_symbol(&request.symbol),
            side,
            amount_param,
            request.amount,
            request.client_order_id,
            RECV_WINDOW_MS,
            timestamp_ms,
        )
    }

    fn sign(&self, query: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.credentials.api_secret.as_bytes())
            .expect("hmac accepts any key length");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl VenueAdapter for BinanceUsAdapter {
    fn venue(&self) -> Venue {
        Venue::Binanceus
    }

    fn supports_idempotency(&self) -> bool {
        true
    }

    fn place_market_order(&self, request: OrderRequest) -> BoxFuture<'_, Result<VenueReceipt>> {
        Box::pin(async move {
            let timestamp_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);
            let query = Self::build_query(&request, timestamp_ms);
            let signature = self.sign(&query);

            debug!(
                symbol = %Self::wire_symbol(&request.symbol),
                side = %request.side,
                client_order_id = %request.client_order_id,
                "submitting binanceus order"
            );

            let url = format!("{}{ORDER_PATH}?{query}&signature={signature}", self.base_url);
            let response = self
                .http
                .post(url)
                .header("X-MBX-APIKEY", &self.credentials.api_key)
                .send()
                .await
                .map_err(|e| VenueError::from_transport(&e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(VenueError::from_status(status.as_u16(), body));
            }

            let ack: OrderAck = response
                .json()
                .await
                .map_err(|e| VenueError::Transient(format!("response cut short: {e}")))?;

            info!(order_id = ack.order_id, "binanceus order accepted");
            Ok(VenueReceipt {
                order_id: ack.order_id.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_core::{ClientOrderId, Secret};
    use rust_decimal_macros::dec;

    fn request(side: OrderSide) -> OrderRequest {
        OrderRequest {
            symbol: "BTC/USDT".to_string(),
            side,
            amount: dec!(0.5),
            client_order_id: ClientOrderId::from_string("edge-c7".to_string()),
        }
    }

    #[test]
    fn test_buy_query_uses_quote_order_qty() {
        let query = BinanceUsAdapter::build_query(&request(OrderSide::Buy), 1_700_000_000_000);
        assert!(query.contains("symbol=BTCUSDT"));
        assert!(query.contains("side=BUY"));
        assert!(query.contains("type=MARKET"));
        assert!(query.contains("quoteOrderQty=0.5"));
        assert!(query.contains("newClientOrderId=edge-c7"));
        assert!(!query.contains("quantity="));
    }

    #[test]
    fn test_sell_query_uses_quantity() {
        let query = BinanceUsAdapter::build_query(&request(OrderSide::Sell), 1_700_000_000_000);
        assert!(query.contains("side=SELL"));
        assert!(query.contains("quantity=0.5"));
        assert!(!query.contains("quoteOrderQty="));
    }

    #[test]
    fn test_signature_is_hex_sha256() {
        let adapter = BinanceUsAdapter::new(VenueCredentials {
            api_key: "key".to_string(),
            api_secret: Secret::new("secret"),
        })
        .unwrap();
        let sig = adapter.sign("symbol=BTCUSDT&side=BUY");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
