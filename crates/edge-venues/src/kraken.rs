//! Kraken adapter.
//!
//! Market orders via `POST /0/private/AddOrder` with form-encoded fields.
//! `API-Sign` is base64(HMAC-SHA512(base64-decoded secret,
//! path + SHA256(nonce + postdata))). Kraken offers no client order id
//! dedup, so resubmission safety comes entirely from the local submission
//! cache.
//!
//! Kraken's AddOrder volume is always a base quantity; buys expressed as a
//! quote spend are converted using the current ticker price.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::{Digest, Sha256, Sha512};
use tracing::{debug, info};

use edge_core::{OrderSide, Venue};

use crate::adapter::{BoxFuture, OrderRequest, VenueAdapter, VenueCredentials, VenueReceipt};
use crate::error::{Result, VenueError};

const DEFAULT_BASE_URL: &str = "https://api.kraken.com";
const ADD_ORDER_PATH: &str = "/0/private/AddOrder";
const TICKER_PATH: &str = "/0/public/Ticker";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const VOLUME_DECIMALS: u32 = 8;

#[derive(Debug, Deserialize)]
struct KrakenResponse<T> {
    #[serde(default)]
    error: Vec<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct AddOrderResult {
    #[serde(default)]
    txid: Vec<String>,
}

pub struct KrakenAdapter {
    http: reqwest::Client,
    base_url: String,
    credentials: VenueCredentials,
}

impl KrakenAdapter {
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

    /// "BTC/USDT" -> "XBTUSDT" (Kraken calls bitcoin XBT).
    fn wire_pair(symbol: &str) -> String {
        symbol.to_uppercase().replace('/', "").replace("BTC", "XBT")
    }

    fn sign(&self, path: &str, nonce: &str, postdata: &str) -> Result<String> {
        let key = base64::engine::general_purpose::STANDARD
            .decode(self.credentials.api_secret.expose())
            .map_err(|e| VenueError::Auth(format!("secret is not valid base64: {e}")))?;

        let mut sha = Sha256::new();
        sha.update(nonce.as_bytes());
        sha.update(postdata.as_bytes());
        let digest = sha.finalize();

        let mut mac = Hmac::<Sha512>::new_from_slice(&key)
            .expect("hmac accepts any key length");
        mac.update(path.as_bytes());
        mac.update(&digest);
        Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Map Kraken's error strings onto the taxonomy.
    fn classify_errors(errors: &[String]) -> VenueError {
        let joined = errors.join(",");
        if joined.contains("Rate limit") || joined.contains("Too many requests") {
            VenueError::RateLimited(joined)
        } else if joined.contains("Insufficient funds") {
            VenueError::InsufficientFunds(joined)
        } else if joined.contains("Invalid key")
            || joined.contains("Invalid signature")
            || joined.contains("Permission denied")
        {
            VenueError::Auth(joined)
        } else if joined.starts_with("EService:") {
            VenueError::Transient(joined)
        } else {
            VenueError::RejectedByVenue(joined)
        }
    }

    /// Last trade price for a pair, for quote-to-base conversion on buys.
    async fn ticker_price(&self, pair: &str) -> Result<Decimal> {
        let response = self
            .http
            .get(format!("{}{TICKER_PATH}", self.base_url))
            .query(&[("pair", pair)])
            .send()
            .await
            // A ticker read has no side effects; any failure is transient.
            .map_err(|e| VenueError::Transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VenueError::Transient(format!("ticker HTTP {status}: {body}")));
        }

        let body: KrakenResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| VenueError::Transient(format!("ticker parse: {e}")))?;
        if !body.error.is_empty() {
            return Err(VenueError::Transient(body.error.join(",")));
        }

        // result is keyed by Kraken's internal pair name; take the first
        // entry's last-trade price ("c"[0]).
        body.result
            .as_ref()
            .and_then(|r| r.as_object())
            .and_then(|o| o.values().next())
            .and_then(|entry| entry.get("c"))
            .and_then(|c| c.get(0))
            .and_then(|p| p.as_str())
            .and_then(|p| p.parse::<Decimal>().ok())
            .filter(|p| !p.is_zero())
            .ok_or_else(|| VenueError::Transient(format!("no ticker price for {pair}")))
    }

    /// Base volume for the order. Sells carry base quantity already; buys
    /// convert quote spend at the current price.
    async fn order_volume(&self, request: &OrderRequest, pair: &str) -> Result<Decimal> {
        match request.side {
            OrderSide::Sell => Ok(request.amount),
            OrderSide::Buy => {
                let price = self.ticker_price(pair).await?;
                Ok((request.amount / price).round_dp(VOLUME_DECIMALS))
            }
        }
    }
}

impl VenueAdapter for KrakenAdapter {
    fn venue(&self) -> Venue {
        Venue::Kraken
    }

    fn supports_idempotency(&self) -> bool {
        false
    }

    fn place_market_order(&self, request: OrderRequest) -> BoxFuture<'_, Result<VenueReceipt>> {
        Box::pin(async move {
            let pair = Self::wire_pair(&request.symbol);
            let volume = self.order_volume(&request, &pair).await?;

            let nonce = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0)
                .to_string();
            let side = match request.side {
                OrderSide::Buy => "buy",
                OrderSide::Sell => "sell",
            };
            let postdata =
                format!("nonce={nonce}&ordertype=market&pair={pair}&type={side}&volume={volume}");
            let signature = self.sign(ADD_ORDER_PATH, &nonce, &postdata)?;

            debug!(pair = %pair, side, volume = %volume, "submitting kraken order");

            let response = self
                .http
                .post(format!("{}{ADD_ORDER_PATH}", self.base_url))
                .header("API-Key", &self.credentials.api_key)
                .header("API-Sign", signature)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(postdata)
                .send()
                .await
                .map_err(|e| VenueError::from_transport(&e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(VenueError::from_status(status.as_u16(), body));
            }

            let parsed: KrakenResponse<AddOrderResult> = response
                .json()
                .await
                .map_err(|e| VenueError::Transient(format!("response cut short: {e}")))?;

            if !parsed.error.is_empty() {
                return Err(Self::classify_errors(&parsed.error));
            }

            let order_id = parsed
                .result
                .and_then(|r| r.txid.into_iter().next())
                .ok_or_else(|| {
                    VenueError::Transient("accepted but no txid returned".to_string())
                })?;
            info!(order_id = %order_id, "kraken order accepted");
            Ok(VenueReceipt { order_id })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_core::Secret;

    #[test]
    fn test_wire_pair_uses_xbt() {
        assert_eq!(KrakenAdapter::wire_pair("BTC/USDT"), "XBTUSDT");
        assert_eq!(KrakenAdapter::wire_pair("eth/usdc"), "ETHUSDC");
    }

    #[test]
    fn test_sign_rejects_non_base64_secret() {
        let adapter = KrakenAdapter::new(VenueCredentials {
            api_key: "key".to_string(),
            api_secret: Secret::new("not base64!!!"),
        })
        .unwrap();
        assert!(matches!(
            adapter.sign(ADD_ORDER_PATH, "1", "nonce=1"),
            Err(VenueError::Auth(_))
        ));
    }

    #[test]
    fn test_sign_produces_base64() {
        let secret_b64 = base64::engine::general_purpose::STANDARD.encode(b"raw-secret");
        let adapter = KrakenAdapter::new(VenueCredentials {
            api_key: "key".to_string(),
            api_secret: Secret::new(secret_b64),
        })
        .unwrap();
        let sig = adapter
            .sign(ADD_ORDER_PATH, "1700000000000", "nonce=1700000000000&pair=XBTUSDT")
            .unwrap();
        assert!(base64::engine::general_purpose::STANDARD.decode(&sig).is_ok());
    }

    #[test]
    fn test_error_classification() {
        assert!(matches!(
            KrakenAdapter::classify_errors(&["EAPI:Rate limit exceeded".to_string()]),
            VenueError::RateLimited(_)
        ));
        assert!(matches!(
            KrakenAdapter::classify_errors(&["EAPI:Invalid signature".to_string()]),
            VenueError::Auth(_)
        ));
        assert!(matches!(
            KrakenAdapter::classify_errors(&["EService:Unavailable".to_string()]),
            VenueError::Transient(_)
        ));
        assert!(matches!(
            KrakenAdapter::classify_errors(&["EOrder:Insufficient funds".to_string()]),
            VenueError::InsufficientFunds(_)
        ));
        assert!(matches!(
            KrakenAdapter::classify_errors(&["EOrder:Unknown position".to_string()]),
            VenueError::RejectedByVenue(_)
        ));
    }
}
