//! The venue adapter trait and shared request/response types.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use edge_core::{ClientOrderId, OrderSide, Secret, Venue};

use crate::error::{Result, VenueError};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// API credentials for one venue.
#[derive(Debug, Clone)]
pub struct VenueCredentials {
    pub api_key: String,
    pub api_secret: Secret,
}

/// Normalized market order request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Trading pair in internal form, e.g. "BTC/USDC".
    pub symbol: String,
    pub side: OrderSide,
    /// Buy: quote currency to spend. Sell: base quantity to sell.
    pub amount: Decimal,
    pub client_order_id: ClientOrderId,
}

/// Normalized successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueReceipt {
    /// Venue-assigned order id.
    pub order_id: String,
}

/// One exchange behind a uniform market-order interface.
pub trait VenueAdapter: Send + Sync {
    fn venue(&self) -> Venue;

    /// Whether the venue deduplicates on the client order id natively.
    ///
    /// Adapters returning `false` rely on the local submission cache to
    /// refuse ambiguous resubmissions.
    fn supports_idempotency(&self) -> bool;

    /// Submit a market IOC order.
    fn place_market_order(&self, request: OrderRequest) -> BoxFuture<'_, Result<VenueReceipt>>;
}

pub type DynVenueAdapter = Arc<dyn VenueAdapter>;

/// Scripted adapter for tests.
///
/// Outcomes are consumed in order; once the script is exhausted every
/// submission succeeds with a fixed order id. All requests are recorded.
pub struct MockVenueAdapter {
    venue: Venue,
    idempotent: bool,
    inner: parking_lot::Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    script: Vec<Result<VenueReceipt>>,
    requests: Vec<OrderRequest>,
}

impl MockVenueAdapter {
    pub fn new(venue: Venue) -> Self {
        Self {
            venue,
            idempotent: true,
            inner: parking_lot::Mutex::new(MockState::default()),
        }
    }

    #[must_use]
    pub fn without_idempotency(mut self) -> Self {
        self.idempotent = false;
        self
    }

    /// Queue the next outcomes, consumed first-in first-out.
    pub fn script(&self, outcomes: Vec<Result<VenueReceipt>>) {
        self.inner.lock().script.extend(outcomes);
    }

    pub fn script_err(&self, errors: Vec<VenueError>) {
        self.script(errors.into_iter().map(Err).collect());
    }

    pub fn requests(&self) -> Vec<OrderRequest> {
        self.inner.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.inner.lock().requests.len()
    }
}

impl VenueAdapter for MockVenueAdapter {
    fn venue(&self) -> Venue {
        self.venue
    }

    fn supports_idempotency(&self) -> bool {
        self.idempotent
    }

    fn place_market_order(&self, request: OrderRequest) -> BoxFuture<'_, Result<VenueReceipt>> {
        let mut state = self.inner.lock();
        state.requests.push(request.clone());
        let outcome = if state.script.is_empty() {
            Ok(VenueReceipt {
                order_id: format!("{}-order-{}", self.venue, state.requests.len()),
            })
        } else {
            state.script.remove(0)
        };
        Box::pin(async move { outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request() -> OrderRequest {
        OrderRequest {
            symbol: "BTC/USDC".to_string(),
            side: OrderSide::Buy,
            amount: dec!(25),
            client_order_id: ClientOrderId::from_string("edge-c1".to_string()),
        }
    }

    #[tokio::test]
    async fn test_mock_script_then_default() {
        let mock = MockVenueAdapter::new(Venue::Coinbase);
        mock.script_err(vec![VenueError::RateLimited("throttle".into())]);

        let err = mock.place_market_order(request()).await.unwrap_err();
        assert!(matches!(err, VenueError::RateLimited(_)));

        let ok = mock.place_market_order(request()).await.unwrap();
        assert!(ok.order_id.starts_with("COINBASE-order-"));
        assert_eq!(mock.request_count(), 2);
    }
}
