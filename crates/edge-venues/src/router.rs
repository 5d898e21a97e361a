//! Venue routing with submission dedup.
//!
//! Dispatches normalized order requests to the adapter for the target venue
//! and enforces the submission cache around every live call: an id whose
//! previous outcome is unknown or confirmed is refused rather than resent.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use edge_core::Venue;

use crate::adapter::{DynVenueAdapter, OrderRequest, VenueAdapter, VenueReceipt};
use crate::dedup::{SubmissionCache, SubmissionState};
use crate::error::{Result, VenueError};

#[derive(Default)]
pub struct VenueRouter {
    adapters: HashMap<Venue, DynVenueAdapter>,
    cache: SubmissionCache,
}

impl VenueRouter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn VenueAdapter>) -> Self {
        self.adapters.insert(adapter.venue(), adapter);
        self
    }

    pub fn register(&mut self, adapter: Arc<dyn VenueAdapter>) {
        self.adapters.insert(adapter.venue(), adapter);
    }

    /// Venues with a configured adapter.
    pub fn configured(&self) -> Vec<Venue> {
        let mut venues: Vec<Venue> = self.adapters.keys().copied().collect();
        venues.sort_by_key(|v| v.as_str());
        venues
    }

    /// Submit a live order through the venue's adapter.
    ///
    /// The submission cache is consulted first: a client order id that was
    /// already confirmed, or whose previous attempt is in doubt, is refused
    /// terminally. The caller's retry loop re-enters here per attempt;
    /// definite non-acceptance releases the id so the retry proceeds.
    pub async fn submit(&self, venue: Venue, request: OrderRequest) -> Result<VenueReceipt> {
        let adapter = self.adapters.get(&venue).ok_or_else(|| {
            VenueError::RejectedByVenue(format!("venue not configured: {venue}"))
        })?;

        let id = request.client_order_id.clone();
        if !self.cache.begin(&id) {
            let reason = match self.cache.state(&id) {
                Some(SubmissionState::Confirmed) => {
                    format!("client_order_id {id} already submitted and confirmed")
                }
                _ => format!("client_order_id {id} already submitted, outcome unknown"),
            };
            warn!(venue = %venue, client_order_id = %id, "refusing resubmission");
            return Err(VenueError::RejectedByVenue(reason));
        }

        match adapter.place_market_order(request).await {
            Ok(receipt) => {
                self.cache.confirm(&id);
                Ok(receipt)
            }
            Err(e) => {
                self.cache.settle(&id, &e, adapter.supports_idempotency());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MockVenueAdapter;
    use edge_core::{ClientOrderId, OrderSide};
    use rust_decimal_macros::dec;

    fn request(id: &str) -> OrderRequest {
        OrderRequest {
            symbol: "BTC/USDC".to_string(),
            side: OrderSide::Buy,
            amount: dec!(25),
            client_order_id: ClientOrderId::from_string(id.to_string()),
        }
    }

    #[tokio::test]
    async fn test_unconfigured_venue_rejected() {
        let router = VenueRouter::new();
        let err = router.submit(Venue::Kraken, request("edge-a")).await.unwrap_err();
        assert!(matches!(err, VenueError::RejectedByVenue(_)));
    }

    #[tokio::test]
    async fn test_success_confirms_and_blocks_resend() {
        let mock = Arc::new(MockVenueAdapter::new(Venue::Coinbase));
        let router = VenueRouter::new().with_adapter(mock.clone());

        router.submit(Venue::Coinbase, request("edge-a")).await.unwrap();

        let err = router.submit(Venue::Coinbase, request("edge-a")).await.unwrap_err();
        assert!(err.to_string().contains("already submitted and confirmed"));
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_releases_for_retry() {
        let mock = Arc::new(MockVenueAdapter::new(Venue::Coinbase));
        mock.script_err(vec![VenueError::RateLimited("throttle".into())]);
        let router = VenueRouter::new().with_adapter(mock.clone());

        let err = router.submit(Venue::Coinbase, request("edge-a")).await.unwrap_err();
        assert!(err.is_retryable());

        router.submit(Venue::Coinbase, request("edge-a")).await.unwrap();
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_timeout_refused_without_native_dedup() {
        let mock = Arc::new(MockVenueAdapter::new(Venue::Kraken).without_idempotency());
        mock.script_err(vec![VenueError::Transient("request timed out".into())]);
        let router = VenueRouter::new().with_adapter(mock.clone());

        let err = router.submit(Venue::Kraken, request("edge-a")).await.unwrap_err();
        assert!(matches!(err, VenueError::Transient(_)));

        // The ambiguous outcome pins the id; the resend never reaches the venue.
        let err = router.submit(Venue::Kraken, request("edge-a")).await.unwrap_err();
        assert!(err.to_string().contains("outcome unknown"));
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_transient_retries_with_native_dedup() {
        let mock = Arc::new(MockVenueAdapter::new(Venue::Binanceus));
        mock.script_err(vec![VenueError::Transient("502".into())]);
        let router = VenueRouter::new().with_adapter(mock.clone());

        router.submit(Venue::Binanceus, request("edge-a")).await.unwrap_err();
        router.submit(Venue::Binanceus, request("edge-a")).await.unwrap();
        assert_eq!(mock.request_count(), 2);
    }
}
