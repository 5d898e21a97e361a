//! Venue adapters for order execution.
//!
//! One adapter per exchange behind a common trait. Adapters translate a
//! normalized market order request into each venue's wire format, sign it
//! with venue credentials, and map responses onto the shared error taxonomy.
//! A local submission cache provides idempotency for venues that lack a
//! native client order id dedup.

pub mod adapter;
pub mod binanceus;
pub mod coinbase;
pub mod dedup;
pub mod error;
pub mod kraken;
pub mod router;

pub use adapter::{
    BoxFuture, MockVenueAdapter, OrderRequest, VenueAdapter, VenueCredentials, VenueReceipt,
};
pub use binanceus::BinanceUsAdapter;
pub use coinbase::CoinbaseAdapter;
pub use dedup::{SubmissionCache, SubmissionState};
pub use error::{Result, VenueError};
pub use kraken::KrakenAdapter;
pub use router::VenueRouter;
