//! HMAC authentication for Bus traffic.
//!
//! Every payload exchanged with the Bus is authenticated with a detached
//! HMAC-SHA256 tag over `"<unix_ts>.<canonical_json(payload)>"`. The
//! canonical form fixes key order and spacing so that both ends can
//! recompute the exact same bytes independently of their JSON library's
//! map iteration order.

pub mod canonical;
pub mod clock;
pub mod error;
pub mod signer;

pub use canonical::canonical_json;
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{AuthError, Result};
pub use signer::{MessageSigner, SignedPayload};
