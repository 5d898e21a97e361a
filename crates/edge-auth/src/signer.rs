//! Detached HMAC-SHA256 signing and verification.
//!
//! Tag format: hex HMAC-SHA256 over `"<unix_ts>.<canonical_json>"`. The
//! timestamp binds each tag to a narrow validity window; the canonical body
//! binds it to the exact payload.

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use edge_core::Secret;

use crate::canonical::canonical_json;
use crate::clock::Clock;
use crate::error::{AuthError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Default tolerated clock skew between signer and verifier.
pub const DEFAULT_MAX_SKEW_SECS: i64 = 180;

/// A payload signed for transmission to the Bus.
#[derive(Debug, Clone)]
pub struct SignedPayload {
    /// Canonical JSON body. Sent as the request body verbatim; re-serializing
    /// would risk diverging from the signed bytes.
    pub body: String,
    /// Unix timestamp at signing time.
    pub ts: i64,
    /// Hex-encoded HMAC-SHA256 tag.
    pub sig: String,
}

/// Signs outgoing payloads and verifies incoming ones with a shared secret.
pub struct MessageSigner {
    secret: Secret,
    max_skew_secs: i64,
}

impl MessageSigner {
    pub fn new(secret: Secret) -> Result<Self> {
        if secret.is_empty() {
            return Err(AuthError::EmptyKey);
        }
        Ok(Self {
            secret,
            max_skew_secs: DEFAULT_MAX_SKEW_SECS,
        })
    }

    #[must_use]
    pub fn with_max_skew(mut self, secs: i64) -> Self {
        self.max_skew_secs = secs;
        self
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length, so this cannot fail.
        HmacSha256::new_from_slice(self.secret.as_bytes()).expect("hmac accepts any key length")
    }

    fn tag(&self, ts: i64, body: &str) -> String {
        let mut mac = self.mac();
        mac.update(ts.to_string().as_bytes());
        mac.update(b".");
        mac.update(body.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Sign a payload for transmission.
    pub fn sign<T: Serialize>(&self, payload: &T, clock: &dyn Clock) -> Result<SignedPayload> {
        let body = canonical_json(payload)?;
        let ts = clock.now_unix();
        let sig = self.tag(ts, &body);
        Ok(SignedPayload { body, ts, sig })
    }

    /// Verify a detached tag over a payload.
    ///
    /// Checks, in order: timestamp parse, skew window, hex decode, constant
    /// time tag comparison. Any failure means the payload is discarded
    /// without side effects.
    pub fn verify<T: Serialize>(
        &self,
        payload: &T,
        ts: i64,
        sig: &str,
        clock: &dyn Clock,
    ) -> Result<()> {
        let now = clock.now_unix();
        if (now - ts).abs() > self.max_skew_secs {
            return Err(AuthError::StaleTimestamp {
                message_ts: ts,
                now,
                max_skew_secs: self.max_skew_secs,
            });
        }

        let expected =
            hex::decode(sig).map_err(|e| AuthError::MalformedSignature(e.to_string()))?;

        let body = canonical_json(payload)?;
        let mut mac = self.mac();
        mac.update(ts.to_string().as_bytes());
        mac.update(b".");
        mac.update(body.as_bytes());
        mac.verify_slice(&expected).map_err(|_| AuthError::BadSignature)
    }
}
