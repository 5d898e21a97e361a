//! Venue execution error taxonomy.

use thiserror::Error;

/// Normalized venue failure classes.
///
/// Every adapter maps its wire-level failures onto exactly these variants;
/// the engine's retry and dedup decisions key off the variant alone.
#[derive(Debug, Clone, Error)]
pub enum VenueError {
    /// Credential failure (401/403 or signature rejection). Terminal;
    /// retrying with the same credentials cannot succeed.
    #[error("venue auth failure: {0}")]
    Auth(String),

    /// HTTP 429 or a venue-specific throttle response. Retryable.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Not enough balance to fill the order. Terminal.
    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    /// 5xx, transport fault, or timeout. Retryable; whether a retry may
    /// actually resend goes through the submission cache.
    #[error("transient venue failure: {0}")]
    Transient(String),

    /// Venue definitively refused the order. Terminal.
    #[error("rejected by venue: {0}")]
    RejectedByVenue(String),
}

impl VenueError {
    /// Whether the same submission may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Transient(_))
    }

    /// Whether the venue definitively did NOT accept the order.
    ///
    /// Transient failures are excluded: a timeout after send may have
    /// executed, so resubmission safety depends on the venue's own dedup.
    pub fn is_definitely_not_accepted(&self) -> bool {
        !matches!(self, Self::Transient(_))
    }

    /// Map an HTTP status + body onto the taxonomy.
    pub fn from_status(status: u16, body: String) -> Self {
        let lower = body.to_lowercase();
        match status {
            401 | 403 => Self::Auth(format!("HTTP {status}: {body}")),
            429 => Self::RateLimited(format!("HTTP 429: {body}")),
            400..=499 if lower.contains("insufficient") => {
                Self::InsufficientFunds(format!("HTTP {status}: {body}"))
            }
            400..=499 => Self::RejectedByVenue(format!("HTTP {status}: {body}")),
            _ => Self::Transient(format!("HTTP {status}: {body}")),
        }
    }

    /// Map a transport-level failure onto the taxonomy.
    ///
    /// Timeouts and broken streams are transient, never silent success;
    /// whether the retry may resend is the submission cache's call.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        Self::Transient(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VenueError>;
