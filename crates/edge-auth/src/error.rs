//! Authentication error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("signing key is empty")]
    EmptyKey,

    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("malformed timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("timestamp outside allowed skew: message ts {message_ts}, now {now}, max skew {max_skew_secs}s")]
    StaleTimestamp {
        message_ts: i64,
        now: i64,
        max_skew_secs: i64,
    },

    #[error("signature verification failed")]
    BadSignature,
}

pub type Result<T> = std::result::Result<T, AuthError>;
