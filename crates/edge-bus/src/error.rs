//! Bus transport error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    /// Transport-level failure: connect, DNS, timeout, broken stream.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status from the Bus.
    #[error("bus returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("signing failed: {0}")]
    Auth(#[from] edge_auth::AuthError),

    #[error("malformed bus response: {0}")]
    Decode(String),

    /// Report could not be delivered within the hard deadline.
    #[error("report delivery deadline exceeded after {attempts} attempts")]
    ReportDeadline { attempts: u32 },
}

impl BusError {
    /// Whether a retry of the same request is worthwhile.
    ///
    /// Transport faults, 429 and 5xx are retryable; auth failures and other
    /// 4xx are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, BusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(BusError::Transport("timeout".into()).is_retryable());
        assert!(BusError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(BusError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(!BusError::Status { status: 401, body: String::new() }.is_retryable());
        assert!(!BusError::Status { status: 404, body: String::new() }.is_retryable());
        assert!(!BusError::Decode("bad json".into()).is_retryable());
    }
}
