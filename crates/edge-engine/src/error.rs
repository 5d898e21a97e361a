//! Engine error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Bus transport failure before the command reached a terminal state
    /// (fetch or claim). The command stays PENDING and is retried next cycle.
    #[error("bus error: {0}")]
    Bus(#[from] edge_bus::BusError),

    /// The command reached a terminal state but the report could not be
    /// delivered. The outcome has been logged for operator reconciliation;
    /// the command remains IN_FLIGHT on the Bus and must not be re-executed.
    #[error("terminal report undelivered for command {command_id}")]
    ReportUndelivered { command_id: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;
