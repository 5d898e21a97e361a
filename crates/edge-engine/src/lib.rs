//! Command execution engine.
//!
//! Owns the forward-only command state machine: claim, safety gates,
//! dry-run synthesis or live venue dispatch with bounded retries, and the
//! terminal report back to the Bus.

pub mod backoff;
pub mod engine;
pub mod error;

pub use backoff::{with_backoff, RetryError, RetryPolicy};
pub use engine::{ExecutionEngine, ProcessOutcome};
pub use error::{EngineError, Result};
