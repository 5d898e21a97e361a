//! Core domain types for the NovaTrade edge agent.
//!
//! This crate provides fundamental types used throughout the agent:
//! - `Command`: the unit of work pulled from the Bus
//! - `CommandStatus`: the forward-only lifecycle state machine
//! - `Venue`, `OrderSide`, `ClientOrderId`: execution primitives
//! - `AgentIdentity`, `Secret`: agent credentials
//! - `ModeControl`, `ModeSnapshot`: dry-run/live mode and the safety hold

pub mod command;
pub mod error;
pub mod identity;
pub mod mode;
pub mod venue;

pub use command::{Command, CommandEnvelope, CommandId, CommandStatus, Receipt};
pub use error::{CoreError, Result};
pub use identity::{AgentIdentity, Secret};
pub use mode::{ExecutionMode, ModeControl, ModeSnapshot};
pub use venue::{ClientOrderId, OrderSide, Venue};
