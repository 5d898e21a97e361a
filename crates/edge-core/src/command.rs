//! Command lifecycle types.
//!
//! A `Command` is the unit of work: a single requested trade action owned
//! authoritatively by the cloud controller (the Bus) and executed by the
//! agent. The agent only ever holds a local in-memory view; every status
//! mutation must be round-tripped back to the Bus before it counts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::venue::{OrderSide, Venue};

/// Unique command identifier assigned by the controller.
///
/// Immutable and globally unique; doubles as the idempotency key for the
/// whole execution pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(String);

impl CommandId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CommandId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Command lifecycle status.
///
/// Transitions are strictly forward:
/// PENDING -> IN_FLIGHT -> {DONE, FAILED}. No regressions, no skips.
/// The PENDING -> IN_FLIGHT edge is the Bus's atomic claim; the agent never
/// performs it locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    #[default]
    Pending,
    InFlight,
    Done,
    Failed,
}

impl CommandStatus {
    /// Whether this status is terminal (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether `next` is a legal forward transition from this status.
    pub fn can_transition_to(&self, next: CommandStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InFlight)
                | (Self::InFlight, Self::Done)
                | (Self::InFlight, Self::Failed)
        )
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::InFlight => "IN_FLIGHT",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// A trade command as delivered by the Bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    /// Controller-assigned id.
    pub id: CommandId,
    /// Target agent; commands for other agents are ignored.
    pub agent_id: String,
    /// Execution venue.
    pub venue: Venue,
    /// Trading pair, e.g. "BTC/USDC".
    pub symbol: String,
    /// Buy or sell.
    pub side: OrderSide,
    /// Positive decimal quantity (currency units, not lot count).
    pub amount: Decimal,
    /// Lifecycle status as last seen from the Bus.
    #[serde(default)]
    pub status: CommandStatus,
    /// When the controller created the command.
    pub created_at: DateTime<Utc>,
    /// Set by the Bus when the command is claimed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
    /// Set by the Bus when the command reaches a terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Populated only in DONE/FAILED.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Receipt>,
}

impl Command {
    /// Validate the payload before execution.
    ///
    /// Fails on non-positive amount or an empty symbol. Invalid commands are
    /// resolved as FAILED after claim, never executed.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.amount <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount(self.amount.to_string()));
        }
        if self.symbol.trim().is_empty() {
            return Err(CoreError::InvalidSymbol(self.symbol.clone()));
        }
        Ok(())
    }
}

/// Signed envelope wrapping a command as pulled from the Bus.
///
/// `sig` is the HMAC tag over `"<ts>.<canonical_json(command)>"`. The agent
/// verifies it before claiming; a command failing verification is never
/// claimed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub command: Command,
    /// Unix timestamp (seconds) at signing time.
    pub ts: i64,
    /// Hex-encoded HMAC-SHA256 tag.
    pub sig: String,
}

/// Normalized terminal result reported back to the Bus.
///
/// The same shape for dry-run and live execution, distinguished only by the
/// `dry_run` flag and the synthesized order id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub agent_id: String,
    pub venue: Venue,
    pub symbol: String,
    pub side: OrderSide,
    pub amount: Decimal,
    /// Venue order id (or synthesized `SIM-*` id in dry-run). DONE only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Failure reason. FAILED only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub dry_run: bool,
    pub ts: DateTime<Utc>,
}

impl Receipt {
    /// Receipt for a successful execution.
    pub fn done(agent_id: &str, command: &Command, order_id: String, dry_run: bool) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            venue: command.venue,
            symbol: command.symbol.clone(),
            side: command.side,
            amount: command.amount,
            order_id: Some(order_id),
            reason: None,
            dry_run,
            ts: Utc::now(),
        }
    }

    /// Receipt for a terminal failure.
    pub fn failed(agent_id: &str, command: &Command, reason: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            venue: command.venue,
            symbol: command.symbol.clone(),
            side: command.side,
            amount: command.amount,
            order_id: None,
            reason: Some(reason.into()),
            dry_run: false,
            ts: Utc::now(),
        }
    }
}
