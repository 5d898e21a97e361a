//! Request/response DTOs for the Bus HTTP API.
//!
//! All requests are signed: the canonical JSON body travels verbatim with
//! `X-Timestamp` / `X-Signature` headers carrying the detached tag. The
//! body additionally carries its own `ts` so the server can persist the
//! request time with the record.

use serde::{Deserialize, Serialize};

use edge_core::{CommandEnvelope, CommandId, CommandStatus, Receipt};

/// `POST /api/commands/pull` — fetch pending commands for this agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub agent_id: String,
    /// Upper bound on commands returned per pull.
    pub limit: usize,
    pub ts: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullResponse {
    pub ok: bool,
    #[serde(default)]
    pub commands: Vec<CommandEnvelope>,
}

/// `POST /api/commands/claim` — atomically transition PENDING -> IN_FLIGHT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimRequest {
    pub agent_id: String,
    pub command_id: CommandId,
    pub ts: i64,
}

/// Claim outcome. `claimed == false` means another claim won the race (or
/// the command already left PENDING); the agent drops the command silently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub ok: bool,
    pub claimed: bool,
}

/// `POST /api/commands/ack` — report the terminal status and receipt.
/// Idempotent on the server: repeating the same terminal report is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub agent_id: String,
    pub command_id: CommandId,
    pub status: CommandStatus,
    pub receipt: Receipt,
    pub ts: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub ok: bool,
}
