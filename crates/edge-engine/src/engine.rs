//! The command state machine.
//!
//! One `process` call drives a single command from PENDING to a reported
//! terminal status:
//!
//! 1. Skip commands already resolved this process lifetime (duplicate
//!    delivery guard; the Bus's atomic claim is the authoritative one).
//! 2. Capture the mode/hold snapshot, then claim. A lost claim is a silent
//!    skip, not an error.
//! 3. HOLD is a hard stop: FAILED with reason exactly "held".
//! 4. Dry-run synthesizes a deterministic `SIM-<venue>-<id>` order id and
//!    logs the would-be call; live mode dispatches through the router with
//!    bounded retries.
//! 5. The terminal status is reported before the command counts as
//!    resolved. An undeliverable report is logged at error level with the
//!    full receipt for operator reconciliation and never retried by
//!    re-executing.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{error, info, warn};

use edge_bus::DynQueueClient;
use edge_core::{
    ClientOrderId, Command, CommandId, CommandStatus, ModeControl, Receipt,
};
use edge_venues::{OrderRequest, VenueRouter};

use crate::backoff::{with_backoff, RetryError, RetryPolicy};
use crate::error::{EngineError, Result};

/// Reason string for the HOLD gate, fixed by the reporting contract.
const HELD_REASON: &str = "held";
const RETRIES_EXHAUSTED_REASON: &str = "retries_exhausted";

/// What became of one processed command.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Already resolved this lifetime; no claim attempted.
    AlreadyResolved,
    /// Another claimant won the race; dropped for this cycle.
    ClaimLost,
    /// Claimed, executed (or gated), and reported.
    Resolved {
        status: CommandStatus,
        receipt: Receipt,
    },
}

pub struct ExecutionEngine {
    agent_id: String,
    mode: Arc<ModeControl>,
    queue: DynQueueClient,
    router: Arc<VenueRouter>,
    retry: RetryPolicy,
    /// Command ids resolved this process lifetime.
    resolved: DashMap<CommandId, CommandStatus>,
}

impl ExecutionEngine {
    pub fn new(
        agent_id: String,
        mode: Arc<ModeControl>,
        queue: DynQueueClient,
        router: Arc<VenueRouter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            agent_id,
            mode,
            queue,
            router,
            retry,
            resolved: DashMap::new(),
        }
    }

    /// Drive one command through the state machine.
    pub async fn process(&self, command: Command) -> Result<ProcessOutcome> {
        let id = command.id.clone();

        if self.resolved.contains_key(&id) {
            warn!(command_id = %id, "duplicate delivery of resolved command, skipping");
            return Ok(ProcessOutcome::AlreadyResolved);
        }

        // Mode and hold are read at the moment of claim, never earlier.
        let snapshot = self.mode.snapshot();

        if !self.queue.claim(id.clone()).await? {
            info!(command_id = %id, "claim lost, dropping for this cycle");
            return Ok(ProcessOutcome::ClaimLost);
        }

        let (status, receipt) = if let Err(e) = command.validate() {
            warn!(command_id = %id, error = %e, "invalid command payload");
            (
                CommandStatus::Failed,
                Receipt::failed(&self.agent_id, &command, e.to_string()),
            )
        } else if snapshot.hold {
            warn!(command_id = %id, "hold gate active, refusing execution");
            (
                CommandStatus::Failed,
                Receipt::failed(&self.agent_id, &command, HELD_REASON),
            )
        } else if !snapshot.is_live() {
            let order_id = format!("SIM-{}-{}", command.venue, id);
            info!(
                command_id = %id,
                venue = %command.venue,
                symbol = %command.symbol,
                side = %command.side,
                amount = %command.amount,
                order_id = %order_id,
                "dry-run: would place market order"
            );
            (
                CommandStatus::Done,
                Receipt::done(&self.agent_id, &command, order_id, true),
            )
        } else {
            self.execute_live(&command).await
        };

        match self
            .queue
            .report(id.clone(), status, receipt.clone())
            .await
        {
            Ok(()) => {
                self.resolved.insert(id, status);
                Ok(ProcessOutcome::Resolved { status, receipt })
            }
            Err(e) => {
                // The outcome is real even though the Bus never heard it.
                // Surface everything an operator needs to reconcile by hand.
                let receipt_json =
                    serde_json::to_string(&receipt).unwrap_or_else(|_| format!("{receipt:?}"));
                error!(
                    command_id = %id,
                    status = %status,
                    receipt = %receipt_json,
                    error = %e,
                    "terminal report undelivered, command stuck IN_FLIGHT on bus"
                );
                self.resolved.insert(id.clone(), status);
                Err(EngineError::ReportUndelivered {
                    command_id: id.to_string(),
                })
            }
        }
    }

    async fn execute_live(&self, command: &Command) -> (CommandStatus, Receipt) {
        let request = OrderRequest {
            symbol: command.symbol.clone(),
            side: command.side,
            amount: command.amount,
            client_order_id: ClientOrderId::for_command(&command.id),
        };

        let result = with_backoff(&self.retry, |_| {
            let request = request.clone();
            async move { self.router.submit(command.venue, request).await }
        })
        .await;

        match result {
            Ok(venue_receipt) => {
                info!(
                    command_id = %command.id,
                    venue = %command.venue,
                    order_id = %venue_receipt.order_id,
                    "live order placed"
                );
                (
                    CommandStatus::Done,
                    Receipt::done(&self.agent_id, command, venue_receipt.order_id, false),
                )
            }
            Err(RetryError::Terminal(e)) => {
                warn!(command_id = %command.id, venue = %command.venue, error = %e, "terminal venue failure");
                (
                    CommandStatus::Failed,
                    Receipt::failed(&self.agent_id, command, e.to_string()),
                )
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!(
                    command_id = %command.id,
                    venue = %command.venue,
                    attempts,
                    last_error = %last,
                    "retries exhausted"
                );
                (
                    CommandStatus::Failed,
                    Receipt::failed(&self.agent_id, command, RETRIES_EXHAUSTED_REASON),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use edge_bus::MockQueueClient;
    use edge_core::{ExecutionMode, OrderSide, Venue};
    use edge_venues::{MockVenueAdapter, VenueError};
    use rust_decimal_macros::dec;

    fn command(id: &str) -> Command {
        Command {
            id: CommandId::new(id),
            agent_id: "edge-cb-1".to_string(),
            venue: Venue::Coinbase,
            symbol: "BTC/USDC".to_string(),
            side: OrderSide::Buy,
            amount: dec!(25),
            status: CommandStatus::Pending,
            created_at: Utc::now(),
            claimed_at: None,
            completed_at: None,
            result: None,
        }
    }

    struct Harness {
        engine: ExecutionEngine,
        queue: Arc<MockQueueClient>,
        adapter: Arc<MockVenueAdapter>,
        mode: Arc<ModeControl>,
    }

    fn harness(mode: ExecutionMode, hold: bool) -> Harness {
        let queue = Arc::new(MockQueueClient::new());
        let adapter = Arc::new(MockVenueAdapter::new(Venue::Coinbase));
        let router = Arc::new(VenueRouter::new().with_adapter(adapter.clone()));
        let control = Arc::new(ModeControl::new(mode, hold));
        let engine = ExecutionEngine::new(
            "edge-cb-1".to_string(),
            control.clone(),
            queue.clone(),
            router,
            RetryPolicy::immediate(3),
        );
        Harness {
            engine,
            queue,
            adapter,
            mode: control,
        }
    }

    #[tokio::test]
    async fn test_dryrun_synthesizes_sim_order() {
        let h = harness(ExecutionMode::Dryrun, false);
        let outcome = h.engine.process(command("c1")).await.unwrap();
        match outcome {
            ProcessOutcome::Resolved { status, receipt } => {
                assert_eq!(status, CommandStatus::Done);
                assert_eq!(receipt.order_id.as_deref(), Some("SIM-COINBASE-c1"));
                assert!(receipt.dry_run);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        // Dry-run never touches the adapter.
        assert_eq!(h.adapter.request_count(), 0);
        assert_eq!(h.queue.reports().len(), 1);
    }

    #[tokio::test]
    async fn test_hold_fails_with_exact_reason() {
        let h = harness(ExecutionMode::Live, true);
        let outcome = h.engine.process(command("c1")).await.unwrap();
        match outcome {
            ProcessOutcome::Resolved { status, receipt } => {
                assert_eq!(status, CommandStatus::Failed);
                assert_eq!(receipt.reason.as_deref(), Some("held"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(h.adapter.request_count(), 0);
    }

    #[tokio::test]
    async fn test_live_success_reports_done() {
        let h = harness(ExecutionMode::Live, false);
        let outcome = h.engine.process(command("c1")).await.unwrap();
        match outcome {
            ProcessOutcome::Resolved { status, receipt } => {
                assert_eq!(status, CommandStatus::Done);
                assert!(!receipt.dry_run);
                assert!(receipt.order_id.is_some());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(h.adapter.request_count(), 1);
        let request = &h.adapter.requests()[0];
        assert_eq!(request.client_order_id.as_str(), "edge-c1");
    }

    #[tokio::test]
    async fn test_claim_lost_skips_silently() {
        let h = harness(ExecutionMode::Live, false);
        h.queue.deny_claim(CommandId::new("c1"));
        let outcome = h.engine.process(command("c1")).await.unwrap();
        assert!(matches!(outcome, ProcessOutcome::ClaimLost));
        assert_eq!(h.adapter.request_count(), 0);
        assert!(h.queue.reports().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_delivery_skipped() {
        let h = harness(ExecutionMode::Dryrun, false);
        h.engine.process(command("c1")).await.unwrap();
        let outcome = h.engine.process(command("c1")).await.unwrap();
        assert!(matches!(outcome, ProcessOutcome::AlreadyResolved));
        // Only the first delivery claimed and reported.
        assert_eq!(h.queue.claims().len(), 1);
        assert_eq!(h.queue.reports().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_amount_fails_after_claim() {
        let h = harness(ExecutionMode::Live, false);
        let mut cmd = command("c1");
        cmd.amount = dec!(0);
        let outcome = h.engine.process(cmd).await.unwrap();
        match outcome {
            ProcessOutcome::Resolved { status, receipt } => {
                assert_eq!(status, CommandStatus::Failed);
                assert!(receipt.reason.unwrap().contains("invalid amount"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(h.adapter.request_count(), 0);
    }

    #[tokio::test]
    async fn test_hold_read_at_claim_time() {
        let h = harness(ExecutionMode::Live, false);
        // Flip hold before processing; the claim-time snapshot must see it.
        h.mode.set_hold(true);
        let outcome = h.engine.process(command("c1")).await.unwrap();
        match outcome {
            ProcessOutcome::Resolved { receipt, .. } => {
                assert_eq!(receipt.reason.as_deref(), Some("held"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_report_failure_is_operator_visible() {
        let h = harness(ExecutionMode::Dryrun, false);
        // Mock report fails outright; BusClient's deadline loop is bypassed.
        h.queue.fail_reports(1);
        let err = h.engine.process(command("c1")).await.unwrap_err();
        assert!(matches!(err, EngineError::ReportUndelivered { .. }));
        // The command still counts as resolved locally, so a duplicate
        // delivery cannot re-execute it.
        let outcome = h.engine.process(command("c1")).await.unwrap();
        assert!(matches!(outcome, ProcessOutcome::AlreadyResolved));
    }

    #[tokio::test]
    async fn test_terminal_venue_failure_carries_reason() {
        let h = harness(ExecutionMode::Live, false);
        h.adapter
            .script_err(vec![VenueError::InsufficientFunds("USDC short".into())]);
        let outcome = h.engine.process(command("c1")).await.unwrap();
        match outcome {
            ProcessOutcome::Resolved { status, receipt } => {
                assert_eq!(status, CommandStatus::Failed);
                assert!(receipt.reason.unwrap().contains("insufficient funds"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(h.adapter.request_count(), 1);
    }
}
