//! Queue client abstraction.
//!
//! The engine and poller talk to the Bus through this trait so tests can
//! substitute a scripted in-memory queue. Methods take owned arguments and
//! return boxed futures to stay dyn-compatible.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use edge_core::{CommandEnvelope, CommandId, CommandStatus, Receipt};

use crate::error::{BusError, Result};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Transport to the authoritative command queue.
pub trait QueueClient: Send + Sync {
    /// Fetch up to `limit` pending commands addressed to this agent.
    fn fetch_pending(&self, limit: usize) -> BoxFuture<'_, Result<Vec<CommandEnvelope>>>;

    /// Atomically claim a command (PENDING -> IN_FLIGHT on the Bus).
    ///
    /// Returns `false` when the claim was lost to a concurrent claimer or the
    /// command has already left PENDING.
    fn claim(&self, command_id: CommandId) -> BoxFuture<'_, Result<bool>>;

    /// Report the terminal status and receipt for a claimed command.
    fn report(
        &self,
        command_id: CommandId,
        status: CommandStatus,
        receipt: Receipt,
    ) -> BoxFuture<'_, Result<()>>;
}

pub type DynQueueClient = Arc<dyn QueueClient>;

/// Scripted in-memory queue for tests.
///
/// Batches pushed with [`push_batch`](MockQueueClient::push_batch) are
/// returned one per `fetch_pending` call. Claim outcomes can be scripted per command
/// id; reports are recorded for assertions and can be made to fail a fixed
/// number of times.
#[derive(Default)]
pub struct MockQueueClient {
    inner: parking_lot::Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    batches: Vec<Vec<CommandEnvelope>>,
    denied_claims: Vec<CommandId>,
    claims: Vec<CommandId>,
    reports: Vec<(CommandId, CommandStatus, Receipt)>,
    report_failures_remaining: u32,
}

impl MockQueueClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a batch to be returned by the next `fetch_pending`.
    pub fn push_batch(&self, batch: Vec<CommandEnvelope>) {
        self.inner.lock().batches.push(batch);
    }

    /// Make `claim` return `false` for this command id.
    pub fn deny_claim(&self, command_id: CommandId) {
        self.inner.lock().denied_claims.push(command_id);
    }

    /// Make the next `n` report calls fail with a transport error.
    pub fn fail_reports(&self, n: u32) {
        self.inner.lock().report_failures_remaining = n;
    }

    /// Command ids for which `claim` was attempted, in order.
    pub fn claims(&self) -> Vec<CommandId> {
        self.inner.lock().claims.clone()
    }

    /// Successfully delivered reports, in order.
    pub fn reports(&self) -> Vec<(CommandId, CommandStatus, Receipt)> {
        self.inner.lock().reports.clone()
    }
}

impl QueueClient for MockQueueClient {
    fn fetch_pending(&self, limit: usize) -> BoxFuture<'_, Result<Vec<CommandEnvelope>>> {
        let mut state = self.inner.lock();
        let batch = if state.batches.is_empty() {
            Vec::new()
        } else {
            let mut batch = state.batches.remove(0);
            batch.truncate(limit);
            batch
        };
        Box::pin(async move { Ok(batch) })
    }

    fn claim(&self, command_id: CommandId) -> BoxFuture<'_, Result<bool>> {
        let mut state = self.inner.lock();
        state.claims.push(command_id.clone());
        let granted = !state.denied_claims.contains(&command_id);
        Box::pin(async move { Ok(granted) })
    }

    fn report(
        &self,
        command_id: CommandId,
        status: CommandStatus,
        receipt: Receipt,
    ) -> BoxFuture<'_, Result<()>> {
        let mut state = self.inner.lock();
        if state.report_failures_remaining > 0 {
            state.report_failures_remaining -= 1;
            return Box::pin(async move {
                Err(BusError::Transport("scripted report failure".to_string()))
            });
        }
        state.reports.push((command_id, status, receipt));
        Box::pin(async move { Ok(()) })
    }
}
