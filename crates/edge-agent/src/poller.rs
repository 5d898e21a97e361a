//! The top-level poller loop.
//!
//! On a fixed cadence: pull pending commands, drop anything addressed to
//! another agent or failing signature verification (never claimed), then
//! hand the rest to the engine on a bounded worker pool. Commands for the
//! same venue+symbol pair are serialized to avoid self-inflicted rate
//! limit storms.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, error, info, warn};

use edge_auth::{Clock, MessageSigner};
use edge_bus::DynQueueClient;
use edge_core::{CommandEnvelope, Venue};
use edge_engine::ExecutionEngine;

type PairLocks = DashMap<(Venue, String), Arc<Mutex<()>>>;

pub struct Poller {
    agent_id: String,
    queue: DynQueueClient,
    engine: Arc<ExecutionEngine>,
    verifier: Arc<MessageSigner>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    pull_limit: usize,
    workers: Arc<Semaphore>,
    pair_locks: Arc<PairLocks>,
}

impl Poller {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        agent_id: String,
        queue: DynQueueClient,
        engine: Arc<ExecutionEngine>,
        verifier: Arc<MessageSigner>,
        clock: Arc<dyn Clock>,
        poll_interval: Duration,
        pull_limit: usize,
        max_workers: usize,
    ) -> Self {
        Self {
            agent_id,
            queue,
            engine,
            verifier,
            clock,
            poll_interval,
            pull_limit,
            workers: Arc::new(Semaphore::new(max_workers)),
            pair_locks: Arc::new(DashMap::new()),
        }
    }

    /// Run until ctrl-c.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        info!(interval_secs = self.poll_interval.as_secs(), "poller started");
        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_cycle().await,
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown signal received, stopping poller");
                    break;
                }
            }
        }
    }

    /// One poll cycle: fetch, filter, dispatch, and wait for the batch.
    pub async fn run_cycle(&self) {
        let envelopes = match self.queue.fetch_pending(self.pull_limit).await {
            Ok(envelopes) => envelopes,
            Err(e) => {
                warn!(error = %e, "fetch_pending failed, skipping cycle");
                return;
            }
        };
        if envelopes.is_empty() {
            debug!("no pending commands");
            return;
        }

        let mut handles = Vec::with_capacity(envelopes.len());
        for envelope in envelopes {
            let Some(command) = self.screen(envelope) else {
                continue;
            };

            let permit = match Arc::clone(&self.workers).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let lock = self
                .pair_locks
                .entry((command.venue, command.symbol.clone()))
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();
            let engine = Arc::clone(&self.engine);

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                // Serialize commands for the same venue+symbol pair.
                let _serial = lock.lock().await;
                if let Err(e) = engine.process(command).await {
                    error!(error = %e, "command processing failed");
                }
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Pre-claim screening: address check and signature verification.
    /// A command failing either is dropped without a claim.
    fn screen(&self, envelope: CommandEnvelope) -> Option<edge_core::Command> {
        let command = envelope.command;
        if command.agent_id != self.agent_id {
            warn!(
                command_id = %command.id,
                addressed_to = %command.agent_id,
                "command for another agent, ignoring"
            );
            return None;
        }
        if let Err(e) =
            self.verifier
                .verify(&command, envelope.ts, &envelope.sig, self.clock.as_ref())
        {
            warn!(
                command_id = %command.id,
                error = %e,
                "envelope failed verification, skipping without claim"
            );
            return None;
        }
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicI32, Ordering};

    use edge_auth::{FixedClock, SystemClock};
    use edge_bus::MockQueueClient;
    use edge_core::{
        Command, CommandId, CommandStatus, ExecutionMode, ModeControl, OrderSide, Secret,
    };
    use edge_engine::RetryPolicy;
    use edge_venues::{
        BoxFuture, MockVenueAdapter, OrderRequest, Result as VenueResult, VenueAdapter,
        VenueReceipt, VenueRouter,
    };

    fn command(id: &str, symbol: &str) -> Command {
        Command {
            id: CommandId::new(id),
            agent_id: "edge-cb-1".to_string(),
            venue: Venue::Coinbase,
            symbol: symbol.to_string(),
            side: OrderSide::Buy,
            amount: dec!(25),
            status: CommandStatus::Pending,
            created_at: Utc::now(),
            claimed_at: None,
            completed_at: None,
            result: None,
        }
    }

    fn sign_envelope(command: Command, secret: &str, ts: i64) -> CommandEnvelope {
        let signer = MessageSigner::new(Secret::new(secret)).unwrap();
        let signed = signer.sign(&command, &FixedClock(ts)).unwrap();
        CommandEnvelope {
            command,
            ts: signed.ts,
            sig: signed.sig,
        }
    }

    fn poller_with(
        queue: Arc<MockQueueClient>,
        router: Arc<VenueRouter>,
        mode: ExecutionMode,
        max_workers: usize,
    ) -> Poller {
        let engine = Arc::new(ExecutionEngine::new(
            "edge-cb-1".to_string(),
            Arc::new(ModeControl::new(mode, false)),
            queue.clone(),
            router,
            RetryPolicy::immediate(3),
        ));
        Poller::new(
            "edge-cb-1".to_string(),
            queue,
            engine,
            Arc::new(MessageSigner::new(Secret::new("bus-secret")).unwrap()),
            Arc::new(SystemClock),
            Duration::from_secs(1),
            10,
            max_workers,
        )
    }

    fn now() -> i64 {
        SystemClock.now_unix()
    }

    #[tokio::test]
    async fn test_valid_command_is_claimed_and_reported() {
        let queue = Arc::new(MockQueueClient::new());
        queue.push_batch(vec![sign_envelope(
            command("c1", "BTC/USDC"),
            "bus-secret",
            now(),
        )]);
        let router = Arc::new(VenueRouter::new());
        let poller = poller_with(queue.clone(), router, ExecutionMode::Dryrun, 4);

        poller.run_cycle().await;

        assert_eq!(queue.claims().len(), 1);
        assert_eq!(queue.reports().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_signature_never_claimed() {
        let queue = Arc::new(MockQueueClient::new());
        queue.push_batch(vec![sign_envelope(
            command("c1", "BTC/USDC"),
            "wrong-secret",
            now(),
        )]);
        let poller = poller_with(
            queue.clone(),
            Arc::new(VenueRouter::new()),
            ExecutionMode::Dryrun,
            4,
        );

        poller.run_cycle().await;

        assert!(queue.claims().is_empty());
        assert!(queue.reports().is_empty());
    }

    #[tokio::test]
    async fn test_stale_timestamp_never_claimed() {
        let queue = Arc::new(MockQueueClient::new());
        queue.push_batch(vec![sign_envelope(
            command("c1", "BTC/USDC"),
            "bus-secret",
            now() - 3600,
        )]);
        let poller = poller_with(
            queue.clone(),
            Arc::new(VenueRouter::new()),
            ExecutionMode::Dryrun,
            4,
        );

        poller.run_cycle().await;

        assert!(queue.claims().is_empty());
    }

    #[tokio::test]
    async fn test_command_for_other_agent_ignored() {
        let queue = Arc::new(MockQueueClient::new());
        let mut cmd = command("c1", "BTC/USDC");
        cmd.agent_id = "edge-other".to_string();
        queue.push_batch(vec![sign_envelope(cmd, "bus-secret", now())]);
        let poller = poller_with(
            queue.clone(),
            Arc::new(VenueRouter::new()),
            ExecutionMode::Dryrun,
            4,
        );

        poller.run_cycle().await;

        assert!(queue.claims().is_empty());
    }

    /// Adapter that records how many submissions overlap in time.
    struct ConcurrencyProbe {
        active: AtomicI32,
        peak: AtomicI32,
    }

    impl ConcurrencyProbe {
        fn new() -> Self {
            Self {
                active: AtomicI32::new(0),
                peak: AtomicI32::new(0),
            }
        }
    }

    impl VenueAdapter for ConcurrencyProbe {
        fn venue(&self) -> Venue {
            Venue::Coinbase
        }

        fn supports_idempotency(&self) -> bool {
            true
        }

        fn place_market_order(
            &self,
            request: OrderRequest,
        ) -> BoxFuture<'_, VenueResult<VenueReceipt>> {
            Box::pin(async move {
                let current = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.active.fetch_sub(1, Ordering::SeqCst);
                Ok(VenueReceipt {
                    order_id: format!("probe-{}", request.client_order_id),
                })
            })
        }
    }

    #[tokio::test]
    async fn test_same_pair_commands_serialized() {
        let queue = Arc::new(MockQueueClient::new());
        queue.push_batch(vec![
            sign_envelope(command("c1", "BTC/USDC"), "bus-secret", now()),
            sign_envelope(command("c2", "BTC/USDC"), "bus-secret", now()),
            sign_envelope(command("c3", "BTC/USDC"), "bus-secret", now()),
        ]);
        let probe = Arc::new(ConcurrencyProbe::new());
        let router = Arc::new(VenueRouter::new().with_adapter(probe.clone()));
        let poller = poller_with(queue.clone(), router, ExecutionMode::Live, 4);

        poller.run_cycle().await;

        assert_eq!(queue.reports().len(), 3);
        // All three share the venue+symbol lock, so adapter calls never
        // overlapped even with four workers available.
        assert_eq!(probe.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_pairs_can_run_concurrently() {
        let queue = Arc::new(MockQueueClient::new());
        queue.push_batch(vec![
            sign_envelope(command("c1", "BTC/USDC"), "bus-secret", now()),
            sign_envelope(command("c2", "ETH/USDC"), "bus-secret", now()),
        ]);
        let adapter = Arc::new(MockVenueAdapter::new(Venue::Coinbase));
        let router = Arc::new(VenueRouter::new().with_adapter(adapter.clone()));
        let poller = poller_with(queue.clone(), router, ExecutionMode::Live, 4);

        poller.run_cycle().await;

        assert_eq!(adapter.request_count(), 2);
        assert_eq!(queue.reports().len(), 2);
    }
}
