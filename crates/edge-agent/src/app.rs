//! Application wiring.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use edge_auth::{MessageSigner, SystemClock};
use edge_bus::{BusClient, BusConfig, DynQueueClient};
use edge_core::{AgentIdentity, ExecutionMode, ModeControl, Venue};
use edge_engine::{ExecutionEngine, RetryPolicy};
use edge_venues::{BinanceUsAdapter, CoinbaseAdapter, KrakenAdapter, VenueRouter};

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::poller::Poller;

pub struct Application {
    poller: Poller,
}

impl Application {
    /// Build the full stack from validated configuration.
    ///
    /// Everything that can fail does so here, before the first poll.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let identity = AgentIdentity::new(config.agent_id.clone(), config.bus_secret()?)?;

        // Startup banner: logged exactly once.
        info!(
            agent = %identity.agent_id,
            mode = %config.mode,
            hold = config.hold,
            base = %config.bus_url,
            "edge agent starting"
        );

        let bus = BusClient::new(
            BusConfig {
                base_url: config.bus_url.clone(),
                ..Default::default()
            },
            identity.agent_id.clone(),
            MessageSigner::new(identity.secret.clone())?,
        )?;
        let queue: DynQueueClient = Arc::new(bus);
        let verifier = Arc::new(MessageSigner::new(identity.secret.clone())?);

        let mut router = VenueRouter::new();
        if config.mode == ExecutionMode::Live {
            // Adapters exist only in live mode; dry-run never touches them.
            if config.venues.coinbase.is_some() {
                router.register(Arc::new(CoinbaseAdapter::new(
                    config.venue_credentials(Venue::Coinbase)?,
                )?));
            }
            if config.venues.binanceus.is_some() {
                router.register(Arc::new(BinanceUsAdapter::new(
                    config.venue_credentials(Venue::Binanceus)?,
                )?));
            }
            if config.venues.kraken.is_some() {
                router.register(Arc::new(KrakenAdapter::new(
                    config.venue_credentials(Venue::Kraken)?,
                )?));
            }
        }
        let router = Arc::new(router);
        info!(venues = ?router.configured(), "venue adapters registered");

        let engine = Arc::new(ExecutionEngine::new(
            identity.agent_id.clone(),
            Arc::new(ModeControl::new(config.mode, config.hold)),
            Arc::clone(&queue),
            router,
            RetryPolicy {
                max_attempts: config.max_attempts,
                ..Default::default()
            },
        ));

        let poller = Poller::new(
            identity.agent_id,
            queue,
            engine,
            verifier,
            Arc::new(SystemClock),
            Duration::from_secs(config.poll_interval_secs),
            config.pull_limit,
            config.max_workers,
        );

        Ok(Self { poller })
    }

    /// Run the poller until shutdown.
    pub async fn run(&self) -> AppResult<()> {
        self.poller.run().await;
        info!("edge agent stopped");
        Ok(())
    }
}
