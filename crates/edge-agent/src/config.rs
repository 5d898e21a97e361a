//! Application configuration.
//!
//! The TOML file carries everything except secrets. The shared Bus secret
//! comes from `EDGE_SECRET`; venue API secrets come from
//! `<VENUE>_API_SECRET`. Missing secrets are fatal at startup, never
//! per-command.

use std::path::Path;

use serde::{Deserialize, Serialize};

use edge_core::{ExecutionMode, Secret, Venue};
use edge_venues::VenueCredentials;

use crate::error::{AppError, AppResult};

/// Environment variable holding the shared Bus secret.
pub const EDGE_SECRET_ENV: &str = "EDGE_SECRET";

/// One venue's non-secret credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueSection {
    /// API key id. The secret comes from `<VENUE>_API_SECRET`.
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VenuesConfig {
    #[serde(default)]
    pub coinbase: Option<VenueSection>,
    #[serde(default)]
    pub binanceus: Option<VenueSection>,
    #[serde(default)]
    pub kraken: Option<VenueSection>,
}

impl VenuesConfig {
    pub fn section(&self, venue: Venue) -> Option<&VenueSection> {
        match venue {
            Venue::Coinbase => self.coinbase.as_ref(),
            Venue::Binanceus => self.binanceus.as_ref(),
            Venue::Kraken => self.kraken.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bus-registered identity of this agent.
    pub agent_id: String,
    /// Controller base address.
    #[serde(default = "default_bus_url")]
    pub bus_url: String,
    /// dryrun or live.
    #[serde(default)]
    pub mode: ExecutionMode,
    /// Safety hold: suppresses all venue-mutating calls even in live mode.
    #[serde(default)]
    pub hold: bool,
    /// Poll cadence in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Upper bound on commands per pull.
    #[serde(default = "default_pull_limit")]
    pub pull_limit: usize,
    /// Worker pool bound per cycle.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Venue submission attempts (including the first).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub venues: VenuesConfig,
}

fn default_bus_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_pull_limit() -> usize {
    10
}

fn default_max_workers() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    3
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Startup validation of everything that must not fail per-command.
    pub fn validate(&self) -> AppResult<()> {
        if self.agent_id.trim().is_empty() {
            return Err(AppError::Config("agent_id must not be empty".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(AppError::Config(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.max_workers == 0 {
            return Err(AppError::Config("max_workers must be at least 1".to_string()));
        }
        if self.mode == ExecutionMode::Live {
            // Live execution needs complete credentials for every configured
            // venue before the first command arrives.
            for venue in Venue::all() {
                if self.venues.section(venue).is_some() {
                    self.venue_credentials(venue)?;
                }
            }
        }
        Ok(())
    }

    /// The shared Bus secret from the environment.
    pub fn bus_secret(&self) -> AppResult<Secret> {
        let value = std::env::var(EDGE_SECRET_ENV)
            .map_err(|_| AppError::Config(format!("{EDGE_SECRET_ENV} is not set")))?;
        if value.is_empty() {
            return Err(AppError::Config(format!("{EDGE_SECRET_ENV} is empty")));
        }
        Ok(Secret::new(value))
    }

    fn secret_env_name(venue: Venue) -> String {
        format!("{}_API_SECRET", venue.as_str())
    }

    /// Credentials for a configured venue; the secret comes from the env.
    pub fn venue_credentials(&self, venue: Venue) -> AppResult<VenueCredentials> {
        let section = self.venues.section(venue).ok_or_else(|| {
            AppError::Config(format!("no [venues.{}] section", venue.as_str().to_lowercase()))
        })?;
        let env_name = Self::secret_env_name(venue);
        let secret = std::env::var(&env_name)
            .map_err(|_| AppError::Config(format!("{env_name} is not set")))?;
        if secret.is_empty() {
            return Err(AppError::Config(format!("{env_name} is empty")));
        }
        Ok(VenueCredentials {
            api_key: section.api_key.clone(),
            api_secret: Secret::new(secret),
        })
    }
}
