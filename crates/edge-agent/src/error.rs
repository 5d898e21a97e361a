//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to initialize logging: {0}")]
    Logging(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Core(#[from] edge_core::CoreError),

    #[error(transparent)]
    Auth(#[from] edge_auth::AuthError),

    #[error(transparent)]
    Bus(#[from] edge_bus::BusError),

    #[error(transparent)]
    Venue(#[from] edge_venues::VenueError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;
