//! NovaTrade edge agent.
//!
//! Wires configuration, signing, the Bus client, venue adapters, and the
//! execution engine into the top-level poller loop.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod poller;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
