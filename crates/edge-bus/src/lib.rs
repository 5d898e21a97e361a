//! Queue client for the NovaTrade command Bus.
//!
//! The Bus is the authoritative command store. This crate provides the
//! transport: pulling pending commands, claiming them atomically, and
//! reporting terminal results, all over signed HTTP.

pub mod client;
pub mod error;
pub mod queue;
pub mod wire;

pub use client::{BusClient, BusConfig};
pub use error::{BusError, Result};
pub use queue::{BoxFuture, DynQueueClient, MockQueueClient, QueueClient};
pub use wire::{
    AckResponse, ClaimRequest, ClaimResponse, PullRequest, PullResponse, ReportRequest,
};
