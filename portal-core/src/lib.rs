//! Core library for the captive-portal provisioning client.
//! This crate defines the device-facing trait and wire structures, the
//! connection lifecycle (catalog, selection, controller, poller), an HTTP
//! implementation of the device API and a simulator of the device side.

pub mod backends;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod poller;
pub mod selection;
pub mod simulator;
pub mod structs;
pub mod traits;
pub mod web_server;

// Define a shared Error and Result type for the entire crate.

use thiserror::Error;

pub use controller::{ConnectionController, ConnectionState, ControllerSnapshot, FailureKind};
pub use structs::{DisplayNetwork, RawNetwork, SecurityClass};

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A request that could not be completed for a reason other than
    /// an HTTP client error (scripted failures, unreachable simulators).
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Web server error: {0}")]
    WebServer(#[from] axum::BoxError),

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

/// A specialized `Result` type for this crate's operations.
pub type Result<T> = std::result::Result<T, Error>;
