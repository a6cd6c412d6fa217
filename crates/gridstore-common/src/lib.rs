//! Shared types for gridstore
//!
//! This crate contains the pieces used by both the grid adapter and the
//! document engine:
//! - `error`: the error taxonomy and `Result` alias
//! - `config`: spreadsheet and endpoint configuration
//! - `logging`: tracing subscriber bootstrap

pub mod config;
pub mod error;
pub mod logging;

pub use config::{GridStoreConfig, ValueInputOption};
pub use error::{GridStoreError, Result};
pub use logging::init_logging;
