//! Shared utilities for the AI market monitor
//!
//! Logging setup and the application-level settings shared by the library
//! crates and the `ai-monitor` binary.

pub mod config;
pub mod logging;

pub use config::AppConfig;
pub use logging::{init_tracing, init_tracing_with};
