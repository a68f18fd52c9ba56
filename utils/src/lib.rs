//! Shared utilities for the ballot system.

pub mod logging;

pub use logging::{init_logging, init_tracing, LogFormat};
