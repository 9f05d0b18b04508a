//! Zoomcast Common Utilities
//!
//! Shared infrastructure for all Zoomcast crates:
//! - Error types and result aliases
//! - Clock and presentation-timestamp utilities
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
