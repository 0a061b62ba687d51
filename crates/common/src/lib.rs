//! Jankscope Common Utilities
//!
//! Shared infrastructure for all Jankscope crates:
//! - Error types and result aliases
//! - Analysis configuration and lenient option coercion
//! - Tracing/logging initialization
//! - Clock-domain selection and time unit constants

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use config::*;
pub use error::*;
pub use time::*;
