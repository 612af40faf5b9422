//! Core types and infrastructure for the diagram filter
//!
//! Shared data model, error taxonomy, configuration, run-scoped context, and
//! logging setup used by every pipeline stage.

mod config;
mod context;
mod error;
pub mod logging;
mod types;

pub use config::*;
pub use context::*;
pub use error::*;
pub use types::*;
