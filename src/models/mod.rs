//! Core data models for the MTTA updater.

use thiserror::Error;

mod metrics;
mod month;
mod policy;

pub use metrics::*;
pub use month::*;
pub use policy::*;

/// Errors raised while building model values from user input.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
