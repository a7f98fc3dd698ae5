//! # MTTA Updater
//!
//! Fills a month column of an escalation policy workbook with each policy's
//! mean time to first acknowledgement, fetched from the incident analytics API.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (months, queries, responses, rows)
//! - **calculate**: Unit conversions
//! - **fetch**: Rate-limit aware metric fetching with retries
//! - **update**: Per-row processing and the run orchestrator
//! - **storage**: In-memory sheet model and workbook persistence
//! - **config**: Configuration loading and validation

pub mod calculate;
pub mod config;
pub mod fetch;
pub mod models;
pub mod storage;
pub mod update;

pub use models::*;
