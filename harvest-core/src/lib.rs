//! Pulse Harvest Core - Data model and configuration
//!
//! This crate provides:
//! - Pulse, indicator and search listing records from the threat-intel API
//! - Newest-first pulse ordering with an epoch fallback
//! - Run configuration and output file naming

pub mod config;
pub mod pulse;

pub use config::*;
pub use pulse::*;
