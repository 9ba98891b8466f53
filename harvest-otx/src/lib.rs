//! Pulse Harvest OTX Layer
//!
//! Provides access to the OTX threat-intel API:
//! - Authenticated HTTP client
//! - Paginated pulse search
//! - Pulse detail (indicator list) retrieval

pub mod client;
pub mod source;

pub use client::*;
pub use source::*;
