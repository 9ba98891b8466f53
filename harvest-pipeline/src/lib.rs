//! Pulse Harvest Pipeline
//!
//! Linear fetch-transform-export over a pulse source:
//! - **PulseFeed**: absorbs API failures per term and per pulse
//! - **Collector**: newest-first pulse walk with a unique-indicator cap
//! - **CsvExporter**: deduplicated `;`-delimited export
//! - **Harvester**: collect then export, one search term at a time

pub mod collector;
pub mod exporter;
pub mod feed;
pub mod harvester;

#[cfg(test)]
pub(crate) mod testing;

pub use collector::*;
pub use exporter::*;
pub use feed::*;
pub use harvester::*;
