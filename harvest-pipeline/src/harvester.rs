//! Per-term harvest runner
//!
//! Runs collect then export for one search term and reports the outcome.
//! Every term starts from a fresh unique set and a fresh output file.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info};

use harvest_core::HarvestConfig;
use harvest_otx::PulseSource;

use crate::{Collector, CsvExporter, ExportError};

/// Result of a successful export for one term
#[derive(Debug, Clone)]
pub struct TermReport {
    pub term: String,
    pub path: PathBuf,
    pub unique_indicators: usize,
    pub pulses: usize,
    pub elapsed: Duration,
}

impl fmt::Display for TermReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Saved {} unique indicators from {} pulses to '{}' in {:.2} seconds",
            self.unique_indicators,
            self.pulses,
            self.path.display(),
            self.elapsed.as_secs_f64()
        )
    }
}

/// What happened to a search term
#[derive(Debug)]
pub enum TermOutcome {
    /// The search produced nothing; no file was written
    NoPulses,
    Exported(TermReport),
    /// The output file could not be written
    Failed(ExportError),
}

/// Drives collection and export, one search term at a time
pub struct Harvester<S> {
    collector: Collector<S>,
    exporter: CsvExporter,
    config: HarvestConfig,
}

impl<S: PulseSource> Harvester<S> {
    pub fn new(source: S, config: HarvestConfig) -> Self {
        Self {
            collector: Collector::new(source, &config),
            exporter: CsvExporter::new(&config),
            config,
        }
    }

    #[cfg(test)]
    pub(crate) fn collector(&self) -> &Collector<S> {
        &self.collector
    }

    /// Collect and export a single term
    pub async fn run_term(&self, term: &str) -> TermOutcome {
        let start = Instant::now();

        let collected = self.collector.collect(term).await;
        if collected.is_empty() {
            info!("No pulses found for '{}'", term);
            return TermOutcome::NoPulses;
        }

        let path = self.config.output_path(term);
        match self.exporter.export(&collected, &path) {
            Ok(unique_indicators) => TermOutcome::Exported(TermReport {
                term: term.to_string(),
                path,
                unique_indicators,
                pulses: collected.len(),
                elapsed: start.elapsed(),
            }),
            Err(e) => {
                error!("Export for '{}' failed: {}", term, e);
                TermOutcome::Failed(e)
            }
        }
    }
}
