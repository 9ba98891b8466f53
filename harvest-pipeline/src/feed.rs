//! Failure-absorbing adapter over a pulse source
//!
//! Search and detail failures are logged with their term or pulse id and
//! turned into empty results, so one bad call never aborts a search.

use tracing::{debug, warn};

use harvest_core::{Indicator, Pulse, PulseListing};
use harvest_otx::PulseSource;

/// Wraps a [`PulseSource`] with the skip-and-continue failure policy
pub struct PulseFeed<S> {
    source: S,
}

impl<S: PulseSource> PulseFeed<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    #[cfg(test)]
    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    /// Search pulses; an error yields an empty listing
    pub async fn search(&self, term: &str, max_pulses: usize) -> PulseListing {
        match self.source.search_pulses(term, max_pulses).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!("Error fetching pulses for '{}': {}", term, e);
                PulseListing::default()
            }
        }
    }

    /// Indicators of a pulse, or `None` when the fetch failed
    pub async fn fetch_indicators(&self, pulse: &Pulse) -> Option<Vec<Indicator>> {
        let Some(id) = pulse.id.as_deref() else {
            warn!("Skipping pulse '{}' without an id", pulse.name());
            return None;
        };

        match self.source.pulse_indicators(id).await {
            Ok(indicators) => {
                debug!("Fetched {} indicators from pulse {}", indicators.len(), id);
                Some(indicators)
            }
            Err(e) => {
                warn!("Error fetching indicators for pulse {}: {}", id, e);
                None
            }
        }
    }
}
