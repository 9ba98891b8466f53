//! Pulse Collector
//!
//! Searches pulses for a term, walks them newest first and gathers each
//! pulse's indicators until the unique-indicator cap is reached.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::info;

use harvest_core::{sort_newest_first, HarvestConfig, Indicator, Pulse};
use harvest_otx::PulseSource;

use crate::PulseFeed;

/// A pulse together with the indicators the API returned for it
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedPulse {
    pub pulse: Pulse,
    /// Exactly as fetched; deduplication happens at export
    pub indicators: Vec<Indicator>,
}

/// Collects pulses and their indicators for one search term at a time
pub struct Collector<S> {
    feed: PulseFeed<S>,
    max_indicators: usize,
    max_pulses: usize,
    max_workers: usize,
}

impl<S: PulseSource> Collector<S> {
    pub fn new(source: S, config: &HarvestConfig) -> Self {
        Self {
            feed: PulseFeed::new(source),
            max_indicators: config.max_indicators,
            max_pulses: config.max_pulses,
            max_workers: config.max_workers.max(1),
        }
    }

    #[cfg(test)]
    pub(crate) fn feed(&self) -> &PulseFeed<S> {
        &self.feed
    }

    /// Collect pulses for `term`, fetching details one pulse at a time.
    ///
    /// Pulses whose details cannot be fetched are skipped. Collection stops
    /// as soon as `max_indicators` unique values have been seen; the pulse
    /// that reached the cap is still included with its full list.
    pub async fn collect(&self, term: &str) -> Vec<CollectedPulse> {
        let pulses = self.sorted_pulses(term).await;
        let mut acc = Accumulator::new(self.max_indicators);

        for pulse in pulses {
            let Some(indicators) = self.feed.fetch_indicators(&pulse).await else {
                continue;
            };
            if !acc.push(pulse, indicators) {
                break;
            }
        }

        acc.finish()
    }

    /// Same result as [`Collector::collect`], but with up to `max_workers`
    /// detail fetches in flight.
    ///
    /// Fetched lists are consumed in newest-first order, so the running
    /// unique set is only ever touched by this loop.
    pub async fn collect_concurrent(&self, term: &str) -> Vec<CollectedPulse> {
        let pulses = self.sorted_pulses(term).await;
        let feed = &self.feed;
        let mut acc = Accumulator::new(self.max_indicators);

        let mut fetched = std::pin::pin!(stream::iter(pulses)
            .map(|pulse| async move {
                let indicators = feed.fetch_indicators(&pulse).await;
                (pulse, indicators)
            })
            .buffered(self.max_workers));

        while let Some((pulse, indicators)) = fetched.next().await {
            let Some(indicators) = indicators else {
                continue;
            };
            if !acc.push(pulse, indicators) {
                break;
            }
        }

        acc.finish()
    }

    async fn sorted_pulses(&self, term: &str) -> Vec<Pulse> {
        info!("Searching pulses for: {}", term);

        let listing = self.feed.search(term, self.max_pulses).await;
        if listing.is_empty() {
            info!("No results found for '{}'", term);
            return Vec::new();
        }

        let mut pulses = listing.into_pulses();
        sort_newest_first(&mut pulses);
        pulses
    }
}

/// Running unique-indicator set plus the collected pulses
struct Accumulator {
    seen: HashSet<String>,
    max_indicators: usize,
    collected: Vec<CollectedPulse>,
}

impl Accumulator {
    fn new(max_indicators: usize) -> Self {
        Self {
            seen: HashSet::new(),
            max_indicators,
            collected: Vec::new(),
        }
    }

    /// Record a pulse. Returns `false` once the cap has been reached.
    fn push(&mut self, pulse: Pulse, indicators: Vec<Indicator>) -> bool {
        let mut capped = false;
        for indicator in &indicators {
            self.seen.insert(indicator.value().to_string());
            if self.seen.len() >= self.max_indicators {
                capped = true;
                break;
            }
        }

        self.collected.push(CollectedPulse { pulse, indicators });

        if capped {
            info!("Reached {} unique indicators", self.max_indicators);
        }
        !capped
    }

    fn finish(self) -> Vec<CollectedPulse> {
        self.collected
    }
}
