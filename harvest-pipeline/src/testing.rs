//! In-memory pulse source for tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use harvest_core::{Indicator, Pulse, PulseListing};
use harvest_otx::{OtxError, PulseSource};

#[derive(Default)]
pub struct StaticSource {
    pulses: Vec<Pulse>,
    indicators: HashMap<String, Vec<Indicator>>,
    failing: HashSet<String>,
    search_fails: bool,
    search_calls: Mutex<usize>,
    detail_calls: Mutex<Vec<String>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pulse to the search results, in API order
    pub fn with_pulse(mut self, pulse: Pulse, indicators: Vec<Indicator>) -> Self {
        self.indicators.insert(pulse.id().to_string(), indicators);
        self.pulses.push(pulse);
        self
    }

    /// Add a pulse whose detail fetch fails
    pub fn with_failing_pulse(mut self, pulse: Pulse) -> Self {
        self.failing.insert(pulse.id().to_string());
        self.pulses.push(pulse);
        self
    }

    pub fn failing_search(mut self) -> Self {
        self.search_fails = true;
        self
    }

    pub fn search_calls(&self) -> usize {
        *self.search_calls.lock().unwrap()
    }

    pub fn detail_calls(&self) -> Vec<String> {
        self.detail_calls.lock().unwrap().clone()
    }
}

pub fn indicators(values: &[&str]) -> Vec<Indicator> {
    values.iter().map(|v| Indicator::new("domain", v)).collect()
}

#[async_trait]
impl PulseSource for StaticSource {
    async fn search_pulses(
        &self,
        _term: &str,
        max_results: usize,
    ) -> Result<PulseListing, OtxError> {
        *self.search_calls.lock().unwrap() += 1;
        if self.search_fails {
            return Err(OtxError::Status {
                status: 503,
                url: "/api/v1/search/pulses".to_string(),
            });
        }
        Ok(PulseListing::Bare(
            self.pulses.iter().take(max_results).cloned().collect(),
        ))
    }

    async fn pulse_indicators(&self, pulse_id: &str) -> Result<Vec<Indicator>, OtxError> {
        self.detail_calls.lock().unwrap().push(pulse_id.to_string());
        if self.failing.contains(pulse_id) {
            return Err(OtxError::Status {
                status: 500,
                url: format!("/api/v1/pulses/{}", pulse_id),
            });
        }
        Ok(self.indicators.get(pulse_id).cloned().unwrap_or_default())
    }
}
