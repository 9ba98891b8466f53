//! Pulse source abstraction
//!
//! The pipeline only talks to this trait, so the OTX client can be swapped
//! for an in-memory source in tests.

use async_trait::async_trait;

use harvest_core::{Indicator, PulseListing};

use crate::{OtxClient, OtxError};

/// Anything that can search pulses and list a pulse's indicators
#[async_trait]
pub trait PulseSource: Send + Sync {
    /// Search pulses matching `term`, returning at most `max_results`
    async fn search_pulses(&self, term: &str, max_results: usize)
        -> Result<PulseListing, OtxError>;

    /// Indicators of the pulse with the given id
    async fn pulse_indicators(&self, pulse_id: &str) -> Result<Vec<Indicator>, OtxError>;
}

#[async_trait]
impl PulseSource for OtxClient {
    async fn search_pulses(
        &self,
        term: &str,
        max_results: usize,
    ) -> Result<PulseListing, OtxError> {
        OtxClient::search_pulses(self, term, max_results).await
    }

    async fn pulse_indicators(&self, pulse_id: &str) -> Result<Vec<Indicator>, OtxError> {
        OtxClient::pulse_indicators(self, pulse_id).await
    }
}
