use serde::Deserialize;
use std::collections::BTreeMap;

/// Maps a requested bucket width in seconds onto one of the storage's
/// precomputed granularity codes.
///
/// The mapping is total: widths that are not in the accepted table fall back
/// to `default_granularity` instead of being rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GranularityMapper {
    accepted_granularities: BTreeMap<u64, u64>,
    default_granularity: u64,
}

impl GranularityMapper {
    pub fn new(
        accepted_granularities: impl IntoIterator<Item = (u64, u64)>,
        default_granularity: u64,
    ) -> Self {
        Self {
            accepted_granularities: accepted_granularities.into_iter().collect(),
            default_granularity,
        }
    }

    pub fn map(&self, requested_seconds: u64) -> u64 {
        self.accepted_granularities
            .get(&requested_seconds)
            .copied()
            .unwrap_or(self.default_granularity)
    }

    pub fn accepted_granularities(&self) -> &BTreeMap<u64, u64> {
        &self.accepted_granularities
    }

    pub fn default_granularity(&self) -> u64 {
        self.default_granularity
    }
}
