use async_trait::async_trait;
use common::models::Observation;

use crate::error::SourceError;

/// Supplies the latest observation per symbol.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Short label used in logs (e.g. "simulated").
    fn name(&self) -> &'static str;

    async fn get_latest(&self, symbol: &str) -> Result<Observation, SourceError>;
}

/// A raw payload from a remote feed that can be turned into an observation.
pub trait RemoteResponse {
    fn to_observation(&self, symbol: &str) -> Result<Observation, SourceError>;
}
