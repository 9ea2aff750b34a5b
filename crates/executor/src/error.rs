use market_data::SourceError;
use storage::StoreError;
use thiserror::Error;

/// Why a symbol produced no signal in a cycle.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("market data unavailable: {0}")]
    DataSource(#[from] SourceError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
}
