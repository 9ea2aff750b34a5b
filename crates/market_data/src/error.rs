use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error("Feed unavailable: {0}")]
    Unavailable(String),
}
