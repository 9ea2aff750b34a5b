use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One price/volume snapshot for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub symbol: String,
    pub price: f64,
    pub volume: f64,
    pub change_24h: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub timestamp: DateTime<Utc>,
}
