use chrono::{DateTime, Utc};
use common::models::Observation;
use serde::Deserialize;

use crate::{error::SourceError, traits::RemoteResponse};

/// Payload of `GET /api/v3/ticker/24hr?symbol=...`. Numbers arrive as strings.
#[derive(Debug, Deserialize)]
pub struct TickerResponse {
    pub symbol: String,
    #[serde(rename(deserialize = "lastPrice"))]
    pub last_price: String,
    pub volume: String,
    #[serde(rename(deserialize = "priceChangePercent"))]
    pub price_change_percent: String,
    #[serde(rename(deserialize = "highPrice"))]
    pub high_price: String,
    #[serde(rename(deserialize = "lowPrice"))]
    pub low_price: String,
    #[serde(rename(deserialize = "closeTime"))]
    pub close_time: Option<i64>,
}

impl TickerResponse {
    fn number(&self, field: &str, raw: &str) -> Result<f64, SourceError> {
        raw.parse::<f64>().map_err(|_| {
            SourceError::InvalidResponse(format!("{} for {}: '{}'", field, self.symbol, raw))
        })
    }
}

impl RemoteResponse for TickerResponse {
    fn to_observation(&self, symbol: &str) -> Result<Observation, SourceError> {
        let price = self.number("lastPrice", &self.last_price)?;
        if price <= 0.0 {
            return Err(SourceError::InvalidResponse(format!(
                "non-positive price for {}",
                self.symbol
            )));
        }

        let timestamp = self
            .close_time
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        Ok(Observation {
            symbol: symbol.to_string(),
            price,
            volume: self.number("volume", &self.volume)?,
            change_24h: self.number("priceChangePercent", &self.price_change_percent)?,
            high_24h: self.number("highPrice", &self.high_price)?,
            low_24h: self.number("lowPrice", &self.low_price)?,
            timestamp,
        })
    }
}
