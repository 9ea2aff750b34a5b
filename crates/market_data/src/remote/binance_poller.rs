use std::time::Duration;

use async_trait::async_trait;
use common::models::Observation;
use reqwest::{Client, StatusCode};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{
    error::SourceError,
    remote::ticker_response::TickerResponse,
    traits::{MarketDataSource, RemoteResponse},
};

const MAX_RETRIES: u32 = 3;

/// Live feed backed by the public 24h ticker endpoint.
pub struct BinanceTickerSource {
    client: Client,
    base_url: String,
}

impl BinanceTickerSource {
    pub fn new(base_url: &str) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent("signal_bot/0.1.0")
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// "BTC/USDT" -> "BTCUSDT"
    pub fn exchange_symbol(symbol: &str) -> String {
        symbol
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_uppercase()
    }

    async fn make_request(&self, symbol: &str) -> Result<TickerResponse, SourceError> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("symbol", Self::exchange_symbol(symbol))])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SourceError::RateLimited("HTTP 429: Too Many Requests".to_string()));
        }
        if status == StatusCode::IM_A_TEAPOT {
            return Err(SourceError::RateLimited("HTTP 418: IP has been auto-banned".to_string()));
        }
        if !status.is_success() {
            return Err(SourceError::InvalidResponse(format!("HTTP {} for {}", status, symbol)));
        }

        if let Some(used_weight) = response
            .headers()
            .get("x-mbx-used-weight-1m")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u32>().ok())
        {
            if used_weight > 1000 {
                warn!("High API weight usage: {}", used_weight);
            } else {
                debug!("Used weights: {}/1200", used_weight);
            }
        }

        Ok(response.json::<TickerResponse>().await?)
    }
}

#[async_trait]
impl MarketDataSource for BinanceTickerSource {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn get_latest(&self, symbol: &str) -> Result<Observation, SourceError> {
        let mut retry_count = 0;

        loop {
            match self.make_request(symbol).await {
                Ok(response) => return response.to_observation(symbol),
                Err(SourceError::RateLimited(reason)) => {
                    retry_count += 1;
                    if retry_count > MAX_RETRIES {
                        return Err(SourceError::RateLimited(format!(
                            "max retries exceeded for {}: {}",
                            symbol, reason
                        )));
                    }

                    let backoff_seconds = 2_u64.pow(retry_count);
                    warn!(
                        "Rate limited for symbol {}, backing off for {} seconds (attempt {}/{})",
                        symbol, backoff_seconds, retry_count, MAX_RETRIES
                    );
                    sleep(Duration::from_secs(backoff_seconds)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
