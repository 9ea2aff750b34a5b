use std::time::Duration;

use async_trait::async_trait;
use common::models::Action;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Sentiment request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sentiment response rejected: {0}")]
    InvalidResponse(String),
}

/// Qualitative market opinion. `score` is in [-1, 1], `confidence` in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub score: f64,
    pub confidence: f64,
    #[serde(default)]
    pub factors: Vec<String>,
}

impl Sentiment {
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            confidence: 0.5,
            factors: Vec::new(),
        }
    }

    /// Clamps both scalars into range. NaN becomes neutral.
    pub fn clamped(self) -> Self {
        let fix = |v: f64, lo: f64, hi: f64, fallback: f64| if v.is_nan() { fallback } else { v.clamp(lo, hi) };
        Self {
            score: fix(self.score, -1.0, 1.0, 0.0),
            confidence: fix(self.confidence, 0.0, 1.0, 0.5),
            factors: self.factors,
        }
    }

    /// One-line reasoning note; flags disagreement with the technical action.
    pub fn annotation(&self, action: Action) -> String {
        let mut note = format!("Sentiment: {:+.2} (confidence {:.2})", self.score, self.confidence);
        if !self.factors.is_empty() {
            note.push_str(&format!(" [{}]", self.factors.join("; ")));
        }
        let disagrees = matches!(action, Action::Buy) && self.score < 0.0
            || matches!(action, Action::Sell) && self.score > 0.0;
        if disagrees {
            note.push_str(" - diverges from technical direction");
        }
        note
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub content: String,
    pub source: String,
}

/// Supplies headlines for the oracle to read.
#[async_trait]
pub trait NewsFeed: Send + Sync {
    async fn headlines(&self, symbol: &str) -> Vec<NewsItem>;
}

/// Placeholder feed producing one templated item per search topic.
pub struct TemplateNewsFeed;

#[async_trait]
impl NewsFeed for TemplateNewsFeed {
    async fn headlines(&self, symbol: &str) -> Vec<NewsItem> {
        ["trading analysis today", "price prediction", "market news", "technical analysis"]
            .iter()
            .map(|topic| NewsItem {
                title: format!("Market Analysis for {}", symbol),
                content: format!("Latest {} for {}", topic, symbol),
                source: "Market Analysis".to_string(),
            })
            .collect()
    }
}

#[async_trait]
pub trait SentimentOracle: Send + Sync {
    async fn analyze(&self, symbol: &str, news: &[NewsItem]) -> Result<Sentiment, OracleError>;
}

#[derive(Serialize)]
struct SentimentRequest<'a> {
    symbol: &'a str,
    news: &'a [NewsItem],
}

/// Oracle reached over HTTP: POSTs `{symbol, news}` and expects a
/// `{score, confidence, factors}` body.
pub struct HttpSentimentOracle {
    client: Client,
    url: String,
}

impl HttpSentimentOracle {
    pub fn new(url: &str) -> Result<Self, OracleError> {
        let client = Client::builder()
            .user_agent("signal_bot/0.1.0")
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl SentimentOracle for HttpSentimentOracle {
    async fn analyze(&self, symbol: &str, news: &[NewsItem]) -> Result<Sentiment, OracleError> {
        let response = self
            .client
            .post(&self.url)
            .json(&SentimentRequest { symbol, news })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::InvalidResponse(format!("HTTP {}", status)));
        }

        Ok(response.json::<Sentiment>().await?.clamped())
    }
}

/// Asks the oracle for an opinion. Any failure is logged and reported as
/// neutral sentiment.
pub async fn consult(oracle: &dyn SentimentOracle, feed: &dyn NewsFeed, symbol: &str) -> Sentiment {
    let news = feed.headlines(symbol).await;
    match oracle.analyze(symbol, &news).await {
        Ok(sentiment) => sentiment.clamped(),
        Err(e) => {
            warn!(symbol = %symbol, "Sentiment oracle failed, treating as neutral: {}", e);
            Sentiment::neutral()
        }
    }
}
