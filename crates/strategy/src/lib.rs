pub mod composer;
pub mod indicators;
pub mod predictor;
pub mod sentiment;

pub use composer::{RiskParameters, SignalComposer};
pub use predictor::{DirectionPredictor, PredictorConfig};
pub use sentiment::{
    HttpSentimentOracle, NewsFeed, NewsItem, OracleError, Sentiment, SentimentOracle, TemplateNewsFeed,
};
