use std::collections::HashMap;
use std::time::Duration;

use config::{Config, Environment};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_SYMBOLS: &[&str; 5] = &["USD/BRL", "USD/CAD", "NZD/CAD", "USD/BDT", "USD/DZD"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("{key} must be at least 1")]
    NotPositive { key: &'static str },
    #[error("SYMBOLS must name at least one symbol")]
    NoSymbols,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    #[default]
    Simulated,
    Binance,
}

/// Which signal line the MACD indicator reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum SignalLineMode {
    /// signal = 0.9 * macd
    #[default]
    #[serde(rename = "approximate")]
    Approximate,
    /// EMA(signal period) over the MACD series.
    #[serde(rename = "ema", alias = "exponential")]
    Exponential,
}

/// Process settings. Each field maps to the upper-cased environment
/// variable of the same name; `signal_line` reads `MACD_SIGNAL`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub symbols: Vec<String>,
    pub interval_seconds: u64,
    pub database_path: String,
    pub history_limit: usize,
    pub rng_seed: Option<u64>,
    pub data_source: DataSourceKind,
    pub binance_base_url: String,
    pub sentiment_url: Option<String>,
    #[serde(rename = "macd_signal")]
    pub signal_line: SignalLineMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            interval_seconds: 60,
            database_path: "trading_bot.db".to_string(),
            history_limit: 50,
            rng_seed: None,
            data_source: DataSourceKind::Simulated,
            binance_base_url: "https://api.binance.com".to_string(),
            sentiment_url: None,
            signal_line: SignalLineMode::default(),
        }
    }
}

impl Settings {
    /// Reads settings from the process environment, after loading `.env`
    /// if one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::load(Environment::default())
    }

    /// Same as [`Settings::from_env`] but reads `vars` instead of the process
    /// environment.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::load(Environment::default().source(Some(vars.into_iter().collect())))
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    fn load(environment: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(
                environment
                    .ignore_empty(true)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("symbols"),
            )
            .build()?
            .try_deserialize()?;

        settings.validated()
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.symbols = self
            .symbols
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if self.symbols.is_empty() {
            return Err(ConfigError::NoSymbols);
        }
        if self.interval_seconds == 0 {
            return Err(ConfigError::NotPositive { key: "INTERVAL_SECONDS" });
        }
        if self.history_limit == 0 {
            return Err(ConfigError::NotPositive { key: "HISTORY_LIMIT" });
        }
        self.binance_base_url = self.binance_base_url.trim_end_matches('/').to_string();
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let settings = Settings::from_vars(HashMap::new()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.interval(), Duration::from_secs(60));
        assert_eq!(settings.symbols.len(), 5);
    }

    #[test]
    fn parses_every_key() {
        let settings = Settings::from_vars(vars(&[
            ("SYMBOLS", "BTCUSDT, ETHUSDT"),
            ("INTERVAL_SECONDS", "5"),
            ("DATABASE_PATH", "/tmp/x.db"),
            ("HISTORY_LIMIT", "100"),
            ("RNG_SEED", "42"),
            ("DATA_SOURCE", "binance"),
            ("BINANCE_BASE_URL", "https://example.test/"),
            ("SENTIMENT_URL", "http://localhost:9000/sentiment"),
            ("MACD_SIGNAL", "ema"),
        ]))
        .unwrap();

        assert_eq!(settings.symbols, vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(settings.interval(), Duration::from_secs(5));
        assert_eq!(settings.database_path, "/tmp/x.db");
        assert_eq!(settings.history_limit, 100);
        assert_eq!(settings.rng_seed, Some(42));
        assert_eq!(settings.data_source, DataSourceKind::Binance);
        assert_eq!(settings.binance_base_url, "https://example.test");
        assert_eq!(
            settings.sentiment_url.as_deref(),
            Some("http://localhost:9000/sentiment")
        );
        assert_eq!(settings.signal_line, SignalLineMode::Exponential);
    }

    #[test]
    fn empty_values_fall_back_to_defaults() {
        let settings = Settings::from_vars(vars(&[("SENTIMENT_URL", ""), ("DATABASE_PATH", "")])).unwrap();
        assert_eq!(settings.sentiment_url, None);
        assert_eq!(settings.database_path, "trading_bot.db");
    }

    #[test]
    fn unrelated_variables_are_ignored() {
        let settings = Settings::from_vars(vars(&[("PATH", "/usr/bin"), ("HOME", "/root")])).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn rejects_zero_interval_and_bad_numbers() {
        let err = Settings::from_vars(vars(&[("INTERVAL_SECONDS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::NotPositive { key: "INTERVAL_SECONDS" }));

        let err = Settings::from_vars(vars(&[("HISTORY_LIMIT", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::NotPositive { key: "HISTORY_LIMIT" }));

        let err = Settings::from_vars(vars(&[("HISTORY_LIMIT", "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn rejects_unknown_modes() {
        let err = Settings::from_vars(vars(&[("DATA_SOURCE", "carrier-pigeon")])).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));

        let err = Settings::from_vars(vars(&[("MACD_SIGNAL", "wilder")])).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn rejects_symbol_list_without_names() {
        let err = Settings::from_vars(vars(&[("SYMBOLS", " , ,")])).unwrap_err();
        assert!(matches!(err, ConfigError::NoSymbols));
    }
}
