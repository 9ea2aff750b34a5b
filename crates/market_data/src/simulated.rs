use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use common::models::Observation;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tokio::sync::Mutex;

use crate::error::SourceError;
use crate::traits::MarketDataSource;

const STARTING_PRICES: &[(&str, f64)] = &[
    ("USD/BRL", 0.16900),
    ("USD/CAD", 1.35420),
    ("NZD/CAD", 0.89200),
    ("USD/BDT", 0.00850),
    ("USD/DZD", 0.00745),
];

const BASE_VOLUME: f64 = 1_000_000.0;

struct Ticker {
    open: f64,
    price: f64,
    volume: f64,
    high: f64,
    low: f64,
}

impl Ticker {
    fn starting_at(price: f64) -> Self {
        Self {
            open: price,
            price,
            volume: BASE_VOLUME,
            high: price * 1.05,
            low: price * 0.95,
        }
    }
}

struct Inner {
    tickers: HashMap<String, Ticker>,
    rng: StdRng,
}

/// Random-walk tick generator. Each call moves the symbol's price by a
/// normally distributed relative step.
pub struct SimulatedSource {
    inner: Mutex<Inner>,
    volatility: f64,
    auto_register: bool,
}

impl SimulatedSource {
    /// `seed = None` seeds from system entropy.
    pub fn new(symbols: &[String], seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let tickers = symbols
            .iter()
            .map(|s| {
                let start = STARTING_PRICES
                    .iter()
                    .find(|(name, _)| name == s)
                    .map(|(_, p)| *p)
                    .unwrap_or(1.0);
                (s.clone(), Ticker::starting_at(start))
            })
            .collect();

        Self {
            inner: Mutex::new(Inner { tickers, rng }),
            volatility: 0.001,
            auto_register: true,
        }
    }

    /// Relative standard deviation of one tick (default 0.001).
    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility.abs();
        self
    }

    /// Reject symbols that were not passed to `new` instead of starting
    /// them at 1.0.
    pub fn strict(mut self) -> Self {
        self.auto_register = false;
        self
    }
}

#[async_trait]
impl MarketDataSource for SimulatedSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn get_latest(&self, symbol: &str) -> Result<Observation, SourceError> {
        let mut guard = self.inner.lock().await;
        let Inner { tickers, rng } = &mut *guard;

        if !tickers.contains_key(symbol) {
            if !self.auto_register {
                return Err(SourceError::UnknownSymbol(symbol.to_string()));
            }
            tickers.insert(symbol.to_string(), Ticker::starting_at(1.0));
        }
        let ticker = tickers
            .get_mut(symbol)
            .ok_or_else(|| SourceError::UnknownSymbol(symbol.to_string()))?;

        let z: f64 = rng.sample(StandardNormal);
        let change = z * self.volatility;
        ticker.price *= 1.0 + change;
        ticker.volume = (ticker.volume + rng.gen_range(-10_000.0..10_000.0)).max(0.0);
        ticker.high = ticker.high.max(ticker.price);
        ticker.low = ticker.low.min(ticker.price);

        Ok(Observation {
            symbol: symbol.to_string(),
            price: ticker.price,
            volume: ticker.volume,
            change_24h: (ticker.price - ticker.open) / ticker.open * 100.0,
            high_24h: ticker.high,
            low_24h: ticker.low,
            timestamp: Utc::now(),
        })
    }
}
