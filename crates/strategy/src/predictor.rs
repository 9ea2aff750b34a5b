use chrono::{DateTime, Utc};
use common::config::SignalLineMode;
use common::models::{Direction, Outlook, Prediction, PriceHistory};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::indicators;

/// Scoring weights and thresholds for [`DirectionPredictor`].
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Histories shorter than this fall back to a SIDEWAYS call.
    pub min_history: usize,
    /// Duration (minutes) of the fallback call.
    pub default_duration: u32,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub signal_line: SignalLineMode,
    pub volatility_window: usize,
    /// Volatility above this draws a short duration.
    pub high_volatility: f64,
    /// Volatility below this draws a long duration.
    pub low_volatility: f64,
    pub momentum_threshold: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            min_history: 10,
            default_duration: 5,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            signal_line: SignalLineMode::Approximate,
            volatility_window: 10,
            high_volatility: 0.002,
            low_volatility: 0.0005,
            momentum_threshold: 0.001,
        }
    }
}

/// Turns a price history into a directional call.
///
/// Scoring is deterministic; only the duration inside its volatility
/// bracket is drawn from `rng`, so a seeded rng makes the whole prediction
/// reproducible.
pub struct DirectionPredictor<R = StdRng> {
    config: PredictorConfig,
    rng: R,
}

impl DirectionPredictor<StdRng> {
    /// `seed = None` seeds from system entropy.
    pub fn seeded(config: PredictorConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> DirectionPredictor<R> {
    pub fn with_rng(config: PredictorConfig, rng: R) -> Self {
        Self { config, rng }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn predict(&mut self, history: &PriceHistory, now: DateTime<Utc>) -> Prediction {
        let prices = history.prices();
        let current = history.last().unwrap_or(0.0);

        if prices.len() < self.config.min_history.max(2) {
            let outlook = Outlook {
                direction: Direction::Sideways,
                target_price: current,
                duration: self.config.default_duration,
                confidence: 0.5,
            };
            return Prediction::new(
                history.symbol(),
                current,
                outlook,
                now,
                format!(
                    "Insufficient history ({} of {} points); defaulting to SIDEWAYS",
                    prices.len(),
                    self.config.min_history
                ),
            );
        }

        let mut score = 0.0;
        let mut factors: Vec<&'static str> = Vec::new();

        // The long average uses what is available when fewer than 20 points exist.
        let long_window = prices.len().min(20);
        if let (Some(sma5), Some(sma10), Some(sma20)) = (
            indicators::sma(prices, 5),
            indicators::sma(prices, 10),
            indicators::sma(prices, long_window),
        ) {
            if sma5 > sma10 && sma10 > sma20 {
                score += 2.0;
                factors.push("Bullish MA alignment");
            } else if sma5 < sma10 && sma10 < sma20 {
                score -= 2.0;
                factors.push("Bearish MA alignment");
            }
        }

        if let Some(rsi) = indicators::rsi(prices, self.config.rsi_period) {
            if rsi < 30.0 {
                score += 1.0;
                factors.push("RSI oversold - bounce expected");
            } else if rsi > 70.0 {
                score -= 1.0;
                factors.push("RSI overbought - pullback expected");
            }
        }

        if let Some(macd) = indicators::macd(
            prices,
            self.config.macd_fast,
            self.config.macd_slow,
            self.config.macd_signal,
            self.config.signal_line,
        ) {
            if macd.macd > macd.signal {
                score += 1.0;
                factors.push("MACD bullish crossover");
            } else {
                score -= 1.0;
                factors.push("MACD bearish crossover");
            }
        }

        let prev = prices[prices.len() - 2];
        let momentum = if prev != 0.0 { (current - prev) / prev } else { 0.0 };
        if momentum > self.config.momentum_threshold {
            score += 1.0;
            factors.push("Positive momentum");
        } else if momentum < -self.config.momentum_threshold {
            score -= 1.0;
            factors.push("Negative momentum");
        }

        let (low, high) = indicators::recent_range(prices, 5.min(prices.len())).unwrap_or((current, current));
        if current > (high + low) / 2.0 {
            score += 0.5;
            factors.push("Price above recent range midpoint");
        } else {
            score -= 0.5;
            factors.push("Price at or below recent range midpoint");
        }

        let direction = if score > 1.0 {
            Direction::Up
        } else if score < -1.0 {
            Direction::Down
        } else {
            Direction::Sideways
        };

        let confidence = match direction {
            Direction::Sideways => 0.5,
            _ => (0.6 + 0.1 * f64::abs(score)).min(0.95),
        };

        let window = self.config.volatility_window.min(prices.len());
        let volatility = indicators::volatility(prices, window).unwrap_or(0.0);
        let duration = self.draw_duration(volatility);

        let target_price = match direction {
            Direction::Up => current * (1.0 + 2.0 * volatility),
            Direction::Down => current * (1.0 - 2.0 * volatility),
            Direction::Sideways => current,
        };

        let reasoning = format!(
            "Technical Analysis: {}. Score: {:+.1}, Momentum: {:.3}%, Volatility: {:.5}",
            if factors.is_empty() { "no factors".to_string() } else { factors.join(", ") },
            score,
            momentum * 100.0,
            volatility,
        );

        let outlook = Outlook {
            direction,
            target_price,
            duration,
            confidence,
        };
        Prediction::new(history.symbol(), current, outlook, now, reasoning)
    }

    /// High volatility: 1-4 min, low: 5-14 min, otherwise 3-9 min.
    fn draw_duration(&mut self, volatility: f64) -> u32 {
        if volatility > self.config.high_volatility {
            self.rng.gen_range(1..5)
        } else if volatility < self.config.low_volatility {
            self.rng.gen_range(5..15)
        } else {
            self.rng.gen_range(3..10)
        }
    }
}
