//! Technical indicators over a time-ascending slice of closing prices.
//!
//! Every function returns `None` when the slice is too short for the
//! requested period (or the period is zero) instead of panicking.

use common::config::SignalLineMode;
use ta::Next;
use ta::indicators::{ExponentialMovingAverage, SimpleMovingAverage, StandardDeviation};

/// Factor applied to the MACD line to approximate its signal line.
pub const APPROX_SIGNAL_FACTOR: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Arithmetic mean of the last `period` prices.
pub fn sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let mut sma = SimpleMovingAverage::new(period).ok()?;
    prices[prices.len() - period..]
        .iter()
        .fold(None, |_, &price| Some(sma.next(price)))
}

/// EMA seeded with the first price, `k = 2 / (period + 1)`.
pub fn ema(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let mut ema = ExponentialMovingAverage::new(period).ok()?;
    prices.iter().fold(None, |_, &price| Some(ema.next(price)))
}

/// RSI from simple averages of the last `period` gains and losses.
///
/// Zero average loss gives 100, unless there was no movement at all, which
/// gives a neutral 50.
pub fn rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period + 1 {
        return None;
    }

    let window = &prices[prices.len() - period - 1..];
    let (gains, losses) = window.windows(2).fold((0.0, 0.0), |(g, l), pair| {
        let delta = pair[1] - pair[0];
        if delta > 0.0 { (g + delta, l) } else { (g, l - delta) }
    });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// MACD line `EMA(fast) - EMA(slow)` with the signal line chosen by `mode`.
pub fn macd(
    prices: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
    mode: SignalLineMode,
) -> Option<Macd> {
    if fast == 0 || slow == 0 || signal_period == 0 || prices.len() < slow.max(fast) {
        return None;
    }

    let (macd_line, signal) = match mode {
        SignalLineMode::Approximate => {
            let line = ema(prices, fast)? - ema(prices, slow)?;
            (line, line * APPROX_SIGNAL_FACTOR)
        }
        SignalLineMode::Exponential => {
            let mut fast_ema = ExponentialMovingAverage::new(fast).ok()?;
            let mut slow_ema = ExponentialMovingAverage::new(slow).ok()?;
            let mut signal_ema = ExponentialMovingAverage::new(signal_period).ok()?;

            let mut line = 0.0;
            let mut signal = 0.0;
            for (i, &price) in prices.iter().enumerate() {
                line = fast_ema.next(price) - slow_ema.next(price);
                if i + 1 >= slow {
                    signal = signal_ema.next(line);
                }
            }
            (line, signal)
        }
    };

    Some(Macd {
        macd: macd_line,
        signal,
        histogram: macd_line - signal,
    })
}

/// Population standard deviation of the last `period` prices.
pub fn volatility(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let mut std_dev = StandardDeviation::new(period).ok()?;
    prices[prices.len() - period..]
        .iter()
        .fold(None, |_, &price| Some(std_dev.next(price)))
}

/// (low, high) of the last `period` prices.
pub fn recent_range(prices: &[f64], period: usize) -> Option<(f64, f64)> {
    if period == 0 || prices.len() < period {
        return None;
    }
    let window = &prices[prices.len() - period..];
    let low = window.iter().copied().fold(f64::INFINITY, f64::min);
    let high = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((low, high))
}
