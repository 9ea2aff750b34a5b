use common::models::{Action, Observation, Prediction, Signal};

use crate::sentiment::Sentiment;

/// Stop-loss / take-profit multipliers applied to the entry price.
#[derive(Debug, Clone, Copy)]
pub struct RiskParameters {
    pub buy_stop: f64,
    pub sell_stop: f64,
    pub hold_stop: f64,
    pub hold_take: f64,
}

impl Default for RiskParameters {
    fn default() -> Self {
        Self {
            buy_stop: 0.985,
            sell_stop: 1.015,
            hold_stop: 0.99,
            hold_take: 1.01,
        }
    }
}

/// Maps a prediction onto an actionable signal. Pure: the only inputs are the
/// prediction, the observation that triggered it and an optional sentiment.
#[derive(Debug, Clone, Default)]
pub struct SignalComposer {
    risk: RiskParameters,
}

impl SignalComposer {
    pub fn new(risk: RiskParameters) -> Self {
        Self { risk }
    }

    pub fn compose(
        &self,
        prediction: &Prediction,
        observation: &Observation,
        sentiment: Option<&Sentiment>,
    ) -> Signal {
        let action = Action::from(prediction.direction);
        let entry = observation.price;

        let (stop_loss, take_profit) = match action {
            Action::Buy => (entry * self.risk.buy_stop, prediction.target_price),
            Action::Sell => (entry * self.risk.sell_stop, prediction.target_price),
            Action::Hold => (entry * self.risk.hold_stop, entry * self.risk.hold_take),
        };

        let mut reasoning = format!(
            "PREDICTION: {} for {}min. Current: {:.6}, Target: {:.6}. {}",
            prediction.direction, prediction.duration, entry, prediction.target_price, prediction.reasoning
        );
        if let Some(sentiment) = sentiment {
            reasoning.push_str(". ");
            reasoning.push_str(&sentiment.annotation(action));
        }

        Signal {
            symbol: prediction.symbol.clone(),
            action,
            direction: prediction.direction,
            confidence: prediction.confidence,
            entry_price: entry,
            stop_loss,
            take_profit,
            target_price: prediction.target_price,
            duration: prediction.duration,
            created_at: prediction.created_at,
            reasoning,
        }
    }
}
