use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Action, Direction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub action: Action,
    pub direction: Direction,
    pub confidence: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub target_price: f64,
    /// Minutes, copied from the prediction.
    pub duration: u32,
    pub created_at: DateTime<Utc>,
    pub reasoning: String,
}

impl Signal {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::minutes(i64::from(self.duration))
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }

    /// Percent move from entry to target in the predicted direction.
    pub fn potential_return(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        match self.direction {
            Direction::Up => (self.target_price - self.entry_price) / self.entry_price * 100.0,
            Direction::Down => (self.entry_price - self.target_price) / self.entry_price * 100.0,
            Direction::Sideways => 0.0,
        }
    }
}
