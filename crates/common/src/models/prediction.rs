use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Direction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub symbol: String,
    pub current_price: f64,
    pub direction: Direction,
    pub target_price: f64,
    /// Expected duration of the move, in minutes. Always >= 1.
    pub duration: u32,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub reasoning: String,
}

/// The directional part of a prediction, before it is tied to a symbol and
/// a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outlook {
    pub direction: Direction,
    pub target_price: f64,
    /// Minutes.
    pub duration: u32,
    pub confidence: f64,
}

impl Prediction {
    /// Duration is raised to at least 1 and confidence clamped to [0, 1].
    pub fn new(
        symbol: impl Into<String>,
        current_price: f64,
        outlook: Outlook,
        created_at: DateTime<Utc>,
        reasoning: String,
    ) -> Self {
        let duration = outlook.duration.max(1);
        Self {
            symbol: symbol.into(),
            current_price,
            direction: outlook.direction,
            target_price: outlook.target_price,
            duration,
            confidence: outlook.confidence.clamp(0.0, 1.0),
            created_at,
            expires_at: created_at + Duration::minutes(i64::from(duration)),
            reasoning,
        }
    }
}
