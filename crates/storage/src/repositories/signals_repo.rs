use chrono::DateTime;
use common::models::Signal;
use sqlx::{FromRow, SqlitePool};

use crate::error::StoreError;

#[derive(FromRow)]
struct SignalRow {
    symbol: String,
    action: String,
    direction: String,
    confidence: f64,
    entry_price: f64,
    stop_loss: f64,
    take_profit: f64,
    timestamp: i64,
    reasoning: String,
    duration_minutes: i64,
    target_price: f64,
}

impl TryFrom<SignalRow> for Signal {
    type Error = StoreError;

    fn try_from(row: SignalRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| StoreError::CorruptRow(format!("{} for {}", what, row.symbol));

        let action = row.action.parse().map_err(|_| corrupt("action"))?;
        let direction = row.direction.parse().map_err(|_| corrupt("direction"))?;
        let created_at = DateTime::from_timestamp_millis(row.timestamp).ok_or_else(|| corrupt("timestamp"))?;
        let duration = u32::try_from(row.duration_minutes).map_err(|_| corrupt("duration"))?;

        Ok(Signal {
            symbol: row.symbol,
            action,
            direction,
            confidence: row.confidence,
            entry_price: row.entry_price,
            stop_loss: row.stop_loss,
            take_profit: row.take_profit,
            target_price: row.target_price,
            duration,
            created_at,
            reasoning: row.reasoning,
        })
    }
}

pub struct SignalsRepository;

impl SignalsRepository {
    pub async fn insert(pool: &SqlitePool, signal: &Signal) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
                INSERT INTO signals (
                    symbol, action, direction, confidence, entry_price, stop_loss,
                    take_profit, timestamp, reasoning, duration_minutes, target_price
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&signal.symbol)
        .bind(signal.action.as_str())
        .bind(signal.direction.as_str())
        .bind(signal.confidence)
        .bind(signal.entry_price)
        .bind(signal.stop_loss)
        .bind(signal.take_profit)
        .bind(signal.created_at.timestamp_millis())
        .bind(&signal.reasoning)
        .bind(i64::from(signal.duration))
        .bind(signal.target_price)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Newest first.
    pub async fn recent(
        pool: &SqlitePool,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<Signal>, StoreError> {
        let rows = sqlx::query_as::<_, SignalRow>(
            r#"
                SELECT symbol, action, direction, confidence, entry_price, stop_loss,
                       take_profit, timestamp, reasoning, duration_minutes, target_price
                FROM signals
                WHERE symbol = ?
                ORDER BY timestamp DESC, id DESC
                LIMIT ?
            "#,
        )
        .bind(symbol)
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(Signal::try_from).collect()
    }

    pub async fn count(pool: &SqlitePool, symbol: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM signals WHERE symbol = ?")
            .bind(symbol)
            .fetch_one(pool)
            .await
    }
}
