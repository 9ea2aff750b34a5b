use common::models::Observation;
use sqlx::SqlitePool;

pub struct ObservationsRepository;

impl ObservationsRepository {
    pub async fn insert(pool: &SqlitePool, obs: &Observation) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
                INSERT INTO market_data (
                    symbol, price, volume, change_24h, high_24h, low_24h, timestamp
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&obs.symbol)
        .bind(obs.price)
        .bind(obs.volume)
        .bind(obs.change_24h)
        .bind(obs.high_24h)
        .bind(obs.low_24h)
        .bind(obs.timestamp.timestamp_millis())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Up to `limit` most recently appended prices for `symbol`, oldest
    /// first. Arrival order wins over the source's own timestamps.
    pub async fn recent_prices(
        pool: &SqlitePool,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<f64>, sqlx::Error> {
        let mut prices = sqlx::query_scalar::<_, f64>(
            r#"
                SELECT price FROM market_data
                WHERE symbol = ?
                ORDER BY id DESC
                LIMIT ?
            "#,
        )
        .bind(symbol)
        .bind(limit as i64)
        .fetch_all(pool)
        .await?;

        prices.reverse();
        Ok(prices)
    }
}
