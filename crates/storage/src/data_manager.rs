use common::models::{Observation, Signal};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::db;
use crate::error::StoreError;
use crate::repositories::{ObservationsRepository, SignalsRepository};

/// Append-only store for observations and signals.
///
/// Cloning is cheap and every clone shares the same pool, so independent
/// schedulers can hold their own handle. Every append has been committed by
/// the time it returns.
#[derive(Clone)]
pub struct DataManager {
    pool: SqlitePool,
}

impl DataManager {
    pub async fn open(db_path: &str) -> Result<Arc<Self>, StoreError> {
        let pool = db::open_pool(db_path).await?;
        Ok(Arc::new(Self { pool }))
    }

    pub async fn in_memory() -> Result<Arc<Self>, StoreError> {
        let pool = db::open_in_memory().await?;
        Ok(Arc::new(Self { pool }))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn append_observation(&self, observation: &Observation) -> Result<(), StoreError> {
        ObservationsRepository::insert(&self.pool, observation).await?;
        Ok(())
    }

    pub async fn append_signal(&self, signal: &Signal) -> Result<(), StoreError> {
        SignalsRepository::insert(&self.pool, signal).await?;
        Ok(())
    }

    /// At most `limit` most recent prices for `symbol`, chronologically
    /// ordered. Empty when the symbol has never been observed.
    pub async fn recent_prices(&self, symbol: &str, limit: usize) -> Result<Vec<f64>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        Ok(ObservationsRepository::recent_prices(&self.pool, symbol, limit).await?)
    }

    /// Stored signals for `symbol`, newest first.
    pub async fn recent_signals(&self, symbol: &str, limit: usize) -> Result<Vec<Signal>, StoreError> {
        SignalsRepository::recent(&self.pool, symbol, limit).await
    }

    pub async fn signal_count(&self, symbol: &str) -> Result<i64, StoreError> {
        Ok(SignalsRepository::count(&self.pool, symbol).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use common::models::{Action, Direction};

    fn observation(symbol: &str, price: f64, second: i64) -> Observation {
        Observation {
            symbol: symbol.to_string(),
            price,
            volume: 1_000_000.0,
            change_24h: 0.0,
            high_24h: 1.05,
            low_24h: 0.95,
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(second),
        }
    }

    fn signal(symbol: &str, entry: f64, second: i64) -> Signal {
        Signal {
            symbol: symbol.to_string(),
            action: Action::Buy,
            direction: Direction::Up,
            confidence: 0.85,
            entry_price: entry,
            stop_loss: entry * 0.985,
            take_profit: entry * 1.01,
            target_price: entry * 1.01,
            duration: 4,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(second),
            reasoning: "Bullish MA alignment".to_string(),
        }
    }

    #[tokio::test]
    async fn recent_prices_returns_last_n_in_order() {
        let store = DataManager::in_memory().await.unwrap();
        let n = 10;
        for i in 0..(n + 5) {
            store
                .append_observation(&observation("USD/CAD", 1.0 + i as f64 / 100.0, i as i64))
                .await
                .unwrap();
        }

        let prices = store.recent_prices("USD/CAD", n).await.unwrap();
        let expected: Vec<f64> = (5..(n + 5)).map(|i| 1.0 + i as f64 / 100.0).collect();
        assert_eq!(prices, expected);
    }

    #[tokio::test]
    async fn recent_prices_for_unknown_symbol_is_empty() {
        let store = DataManager::in_memory().await.unwrap();
        assert!(store.recent_prices("NOPE", 50).await.unwrap().is_empty());
        assert!(store.recent_prices("NOPE", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn symbols_have_independent_histories() {
        let store = DataManager::in_memory().await.unwrap();
        for i in 0..6 {
            store.append_observation(&observation("A", 10.0 + i as f64, i)).await.unwrap();
            store.append_observation(&observation("B", 20.0 + i as f64, i)).await.unwrap();
        }

        assert_eq!(store.recent_prices("A", 3).await.unwrap(), vec![13.0, 14.0, 15.0]);
        assert_eq!(store.recent_prices("B", 3).await.unwrap(), vec![23.0, 24.0, 25.0]);
    }

    #[tokio::test]
    async fn reading_twice_is_idempotent() {
        let store = DataManager::in_memory().await.unwrap();
        for i in 0..4 {
            store.append_observation(&observation("USD/BRL", 0.169 + i as f64 * 0.001, i)).await.unwrap();
        }
        let first = store.recent_prices("USD/BRL", 50).await.unwrap();
        let second = store.recent_prices("USD/BRL", 50).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[tokio::test]
    async fn equal_timestamps_keep_insertion_order() {
        let store = DataManager::in_memory().await.unwrap();
        for price in [1.0, 2.0, 3.0] {
            store.append_observation(&observation("X", price, 0)).await.unwrap();
        }
        assert_eq!(store.recent_prices("X", 2).await.unwrap(), vec![2.0, 3.0]);
    }

    #[tokio::test]
    async fn late_arrival_with_stale_timestamp_is_still_latest() {
        let store = DataManager::in_memory().await.unwrap();
        store.append_observation(&observation("X", 1.0, 100)).await.unwrap();
        store.append_observation(&observation("X", 1.1, 200)).await.unwrap();
        store.append_observation(&observation("X", 1.2, 50)).await.unwrap();

        assert_eq!(store.recent_prices("X", 3).await.unwrap(), vec![1.0, 1.1, 1.2]);
    }

    #[tokio::test]
    async fn signals_are_retained_and_read_back_newest_first() {
        let store = DataManager::in_memory().await.unwrap();
        let older = signal("NZD/CAD", 0.892, 0);
        let newer = signal("NZD/CAD", 0.893, 60);
        store.append_signal(&older).await.unwrap();
        store.append_signal(&newer).await.unwrap();
        store.append_signal(&signal("USD/CAD", 1.354, 30)).await.unwrap();

        assert_eq!(store.signal_count("NZD/CAD").await.unwrap(), 2);
        let recent = store.recent_signals("NZD/CAD", 10).await.unwrap();
        assert_eq!(recent, vec![newer, older]);
    }

    #[tokio::test]
    async fn file_backed_store_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("signal-store-{}", std::process::id()));
        let path = dir.join("bot.db");
        let path = path.to_string_lossy().to_string();

        {
            let store = DataManager::open(&path).await.unwrap();
            store.append_observation(&observation("USD/DZD", 0.00745, 0)).await.unwrap();
            store.pool().close().await;
        }

        let store = DataManager::open(&path).await.unwrap();
        assert_eq!(store.recent_prices("USD/DZD", 5).await.unwrap(), vec![0.00745]);
        store.pool().close().await;
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_keep_histories_apart() {
        let dir = std::env::temp_dir().join(format!("signal-store-concurrent-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("bot.db").to_string_lossy().to_string();
        let shared = DataManager::open(&path).await.unwrap();
        let independent = DataManager::open(&path).await.unwrap();
        let n = 40;

        let writer = |store: Arc<DataManager>, symbol: &'static str, base: f64| {
            tokio::spawn(async move {
                for i in 0..n {
                    store
                        .append_observation(&observation(symbol, base + i as f64 / 1000.0, i as i64))
                        .await
                        .unwrap();
                }
            })
        };

        let (a, b, c) = tokio::join!(
            writer(Arc::clone(&shared), "USD/CAD", 1.35),
            writer(Arc::clone(&shared), "NZD/CAD", 0.82),
            writer(Arc::clone(&independent), "USD/BRL", 5.40),
        );
        a.unwrap();
        b.unwrap();
        c.unwrap();

        for (symbol, base) in [("USD/CAD", 1.35), ("NZD/CAD", 0.82), ("USD/BRL", 5.40)] {
            let expected: Vec<f64> = (0..n).map(|i| base + i as f64 / 1000.0).collect();
            assert_eq!(shared.recent_prices(symbol, n).await.unwrap(), expected, "{symbol}");
            assert_eq!(independent.recent_prices(symbol, n).await.unwrap(), expected, "{symbol}");
        }

        shared.pool().close().await;
        independent.pool().close().await;
        let _ = std::fs::remove_dir_all(dir);
    }
}
