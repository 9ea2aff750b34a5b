use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use common::config::{DataSourceKind, Settings};
use common::logger;
use common::models::Signal;
use market_data::{BinanceTickerSource, MarketDataSource, SimulatedSource};
use storage::DataManager;
use strategy::{DirectionPredictor, HttpSentimentOracle, PredictorConfig, TemplateNewsFeed};

use crate::actors::{CycleScheduler, SchedulerConfig};
use crate::dashboard::ChannelDashboard;
use crate::services::dashboard_service::DashboardService;

mod actors;
mod dashboard;
mod error;
mod services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::setup_logger();
    let settings = Settings::from_env()?;
    debug!("System starting up...");

    let store = DataManager::open(&settings.database_path).await?;

    let source: Arc<dyn MarketDataSource> = match settings.data_source {
        DataSourceKind::Simulated => Arc::new(SimulatedSource::new(&settings.symbols, settings.rng_seed)),
        DataSourceKind::Binance => Arc::new(BinanceTickerSource::new(&settings.binance_base_url)?),
    };

    let (signal_tx, _) = broadcast::channel::<Arc<Vec<Signal>>>(64);
    tokio::spawn(DashboardService::new(10).start(signal_tx.subscribe()));

    // distinct stream from the simulated feed when seeded
    let predictor = DirectionPredictor::seeded(
        PredictorConfig {
            signal_line: settings.signal_line,
            ..PredictorConfig::default()
        },
        settings.rng_seed.map(|seed| seed.wrapping_add(1)),
    );

    let mut scheduler = CycleScheduler::new(
        SchedulerConfig {
            history_limit: settings.history_limit,
        },
        source,
        store,
        predictor,
        Box::new(ChannelDashboard::new(signal_tx)),
    );
    if let Some(url) = &settings.sentiment_url {
        info!("Sentiment oracle enabled at {}", url);
        scheduler = scheduler.with_oracle(Arc::new(HttpSentimentOracle::new(url)?), Arc::new(TemplateNewsFeed));
    }

    info!(
        "Monitoring {} symbols every {:?}: {}",
        settings.symbols.len(),
        settings.interval(),
        settings.symbols.join(", ")
    );
    let (handle, task) = scheduler.start(settings.symbols.clone(), settings.interval());

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received, stopping scheduler");
    handle.stop();
    task.await?;

    info!("Shutdown complete");
    Ok(())
}
