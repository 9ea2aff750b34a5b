use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::models::{PriceHistory, Signal};
use market_data::MarketDataSource;
use storage::DataManager;
use strategy::sentiment::consult;
use strategy::{DirectionPredictor, NewsFeed, SentimentOracle, SignalComposer};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{SchedulerCommand, SchedulerHandle, SchedulerState, mark_stopping};
use crate::dashboard::Dashboard;
use crate::error::PipelineError;

/// Longest the scheduler sleeps without looking at the stop flag.
const STOP_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Most recent prices handed to the predictor.
    pub history_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { history_limit: 50 }
    }
}

#[derive(Debug)]
pub enum SymbolOutcome {
    Emitted(Signal),
    Skipped { symbol: String, reason: PipelineError },
}

/// What one pass over the symbol list produced.
#[derive(Debug)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub outcomes: Vec<SymbolOutcome>,
    /// Set when a stop request cut the pass short.
    pub interrupted: bool,
}

impl CycleReport {
    pub fn signals(&self) -> Vec<Signal> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                SymbolOutcome::Emitted(signal) => Some(signal.clone()),
                SymbolOutcome::Skipped { .. } => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, SymbolOutcome::Skipped { .. }))
            .count()
    }
}

/// Drives fetch, persist, predict, compose and publish for every symbol on a
/// fixed interval.
pub struct CycleScheduler {
    id: Uuid,
    config: SchedulerConfig,
    source: Arc<dyn MarketDataSource>,
    store: Arc<DataManager>,
    predictor: DirectionPredictor,
    composer: SignalComposer,
    oracle: Option<(Arc<dyn SentimentOracle>, Arc<dyn NewsFeed>)>,
    dashboard: Box<dyn Dashboard>,
    last_emitted: HashMap<String, DateTime<Utc>>,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
    state_tx: Arc<watch::Sender<SchedulerState>>,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl CycleScheduler {
    pub fn new(
        config: SchedulerConfig,
        source: Arc<dyn MarketDataSource>,
        store: Arc<DataManager>,
        predictor: DirectionPredictor,
        dashboard: Box<dyn Dashboard>,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, _) = watch::channel(SchedulerState::Idle);
        let (command_tx, command_rx) = mpsc::channel(16);

        Self {
            id: Uuid::new_v4(),
            config,
            source,
            store,
            predictor,
            composer: SignalComposer::default(),
            oracle: None,
            dashboard,
            last_emitted: HashMap::new(),
            stop_tx: Arc::new(stop_tx),
            stop_rx,
            state_tx: Arc::new(state_tx),
            command_tx,
            command_rx,
        }
    }

    /// Annotates every signal with a sentiment reading for its symbol.
    pub fn with_oracle(mut self, oracle: Arc<dyn SentimentOracle>, news: Arc<dyn NewsFeed>) -> Self {
        self.oracle = Some((oracle, news));
        self
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle::new(
            Arc::clone(&self.stop_tx),
            Arc::clone(&self.state_tx),
            self.command_tx.clone(),
        )
    }

    pub fn set_source(&mut self, source: Arc<dyn MarketDataSource>) {
        info!(scheduler = %self.id, from = self.source.name(), to = source.name(), "Swapping market data source");
        self.source = source;
    }

    /// Spawns the cycle loop. Returns immediately.
    pub fn start(self, symbols: Vec<String>, interval: Duration) -> (SchedulerHandle, JoinHandle<()>) {
        let handle = self.handle();
        self.state_tx.send_replace(SchedulerState::Running);
        let task = tokio::spawn(self.run(symbols, interval));
        (handle, task)
    }

    async fn run(mut self, symbols: Vec<String>, interval: Duration) {
        info!(
            scheduler = %self.id,
            source = self.source.name(),
            "Scheduler running for {} symbols every {:?}",
            symbols.len(),
            interval
        );

        let mut cycles: u64 = 0;
        loop {
            self.apply_commands();
            if self.stop_requested() {
                break;
            }

            cycles += 1;
            let report = self.run_cycle(&symbols).await;
            info!(
                scheduler = %self.id,
                cycle = cycles,
                "Cycle complete: {} signals, {} skipped",
                report.outcomes.len() - report.skipped(),
                report.skipped()
            );

            if report.interrupted || self.pause(interval).await {
                break;
            }
        }

        mark_stopping(&self.state_tx);
        info!(scheduler = %self.id, "Stop requested, shutting down after {} cycles", cycles);
        self.state_tx.send_replace(SchedulerState::Stopped);
    }

    /// One pass over `symbols`. A failing symbol is logged and skipped; the
    /// rest of the pass continues.
    pub async fn run_cycle(&mut self, symbols: &[String]) -> CycleReport {
        let mut report = CycleReport {
            started_at: Utc::now(),
            outcomes: Vec::with_capacity(symbols.len()),
            interrupted: false,
        };

        for symbol in symbols {
            if self.stop_requested() {
                debug!(scheduler = %self.id, "Stop requested mid-cycle; not fetching {}", symbol);
                report.interrupted = true;
                break;
            }

            match self.process_symbol(symbol).await {
                Ok(signal) => {
                    debug!(
                        symbol = %symbol,
                        action = %signal.action,
                        confidence = signal.confidence,
                        "Signal emitted"
                    );
                    report.outcomes.push(SymbolOutcome::Emitted(signal));
                }
                Err(reason) => {
                    warn!(symbol = %symbol, "Skipping symbol this cycle: {}", reason);
                    report.outcomes.push(SymbolOutcome::Skipped {
                        symbol: symbol.clone(),
                        reason,
                    });
                }
            }
        }

        self.dashboard.publish(&report.signals());
        report
    }

    async fn process_symbol(&mut self, symbol: &str) -> Result<Signal, PipelineError> {
        let observation = self.source.get_latest(symbol).await?;
        self.store.append_observation(&observation).await?;

        let prices = self.store.recent_prices(symbol, self.config.history_limit).await?;
        let history = PriceHistory::new(symbol, prices);
        if history.len() < self.predictor.config().min_history {
            debug!(symbol = %symbol, points = history.len(), "Short history, using default prediction");
        }

        let now = self.next_timestamp(symbol);
        let prediction = self.predictor.predict(&history, now);

        let sentiment = match &self.oracle {
            Some((oracle, news)) => Some(consult(oracle.as_ref(), news.as_ref(), symbol).await),
            None => None,
        };

        let signal = self.composer.compose(&prediction, &observation, sentiment.as_ref());
        self.store.append_signal(&signal).await?;
        self.last_emitted.insert(symbol.to_string(), signal.created_at);
        Ok(signal)
    }

    /// Wall-clock now, but never earlier than this symbol's previous signal.
    fn next_timestamp(&self, symbol: &str) -> DateTime<Utc> {
        let now = Utc::now();
        match self.last_emitted.get(symbol) {
            Some(last) if *last > now => *last,
            _ => now,
        }
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            match command {
                SchedulerCommand::SwapSource(source) => self.set_source(source),
            }
        }
    }

    fn stop_requested(&self) -> bool {
        let requested = *self.stop_rx.borrow();
        if requested {
            mark_stopping(&self.state_tx);
        }
        requested
    }

    /// Sleeps for `interval`, waking early on a stop request. Returns true
    /// when stopping.
    async fn pause(&mut self, interval: Duration) -> bool {
        let deadline = Instant::now() + interval;
        loop {
            if self.stop_requested() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let step = (deadline - now).min(STOP_POLL);
            tokio::select! {
                _ = time::sleep(step) => {}
                _ = self.stop_rx.changed() => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::ChannelDashboard;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use common::models::{Action, Direction, Observation};
    use market_data::{SimulatedSource, SourceError};
    use mockall::mock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use strategy::{PredictorConfig, Sentiment};
    use strategy::sentiment::{NewsItem, OracleError, TemplateNewsFeed};
    use tokio::sync::{Notify, broadcast};

    mock! {
        pub Source {}

        #[async_trait]
        impl MarketDataSource for Source {
            fn name(&self) -> &'static str;
            async fn get_latest(&self, symbol: &str) -> Result<Observation, SourceError>;
        }
    }

    struct FixedOracle(f64);

    #[async_trait]
    impl SentimentOracle for FixedOracle {
        async fn analyze(&self, _symbol: &str, _news: &[NewsItem]) -> Result<Sentiment, OracleError> {
            Ok(Sentiment {
                score: self.0,
                confidence: 0.8,
                factors: vec!["test".to_string()],
            })
        }
    }

    fn observation(symbol: &str, price: f64, tick: usize) -> Observation {
        Observation {
            symbol: symbol.to_string(),
            price,
            volume: 1_000.0,
            change_24h: 0.0,
            high_24h: price,
            low_24h: price,
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::seconds(tick as i64),
        }
    }

    fn named_mock() -> MockSource {
        let mut source = MockSource::new();
        source.expect_name().return_const("mock");
        source
    }

    /// "X" always fails, everything else rises by 0.01 per call.
    fn flaky_source() -> MockSource {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut source = named_mock();
        source.expect_get_latest().returning(move |symbol: &str| {
            if symbol == "X" {
                return Err(SourceError::Unavailable("feed down".to_string()));
            }
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(observation(symbol, 1.0 + n as f64 * 0.01, n))
        });
        source
    }

    async fn scheduler_with(
        source: Arc<dyn MarketDataSource>,
    ) -> (CycleScheduler, Arc<DataManager>, broadcast::Receiver<Arc<Vec<Signal>>>) {
        let store = DataManager::in_memory().await.unwrap();
        let (tx, rx) = broadcast::channel(64);
        let scheduler = CycleScheduler::new(
            SchedulerConfig::default(),
            source,
            Arc::clone(&store),
            DirectionPredictor::seeded(PredictorConfig::default(), Some(7)),
            Box::new(ChannelDashboard::new(tx)),
        );
        (scheduler, store, rx)
    }

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn failing_symbol_is_skipped_and_cycle_completes() {
        let (mut scheduler, store, mut rx) = scheduler_with(Arc::new(flaky_source())).await;

        let report = scheduler.run_cycle(&symbols(&["X", "Y"])).await;

        assert_eq!(report.outcomes.len(), 2);
        assert!(!report.interrupted);
        match &report.outcomes[0] {
            SymbolOutcome::Skipped { symbol, reason } => {
                assert_eq!(symbol, "X");
                assert!(matches!(reason, PipelineError::DataSource(_)));
            }
            other => panic!("expected X to be skipped, got {:?}", other),
        }
        assert!(matches!(&report.outcomes[1], SymbolOutcome::Emitted(s) if s.symbol == "Y"));

        assert_eq!(store.signal_count("X").await.unwrap(), 0);
        assert_eq!(store.signal_count("Y").await.unwrap(), 1);
        assert_eq!(store.recent_prices("X", 10).await.unwrap(), Vec::<f64>::new());

        let published = rx.recv().await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].symbol, "Y");
    }

    #[tokio::test]
    async fn short_history_emits_hold() {
        let (mut scheduler, _store, _rx) = scheduler_with(Arc::new(flaky_source())).await;

        let report = scheduler.run_cycle(&symbols(&["Y"])).await;
        let signals = report.signals();

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].direction, Direction::Sideways);
        assert_eq!(signals[0].action, Action::Hold);
        assert_eq!(signals[0].duration, 5);
    }

    #[tokio::test]
    async fn rising_feed_turns_into_buy_once_history_is_long_enough() {
        let (mut scheduler, store, _rx) = scheduler_with(Arc::new(flaky_source())).await;
        let list = symbols(&["Y"]);

        let mut last = None;
        for _ in 0..11 {
            last = scheduler.run_cycle(&list).await.signals().pop();
        }

        let signal = last.unwrap();
        assert_eq!(signal.action, Action::Buy);
        assert_eq!(signal.direction, Direction::Up);
        assert!(signal.confidence >= 0.8);
        assert!((signal.entry_price - 1.10).abs() < 1e-9);
        assert!(signal.stop_loss < signal.entry_price);
        assert_eq!(store.signal_count("Y").await.unwrap(), 11);
    }

    #[tokio::test]
    async fn entry_and_target_come_from_the_same_price_when_source_clock_runs_backwards() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut source = named_mock();
        source.expect_get_latest().returning(move |symbol: &str| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(observation(symbol, 1.0 + n as f64 * 0.01, 1_000 - n))
        });
        let (mut scheduler, _store, _rx) = scheduler_with(Arc::new(source)).await;
        let list = symbols(&["Y"]);

        let mut last = None;
        for _ in 0..11 {
            last = scheduler.run_cycle(&list).await.signals().pop();
        }

        let signal = last.unwrap();
        assert_eq!(signal.action, Action::Buy);
        assert!((signal.entry_price - 1.10).abs() < 1e-9);
        assert!(signal.take_profit > signal.entry_price);
        assert!(signal.stop_loss < signal.entry_price);
    }

    #[tokio::test]
    async fn signal_timestamps_never_go_backwards() {
        let (mut scheduler, store, _rx) = scheduler_with(Arc::new(flaky_source())).await;
        let list = symbols(&["Y"]);

        for _ in 0..3 {
            scheduler.run_cycle(&list).await;
        }

        let recent = store.recent_signals("Y", 3).await.unwrap();
        assert_eq!(recent.len(), 3);
        assert!(recent[0].created_at >= recent[1].created_at);
        assert!(recent[1].created_at >= recent[2].created_at);
    }

    #[tokio::test]
    async fn persistence_failure_skips_symbol() {
        let (mut scheduler, store, _rx) = scheduler_with(Arc::new(flaky_source())).await;
        store.pool().close().await;

        let report = scheduler.run_cycle(&symbols(&["Y"])).await;

        assert!(matches!(
            &report.outcomes[0],
            SymbolOutcome::Skipped { reason: PipelineError::Persistence(_), .. }
        ));
        assert!(report.signals().is_empty());
    }

    #[tokio::test]
    async fn empty_cycle_still_reaches_the_dashboard() {
        let (mut scheduler, _store, mut rx) = scheduler_with(Arc::new(flaky_source())).await;

        scheduler.run_cycle(&symbols(&["X"])).await;

        assert!(rx.recv().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn oracle_annotates_signals() {
        let (scheduler, _store, _rx) = scheduler_with(Arc::new(flaky_source())).await;
        let mut scheduler = scheduler.with_oracle(Arc::new(FixedOracle(0.5)), Arc::new(TemplateNewsFeed));

        let signal = scheduler.run_cycle(&symbols(&["Y"])).await.signals().remove(0);

        assert!(signal.reasoning.contains("Sentiment"), "{}", signal.reasoning);
    }

    #[tokio::test]
    async fn no_fetch_after_stop_request() {
        let mut source = named_mock();
        source.expect_get_latest().never();
        let (mut scheduler, _store, _rx) = scheduler_with(Arc::new(source)).await;

        scheduler.handle().stop();
        let report = scheduler.run_cycle(&symbols(&["A", "B"])).await;

        assert!(report.interrupted);
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn swapped_source_serves_the_next_cycle() {
        let mut old = named_mock();
        old.expect_get_latest().never();
        let mut new = named_mock();
        new.expect_get_latest()
            .times(1)
            .returning(|symbol: &str| Ok(observation(symbol, 2.0, 0)));

        let (mut scheduler, _store, _rx) = scheduler_with(Arc::new(old)).await;
        assert!(scheduler.handle().swap_source(Arc::new(new)).await);
        scheduler.apply_commands();

        let signals = scheduler.run_cycle(&symbols(&["A"])).await.signals();
        assert_eq!(signals[0].entry_price, 2.0);
    }

    #[tokio::test]
    async fn stop_during_sleep_is_prompt() {
        let source = SimulatedSource::new(&symbols(&["USD/CAD"]), Some(1));
        let (scheduler, store, mut rx) = scheduler_with(Arc::new(source)).await;
        let handle = scheduler.handle();
        assert_eq!(handle.state(), SchedulerState::Idle);

        let (handle, task) = scheduler.start(symbols(&["USD/CAD"]), Duration::from_secs(60));
        assert_eq!(handle.state(), SchedulerState::Running);

        // first cycle done, now sleeping
        assert_eq!(rx.recv().await.unwrap().len(), 1);
        handle.stop();

        time::timeout(Duration::from_millis(1500), task)
            .await
            .expect("scheduler did not stop in time")
            .unwrap();
        assert_eq!(handle.state(), SchedulerState::Stopped);
        assert_eq!(store.signal_count("USD/CAD").await.unwrap(), 1);
    }

    /// Announces each fetch, then takes `delay` to answer.
    struct SlowSource {
        entered: Arc<Notify>,
        delay: Duration,
    }

    #[async_trait]
    impl MarketDataSource for SlowSource {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn get_latest(&self, symbol: &str) -> Result<Observation, SourceError> {
            self.entered.notify_one();
            time::sleep(self.delay).await;
            Ok(observation(symbol, 1.0, 0))
        }
    }

    #[tokio::test]
    async fn stop_during_fetch_reports_stopping_until_the_fetch_lands() {
        let entered = Arc::new(Notify::new());
        let source = SlowSource {
            entered: Arc::clone(&entered),
            delay: Duration::from_millis(300),
        };
        let (scheduler, store, _rx) = scheduler_with(Arc::new(source)).await;

        let (handle, task) = scheduler.start(symbols(&["A", "B"]), Duration::from_secs(60));
        entered.notified().await;
        handle.stop();
        assert_eq!(handle.state(), SchedulerState::Stopping);

        time::timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert_eq!(handle.state(), SchedulerState::Stopped);
        // the in-flight symbol completes, the next one is never fetched
        assert_eq!(store.signal_count("A").await.unwrap(), 1);
        assert_eq!(store.signal_count("B").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn stop_before_first_cycle_runs_nothing() {
        let mut source = named_mock();
        source.expect_get_latest().never();
        let (scheduler, _store, _rx) = scheduler_with(Arc::new(source)).await;

        scheduler.handle().stop();
        let (handle, task) = scheduler.start(symbols(&["A"]), Duration::from_secs(1));
        task.await.unwrap();

        assert!(handle.wait_for(SchedulerState::Stopped).await);
        assert!(handle.is_stop_requested());
    }
}
