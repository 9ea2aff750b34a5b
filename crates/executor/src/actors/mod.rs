pub mod scheduler;

use std::sync::Arc;

use market_data::MarketDataSource;
use tokio::sync::{mpsc, watch};

pub use scheduler::{CycleReport, CycleScheduler, SchedulerConfig, SymbolOutcome};

/// Lifecycle of a [`CycleScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Running becomes Stopping; any other state is left alone.
pub(crate) fn mark_stopping(state_tx: &watch::Sender<SchedulerState>) {
    state_tx.send_if_modified(|state| {
        let running = *state == SchedulerState::Running;
        if running {
            *state = SchedulerState::Stopping;
        }
        running
    });
}

/// Requests applied by the scheduler between cycles.
pub enum SchedulerCommand {
    SwapSource(Arc<dyn MarketDataSource>),
}

/// Control surface for a scheduler, usable from any task.
#[derive(Clone)]
pub struct SchedulerHandle {
    stop_tx: Arc<watch::Sender<bool>>,
    state_tx: Arc<watch::Sender<SchedulerState>>,
    command_tx: mpsc::Sender<SchedulerCommand>,
}

impl SchedulerHandle {
    pub(crate) fn new(
        stop_tx: Arc<watch::Sender<bool>>,
        state_tx: Arc<watch::Sender<SchedulerState>>,
        command_tx: mpsc::Sender<SchedulerCommand>,
    ) -> Self {
        Self { stop_tx, state_tx, command_tx }
    }

    /// Non-blocking. The scheduler finishes the symbol in flight, then exits;
    /// a running scheduler reports `Stopping` from this point on.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
        mark_stopping(&self.state_tx);
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.stop_tx.borrow()
    }

    pub fn state(&self) -> SchedulerState {
        *self.state_tx.borrow()
    }

    /// Resolves once the scheduler reaches `target`, or returns false if it
    /// is gone.
    pub async fn wait_for(&self, target: SchedulerState) -> bool {
        let mut rx = self.state_tx.subscribe();
        rx.wait_for(|state| *state == target).await.is_ok()
    }

    /// Installs a new data source before the next cycle.
    pub async fn swap_source(&self, source: Arc<dyn MarketDataSource>) -> bool {
        self.command_tx.send(SchedulerCommand::SwapSource(source)).await.is_ok()
    }
}
