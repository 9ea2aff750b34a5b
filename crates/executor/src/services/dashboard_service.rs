use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use common::models::{Direction, Signal};
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::dashboard::{Dashboard, LogDashboard};

/// Renders each published batch and keeps a short board of recent signals.
pub struct DashboardService {
    board: VecDeque<Signal>,
    capacity: usize,
}

impl DashboardService {
    pub fn new(capacity: usize) -> Self {
        Self {
            board: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub async fn start(mut self, mut rx: broadcast::Receiver<Arc<Vec<Signal>>>) {
        info!("Starting Dashboard Service");

        loop {
            match rx.recv().await {
                Ok(batch) => {
                    LogDashboard.publish(&batch);
                    self.record(&batch);
                    self.log_board();
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    error!("Dashboard service lagged behind. Missed {} batches.", n);
                }
                Err(_) => {
                    info!("Dashboard channel closed. Stopping service.");
                    break;
                }
            }
        }
    }

    fn record(&mut self, batch: &[Signal]) {
        for signal in batch {
            if self.board.len() == self.capacity {
                self.board.pop_front();
            }
            self.board.push_back(signal.clone());
        }
    }

    /// Directional signals on the board that have not yet expired.
    pub fn active_count(&self) -> usize {
        let now = Utc::now();
        self.board
            .iter()
            .filter(|s| s.direction != Direction::Sideways && s.is_active(now))
            .count()
    }

    fn log_board(&self) {
        let now = Utc::now();
        info!(
            "BOARD: {} recent, {} active directional",
            self.board.len(),
            self.active_count()
        );
        for signal in self.board.iter().rev().take(5) {
            let age = (now - signal.created_at).num_seconds() as f64 / 60.0;
            let status = if signal.is_active(now) { "ACTIVE" } else { "EXPIRED" };
            info!("  {}: {} | {} | {:.1}min ago", signal.symbol, signal.direction, status, age);
        }
    }
}
