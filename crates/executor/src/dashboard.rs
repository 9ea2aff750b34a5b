use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::models::{Direction, Signal};
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Receives every cycle's signals. The slice may be empty.
pub trait Dashboard: Send + Sync {
    fn publish(&self, signals: &[Signal]);
}

/// One human-readable line per signal.
pub fn render_signal(signal: &Signal, now: DateTime<Utc>) -> String {
    let expires = signal.expires_at();
    let remaining = (expires - now).num_seconds() as f64 / 60.0;
    let time_left = if remaining > 0.0 {
        format!("{:.1} min left", remaining)
    } else {
        "EXPIRED".to_string()
    };

    let mut line = format!(
        "{} {} -> {} ({:.1}% conf) for {}min, expires {} ({}) | entry {:.6} target {:.6} stop {:.6} tp {:.6}",
        signal.symbol,
        signal.direction,
        signal.action,
        signal.confidence * 100.0,
        signal.duration,
        expires.format("%H:%M:%S"),
        time_left,
        signal.entry_price,
        signal.target_price,
        signal.stop_loss,
        signal.take_profit,
    );
    if signal.direction != Direction::Sideways {
        line.push_str(&format!(" | potential {:+.2}%", signal.potential_return()));
    }
    line
}

/// Logs each signal through `tracing`.
pub struct LogDashboard;

impl Dashboard for LogDashboard {
    fn publish(&self, signals: &[Signal]) {
        if signals.is_empty() {
            info!("No new signals generated.");
            return;
        }
        let now = Utc::now();
        for signal in signals {
            info!("{}", render_signal(signal, now));
            debug!(symbol = %signal.symbol, "{}", signal.reasoning);
        }
    }
}

/// Forwards each cycle's batch to broadcast subscribers.
pub struct ChannelDashboard {
    tx: broadcast::Sender<Arc<Vec<Signal>>>,
}

impl ChannelDashboard {
    pub fn new(tx: broadcast::Sender<Arc<Vec<Signal>>>) -> Self {
        Self { tx }
    }
}

impl Dashboard for ChannelDashboard {
    fn publish(&self, signals: &[Signal]) {
        if self.tx.send(Arc::new(signals.to_vec())).is_err() {
            debug!("No dashboard subscribers; dropping {} signals", signals.len());
        }
    }
}
