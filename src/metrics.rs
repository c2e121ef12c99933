//! Process-wide counters, exposed only through log lines (no metrics endpoint).

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ServerMetrics {
    pub connections_accepted: AtomicU64,
    pub connections_active: AtomicU64,
    pub lobbies_created: AtomicU64,
    pub lobbies_closed: AtomicU64,
    pub games_started: AtomicU64,
    pub games_completed: AtomicU64,
    pub replays_saved: AtomicU64,
    pub reconnects_succeeded: AtomicU64,
    pub reconnects_failed: AtomicU64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn lobby_created(&self) {
        self.lobbies_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn lobby_closed(&self) {
        self.lobbies_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn game_started(&self) {
        self.games_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn game_completed(&self) {
        self.games_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn replay_saved(&self) {
        self.replays_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reconnect_result(&self, succeeded: bool) {
        if succeeded {
            self.reconnects_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.reconnects_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Emit a single structured log line with the current counter snapshot.
    pub fn log_snapshot(&self) {
        tracing::info!(
            connections_accepted = self.connections_accepted.load(Ordering::Relaxed),
            connections_active = self.connections_active.load(Ordering::Relaxed),
            lobbies_created = self.lobbies_created.load(Ordering::Relaxed),
            lobbies_closed = self.lobbies_closed.load(Ordering::Relaxed),
            games_started = self.games_started.load(Ordering::Relaxed),
            games_completed = self.games_completed.load(Ordering::Relaxed),
            replays_saved = self.replays_saved.load(Ordering::Relaxed),
            reconnects_succeeded = self.reconnects_succeeded.load(Ordering::Relaxed),
            reconnects_failed = self.reconnects_failed.load(Ordering::Relaxed),
            "metrics snapshot"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_increment() {
        let metrics = ServerMetrics::new();
        assert_eq!(metrics.connections_active.load(Ordering::Relaxed), 0);
        metrics.connection_opened();
        assert_eq!(metrics.connections_active.load(Ordering::Relaxed), 1);
        metrics.connection_closed();
        assert_eq!(metrics.connections_active.load(Ordering::Relaxed), 0);
    }
}
