//! Statistics and metrics for refresh cycles and connections
//!
//! Counters are plain atomics updated on the hot path; readers take a
//! point-in-time copy through `snapshot()`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::registry::Offer;

/// Live counters for the broadcast engine
#[derive(Debug, Default)]
pub struct EngineMetrics {
    cycles_completed: AtomicU64,
    cycles_failed: AtomicU64,
    deliveries: AtomicU64,
    congested: AtomicU64,
    skipped: AtomicU64,
    last_generation: AtomicU64,
    last_success: Mutex<Option<Instant>>,
}

impl EngineMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful cycle
    pub fn record_success(&self, generation: u64) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.last_generation.store(generation, Ordering::Relaxed);
        *self.last_success.lock() = Some(Instant::now());
    }

    /// Record a cycle whose fetch failed
    pub fn record_failure(&self) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the outcome of one delivery attempt
    pub fn record_offer(&self, offer: Offer) {
        match offer {
            Offer::Stored => {
                self.deliveries.fetch_add(1, Ordering::Relaxed);
            }
            Offer::Replaced => {
                self.deliveries.fetch_add(1, Ordering::Relaxed);
                self.congested.fetch_add(1, Ordering::Relaxed);
            }
            Offer::Stale | Offer::Closed => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> EngineStats {
        EngineStats {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            congested: self.congested.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            last_generation: self.last_generation.load(Ordering::Relaxed),
            since_last_success: self.last_success.lock().map(|t| t.elapsed()),
        }
    }
}

/// Engine statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineStats {
    /// Refresh cycles that installed a snapshot
    pub cycles_completed: u64,
    /// Refresh cycles whose fetch failed
    pub cycles_failed: u64,
    /// Results written to subscriber slots
    pub deliveries: u64,
    /// Deliveries that overwrote an unread result
    pub congested: u64,
    /// Deliveries dropped (slot closed or result stale)
    pub skipped: u64,
    /// Generation of the last installed snapshot
    pub last_generation: u64,
    /// Time since the last successful cycle
    pub since_last_success: Option<Duration>,
}

/// Live connection counters for the server
#[derive(Debug, Default)]
pub struct ServerMetrics {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    rejected_connections: AtomicU64,
}

impl ServerMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection was accepted
    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// An accepted connection finished
    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// A connection was refused (limit reached)
    pub fn connection_rejected(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self, subscribers: usize, engine: EngineStats) -> ServerStats {
        ServerStats {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rejected_connections: self.rejected_connections.load(Ordering::Relaxed),
            subscribers,
            engine,
        }
    }
}

/// Server-wide statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerStats {
    /// Total connections ever accepted
    pub total_connections: u64,
    /// Connections currently open
    pub active_connections: u64,
    /// Connections refused because of the connection limit
    pub rejected_connections: u64,
    /// Currently registered subscribers
    pub subscribers: usize,
    /// Broadcast engine statistics
    pub engine: EngineStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_metrics_new() {
        let stats = EngineMetrics::new().snapshot();
        assert_eq!(stats, EngineStats::default());
        assert!(stats.since_last_success.is_none());
    }

    #[test]
    fn test_engine_metrics_cycles() {
        let metrics = EngineMetrics::new();
        metrics.record_failure();
        metrics.record_success(1);
        metrics.record_success(2);

        let stats = metrics.snapshot();
        assert_eq!(stats.cycles_completed, 2);
        assert_eq!(stats.cycles_failed, 1);
        assert_eq!(stats.last_generation, 2);
        assert!(stats.since_last_success.is_some());
    }

    #[test]
    fn test_engine_metrics_offers() {
        let metrics = EngineMetrics::new();
        metrics.record_offer(Offer::Stored);
        metrics.record_offer(Offer::Replaced);
        metrics.record_offer(Offer::Closed);
        metrics.record_offer(Offer::Stale);

        let stats = metrics.snapshot();
        assert_eq!(stats.deliveries, 2);
        assert_eq!(stats.congested, 1);
        assert_eq!(stats.skipped, 2);
    }

    #[test]
    fn test_server_metrics_connections() {
        let metrics = ServerMetrics::new();
        metrics.connection_opened();
        metrics.connection_opened();
        metrics.connection_closed();
        metrics.connection_rejected();

        let stats = metrics.snapshot(3, EngineStats::default());
        assert_eq!(stats.total_connections, 2);
        assert_eq!(stats.active_connections, 1);
        assert_eq!(stats.rejected_connections, 1);
        assert_eq!(stats.subscribers, 3);
    }
}
