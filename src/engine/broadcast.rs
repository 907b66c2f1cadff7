//! Broadcast engine implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::time::MissedTickBehavior;

use super::config::{EngineConfig, MIN_REFRESH_INTERVAL};
use crate::error::FeedError;
use crate::feed::Feed;
use crate::registry::{Delivery, Offer, SubscriberRegistry};
use crate::snapshot::SnapshotStore;
use crate::stats::{EngineMetrics, EngineStats};

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Waiting for the next tick
    Idle,
    /// A refresh cycle is in progress
    Refreshing,
}

/// Summary of one successful refresh cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Generation of the installed snapshot
    pub generation: u64,
    /// Objects in the installed snapshot
    pub objects: usize,
    /// Subscribers visited
    pub subscribers: usize,
    /// Results written to slots
    pub delivered: usize,
    /// Results that overwrote an unread one
    pub congested: usize,
    /// Subscribers skipped (removed mid-cycle)
    pub skipped: usize,
}

/// Resets the engine to `Idle` however the cycle ends, including cancellation
struct RefreshGuard<'a>(&'a AtomicBool);

impl<'a> RefreshGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodically refreshes the snapshot and pushes counts to subscribers
pub struct BroadcastEngine<F: Feed> {
    feed: F,
    store: Arc<SnapshotStore>,
    registry: Arc<SubscriberRegistry>,
    config: EngineConfig,
    refreshing: AtomicBool,
    metrics: EngineMetrics,
}

impl<F: Feed> BroadcastEngine<F> {
    /// Create an engine with its own empty store and registry
    pub fn new(feed: F, config: EngineConfig) -> Self {
        Self::with_parts(
            feed,
            Arc::new(SnapshotStore::new()),
            Arc::new(SubscriberRegistry::new()),
            config,
        )
    }

    /// Create an engine over an existing store and registry
    pub fn with_parts(
        feed: F,
        store: Arc<SnapshotStore>,
        registry: Arc<SubscriberRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            feed,
            store,
            registry,
            config,
            refreshing: AtomicBool::new(false),
            metrics: EngineMetrics::new(),
        }
    }

    /// Snapshot store the engine installs into
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Registry the engine broadcasts to
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> EngineState {
        if self.refreshing.load(Ordering::Acquire) {
            EngineState::Refreshing
        } else {
            EngineState::Idle
        }
    }

    /// Engine statistics
    pub fn stats(&self) -> EngineStats {
        self.metrics.snapshot()
    }

    /// Run one refresh cycle
    ///
    /// On a feed error nothing is changed: the previous snapshot stays installed
    /// and no subscriber receives anything.
    pub async fn refresh(&self) -> Result<CycleReport, FeedError> {
        let _guard = RefreshGuard::enter(&self.refreshing);

        let objects = match tokio::time::timeout(self.config.fetch_timeout, self.feed.fetch_all())
            .await
        {
            Ok(Ok(objects)) => objects,
            Ok(Err(e)) => {
                self.metrics.record_failure();
                return Err(e);
            }
            Err(_) => {
                self.metrics.record_failure();
                return Err(FeedError::Timeout(self.config.fetch_timeout));
            }
        };

        let generation = self.store.replace(&objects);
        let mut report = self.broadcast();
        report.generation = generation;
        report.objects = objects.len();

        self.metrics.record_success(generation);
        Ok(report)
    }

    /// Recompute and offer every subscriber's count against the current snapshot
    ///
    /// Offers never wait: a subscriber that has not drained its previous result
    /// gets it overwritten. Does nothing if no snapshot is installed yet.
    pub fn broadcast(&self) -> CycleReport {
        let mut report = CycleReport::default();

        self.registry.for_each(|subscriber| {
            report.subscribers += 1;

            let Some(measurement) = self.store.measure(|o| subscriber.filter.matches(o)) else {
                return;
            };

            let offer = subscriber.deliver(Delivery {
                generation: measurement.generation,
                count: measurement.count,
            });
            self.metrics.record_offer(offer);

            match offer {
                Offer::Stored => report.delivered += 1,
                Offer::Replaced => {
                    report.delivered += 1;
                    report.congested += 1;
                    tracing::debug!(
                        subscriber_id = %subscriber.id,
                        generation = measurement.generation,
                        "Subscriber behind, previous result overwritten"
                    );
                }
                Offer::Stale | Offer::Closed => report.skipped += 1,
            }
        });

        report
    }

    /// Run a cycle and log its outcome
    async fn run_cycle(&self) {
        let started = Instant::now();

        match self.refresh().await {
            Ok(report) => {
                tracing::info!(
                    generation = report.generation,
                    objects = report.objects,
                    subscribers = report.subscribers,
                    delivered = report.delivered,
                    congested = report.congested,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Refresh completed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    generation = self.store.generation(),
                    "Refresh failed, keeping previous snapshot"
                );
            }
        }
    }

    /// Refresh now and then on every interval, forever
    ///
    /// Cycles never overlap: if one overruns the interval the next tick is
    /// delayed rather than bunched up.
    pub async fn run(&self) {
        // Struct literals skip the builder clamp
        let period = self.config.refresh_interval.max(MIN_REFRESH_INTERVAL);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = period.as_secs_f64(),
            "Broadcast engine started"
        );

        loop {
            // First tick completes immediately
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    /// Spawn the refresh loop as a background task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.run().await })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::sync::Notify;

    use super::*;
    use crate::geo::Coordinates;
    use crate::registry::SubscriberFilter;
    use crate::snapshot::TrackedObject;

    /// Returns scripted results in order, then repeats the last snapshot
    struct ScriptedFeed {
        script: Mutex<VecDeque<Result<Vec<TrackedObject>, FeedError>>>,
        fallback: Vec<TrackedObject>,
    }

    impl ScriptedFeed {
        fn new(script: Vec<Result<Vec<TrackedObject>, FeedError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback: Vec::new(),
            }
        }

        fn repeating(objects: Vec<TrackedObject>) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback: objects,
            }
        }
    }

    impl Feed for ScriptedFeed {
        async fn fetch_all(&self) -> Result<Vec<TrackedObject>, FeedError> {
            let next = self.script.lock().pop_front();
            next.unwrap_or_else(|| Ok(self.fallback.clone()))
        }
    }

    /// Blocks every fetch until released
    struct GatedFeed {
        gate: Notify,
    }

    impl Feed for GatedFeed {
        async fn fetch_all(&self) -> Result<Vec<TrackedObject>, FeedError> {
            self.gate.notified().await;
            Ok(vec![TrackedObject::at("a", 0.0, 0.0)])
        }
    }

    /// Never answers
    struct StalledFeed;

    impl Feed for StalledFeed {
        async fn fetch_all(&self) -> Result<Vec<TrackedObject>, FeedError> {
            std::future::pending().await
        }
    }

    fn circle(longitude: f64, latitude: f64, radius: f64) -> SubscriberFilter {
        SubscriberFilter::new(Coordinates::new(longitude, latitude), radius).unwrap()
    }

    fn equator_and_pole() -> Vec<TrackedObject> {
        vec![
            TrackedObject::at("origin", 0.0, 0.0),
            TrackedObject::at("north", 0.0, 90.0),
        ]
    }

    #[tokio::test]
    async fn test_counts_objects_inside_radius() {
        let engine = BroadcastEngine::new(
            ScriptedFeed::new(vec![Ok(equator_and_pole())]),
            EngineConfig::default(),
        );
        let mut handle = engine.registry().add(circle(0.0, 0.0, 1000.0));

        let report = engine.refresh().await.unwrap();

        assert_eq!(report.generation, 1);
        assert_eq!(report.objects, 2);
        assert_eq!(report.subscribers, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(
            handle.try_recv(),
            Some(Delivery {
                generation: 1,
                count: 1
            })
        );
    }

    #[tokio::test]
    async fn test_each_subscriber_gets_its_own_count() {
        let engine = BroadcastEngine::new(
            ScriptedFeed::new(vec![Ok(equator_and_pole())]),
            EngineConfig::default(),
        );
        let mut small = engine.registry().add(circle(0.0, 0.0, 1000.0));
        let mut huge = engine.registry().add(circle(0.0, 0.0, 20_100.0));
        let mut none = engine.registry().add(circle(90.0, 0.0, 10.0));

        engine.refresh().await.unwrap();

        assert_eq!(small.try_recv().map(|d| d.count), Some(1));
        assert_eq!(huge.try_recv().map(|d| d.count), Some(2));
        assert_eq!(none.try_recv().map(|d| d.count), Some(0));
    }

    #[tokio::test]
    async fn test_no_value_before_first_refresh() {
        let engine = BroadcastEngine::new(
            ScriptedFeed::new(vec![Ok(Vec::new())]),
            EngineConfig::default(),
        );
        let mut handle = engine.registry().add(circle(0.0, 0.0, 500.0));

        // Broadcasting without a snapshot delivers nothing
        let report = engine.broadcast();
        assert_eq!(report.subscribers, 1);
        assert_eq!(report.delivered, 0);
        assert_eq!(handle.try_recv(), None);

        engine.refresh().await.unwrap();
        assert_eq!(
            handle.try_recv(),
            Some(Delivery {
                generation: 1,
                count: 0
            })
        );
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_snapshot() {
        let engine = BroadcastEngine::new(
            ScriptedFeed::new(vec![
                Ok(equator_and_pole()),
                Err(FeedError::Status { status: 503 }),
            ]),
            EngineConfig::default(),
        );
        let mut handle = engine.registry().add(circle(0.0, 0.0, 1000.0));

        engine.refresh().await.unwrap();
        assert!(handle.try_recv().is_some());
        let before = engine.store().count_matching(|_| true);

        let result = engine.refresh().await;
        assert!(matches!(result, Err(FeedError::Status { status: 503 })));

        assert_eq!(engine.store().count_matching(|_| true), before);
        assert_eq!(engine.store().generation(), 1);
        assert_eq!(handle.try_recv(), None);

        let stats = engine.stats();
        assert_eq!(stats.cycles_completed, 1);
        assert_eq!(stats.cycles_failed, 1);
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let config = EngineConfig::default().fetch_timeout(Duration::from_millis(20));
        let engine = BroadcastEngine::new(StalledFeed, config);

        let result = engine.refresh().await;

        assert!(matches!(result, Err(FeedError::Timeout(_))));
        assert!(engine.store().is_empty());
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[tokio::test]
    async fn test_stalled_subscriber_does_not_block_others() {
        let engine = BroadcastEngine::new(
            ScriptedFeed::repeating(equator_and_pole()),
            EngineConfig::default(),
        );
        let stalled = engine.registry().add(circle(0.0, 0.0, 1000.0));
        let mut active = engine.registry().add(circle(0.0, 0.0, 1000.0));

        for expected_generation in 1..=5u64 {
            let report = tokio::time::timeout(Duration::from_secs(1), engine.refresh())
                .await
                .expect("refresh blocked by a stalled subscriber")
                .unwrap();
            assert_eq!(report.delivered, 2);

            let delivery = tokio::time::timeout(Duration::from_secs(1), active.recv())
                .await
                .expect("active subscriber starved")
                .unwrap();
            assert_eq!(delivery.generation, expected_generation);
        }

        // The stalled subscriber holds only the newest result
        let mut stalled = stalled;
        assert_eq!(stalled.try_recv().map(|d| d.generation), Some(5));
        assert_eq!(stalled.try_recv(), None);
        assert_eq!(engine.stats().congested, 4);
    }

    #[tokio::test]
    async fn test_removed_subscriber_is_skipped() {
        let engine = BroadcastEngine::new(
            ScriptedFeed::repeating(equator_and_pole()),
            EngineConfig::default(),
        );
        let gone = engine.registry().add(circle(0.0, 0.0, 1000.0));
        let mut kept = engine.registry().add(circle(0.0, 0.0, 1000.0));

        drop(gone);
        let report = engine.refresh().await.unwrap();

        assert_eq!(report.subscribers, 1);
        assert!(kept.try_recv().is_some());
    }

    #[tokio::test]
    async fn test_state_during_refresh() {
        let engine = Arc::new(BroadcastEngine::new(
            GatedFeed {
                gate: Notify::new(),
            },
            EngineConfig::default(),
        ));
        assert_eq!(engine.state(), EngineState::Idle);

        let task = {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.refresh().await })
        };

        let deadline = Instant::now() + Duration::from_secs(1);
        while engine.state() != EngineState::Refreshing {
            assert!(Instant::now() < deadline, "engine never started refreshing");
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        engine.feed.gate.notify_one();
        task.await.unwrap().unwrap();

        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.store().len(), 1);
    }

    #[tokio::test]
    async fn test_run_refreshes_immediately_and_periodically() {
        let config = EngineConfig::default().refresh_interval(Duration::from_millis(20));
        let engine = Arc::new(BroadcastEngine::new(
            ScriptedFeed::repeating(equator_and_pole()),
            config,
        ));
        let mut handle = engine.registry().add(circle(0.0, 0.0, 1000.0));

        let task = engine.spawn();

        let first = tokio::time::timeout(Duration::from_secs(1), handle.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.count, 1);

        let later = tokio::time::timeout(Duration::from_secs(1), handle.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(later.generation > first.generation);

        task.abort();
    }

    #[tokio::test]
    async fn test_run_survives_failures() {
        let config = EngineConfig::default().refresh_interval(Duration::from_millis(10));
        let engine = Arc::new(BroadcastEngine::new(
            ScriptedFeed {
                script: Mutex::new(
                    vec![
                        Err(FeedError::Http("connection refused".into())),
                        Err(FeedError::Decode("truncated".into())),
                    ]
                    .into(),
                ),
                fallback: equator_and_pole(),
            },
            config,
        ));
        let mut handle = engine.registry().add(circle(0.0, 0.0, 1000.0));

        let task = engine.spawn();
        let delivery = tokio::time::timeout(Duration::from_secs(1), handle.recv())
            .await
            .unwrap()
            .unwrap();
        task.abort();

        assert_eq!(delivery.generation, 1);
        assert!(engine.stats().cycles_failed >= 2);
    }

    #[tokio::test]
    async fn test_run_with_zero_interval() {
        let config = EngineConfig {
            refresh_interval: Duration::ZERO,
            ..EngineConfig::default()
        };
        let engine = Arc::new(BroadcastEngine::new(
            ScriptedFeed::repeating(equator_and_pole()),
            config,
        ));
        let mut handle = engine.registry().add(circle(0.0, 0.0, 1000.0));

        let task = engine.spawn();
        let first = tokio::time::timeout(Duration::from_secs(1), handle.recv())
            .await
            .unwrap()
            .unwrap();
        let later = tokio::time::timeout(Duration::from_secs(1), handle.recv())
            .await
            .unwrap()
            .unwrap();

        assert!(!task.is_finished());
        task.abort();
        assert!(later.generation > first.generation);
    }
}
