//! Fixed-period tick driver.

use crate::engine::MarketEngine;
use crate::snapshot::{SnapshotSink, SnapshotStore};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("clock task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Drives one [`MarketEngine`] at its configured tick interval. The engine is
/// owned by the loop, so ticks never overlap.
pub struct EngineClock {
    engine: MarketEngine,
    store: Arc<SnapshotStore>,
    sinks: Vec<Arc<dyn SnapshotSink>>,
    period: Duration,
    publish_every: u64,
    tick_limit: Option<u64>,
}

impl EngineClock {
    pub fn new(engine: MarketEngine, store: Arc<SnapshotStore>) -> Self {
        let clock = &engine.config().clock;
        let period = Duration::from_millis(clock.tick_interval_ms.max(1));
        let publish_every = clock.publish_every_ticks.max(1);
        Self {
            engine,
            store,
            sinks: Vec::new(),
            period,
            publish_every,
            tick_limit: None,
        }
    }

    /// Push sink receiving every `publish_every_ticks`-th snapshot.
    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Stop on its own once the engine reaches `tick`.
    pub fn with_tick_limit(mut self, tick: u64) -> Self {
        self.tick_limit = Some(tick);
        self
    }

    pub fn spawn(self) -> ClockHandle {
        let (tx, rx) = oneshot::channel();
        ClockHandle {
            shutdown: Some(tx),
            task: tokio::spawn(self.run(rx)),
        }
    }

    /// Tick until `shutdown` fires (or its sender is dropped) or the tick
    /// limit is reached. A late tick delays the schedule instead of bursting.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> MarketEngine {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_ms = self.period.as_millis() as u64, "clock started");

        loop {
            if self.tick_limit.is_some_and(|limit| self.engine.tick() >= limit) {
                break;
            }
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = interval.tick() => self.advance(),
            }
        }

        info!(tick = self.engine.tick(), "clock stopped");
        self.engine
    }

    fn advance(&mut self) {
        let report = self.engine.step();
        let snapshot = Arc::new(self.engine.snapshot());
        self.store.publish(Arc::clone(&snapshot));
        if report.tick % self.publish_every == 0 {
            for sink in &self.sinks {
                sink.publish(Arc::clone(&snapshot));
            }
            debug!(tick = report.tick, sinks = self.sinks.len(), "snapshot pushed");
        }
    }
}

/// Running clock task. Dropping the handle also stops the clock.
pub struct ClockHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<MarketEngine>,
}

impl ClockHandle {
    /// Finish the in-flight tick, stop, and hand the engine back.
    pub async fn stop(mut self) -> Result<MarketEngine, ClockError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        Ok(self.task.await?)
    }

    /// Wait for the clock to stop on its tick limit.
    pub async fn join(mut self) -> Result<MarketEngine, ClockError> {
        let _keep_running = self.shutdown.take();
        Ok(self.task.await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::EngineSnapshot;
    use market_core::EngineConfig;
    use tokio::sync::broadcast;

    fn small_engine() -> MarketEngine {
        let mut cfg = EngineConfig::default();
        cfg.lifecycle.population_size = 20;
        MarketEngine::new(cfg).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_tick_limit_and_publishes_every_tick() {
        let engine = small_engine();
        let store = Arc::new(SnapshotStore::new(engine.snapshot()));
        let handle = EngineClock::new(engine, Arc::clone(&store))
            .with_tick_limit(10)
            .spawn();
        let engine = handle.join().await.unwrap();
        assert_eq!(engine.tick(), 10);
        assert_eq!(store.latest().tick, 10);
        assert_eq!(*store.latest(), engine.snapshot());
    }

    #[tokio::test(start_paused = true)]
    async fn push_sinks_are_throttled() {
        let engine = small_engine();
        let store = Arc::new(SnapshotStore::new(engine.snapshot()));
        let (tx, mut rx) = broadcast::channel::<Arc<EngineSnapshot>>(64);
        let handle = EngineClock::new(engine, store)
            .with_sink(Arc::new(tx))
            .with_tick_limit(10)
            .spawn();
        handle.join().await.unwrap();
        let mut ticks = Vec::new();
        while let Ok(snap) = rx.try_recv() {
            let sum: f64 = snap
                .entities
                .iter()
                .filter(|e| e.active)
                .map(|e| e.market_cap)
                .sum();
            assert!((sum - snap.total_market_cap).abs() <= 1e-6 * snap.total_market_cap);
            ticks.push(snap.tick);
        }
        assert_eq!(ticks, vec![2, 4, 6, 8, 10]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_returns_engine_between_ticks() {
        let engine = small_engine();
        let store = Arc::new(SnapshotStore::new(engine.snapshot()));
        let handle = EngineClock::new(engine, Arc::clone(&store)).spawn();
        tokio::time::sleep(Duration::from_millis(2_250)).await;
        let engine = handle.stop().await.unwrap();
        assert!(engine.tick() >= 4, "tick {}", engine.tick());
        assert_eq!(store.latest().tick, engine.tick());
    }

    #[tokio::test(start_paused = true)]
    async fn readers_keep_their_snapshot_across_publishes() {
        let engine = small_engine();
        let store = Arc::new(SnapshotStore::new(engine.snapshot()));
        let pinned = store.query();
        let handle = EngineClock::new(engine, Arc::clone(&store))
            .with_tick_limit(3)
            .spawn();
        handle.join().await.unwrap();
        assert_eq!(pinned.engine_info().tick, 0);
        assert_eq!(store.query().engine_info().tick, 3);
    }
}
