//! Immutable snapshots and the sinks they are published to.

use crate::analytics::AnalyticsReport;
use market_core::{Entity, EntityId, LogEntry, MarketPhase, Regime, Sector, SubIndustry};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::trace;

/// Public projection of one population slot. Health and value score are
/// never copied in; status is kept for filtering but not serialized.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub ticker: String,
    pub name: String,
    pub sector: Sector,
    pub sub_industry: SubIndustry,
    pub price: f64,
    pub market_status: MarketPhase,
    pub shares_outstanding: f64,
    pub market_cap: f64,
    pub volatility: f64,
    pub history: Vec<f64>,
    #[serde(skip)]
    pub(crate) active: bool,
}

impl EntitySnapshot {
    pub(crate) fn project(entity: &Entity, phase: MarketPhase) -> Self {
        Self {
            id: entity.id,
            ticker: entity.ticker.clone(),
            name: entity.name.clone(),
            sector: entity.sector,
            sub_industry: entity.sub_industry,
            price: entity.price,
            market_status: phase,
            shares_outstanding: entity.shares_outstanding,
            market_cap: entity.market_cap,
            volatility: entity.volatility,
            history: entity.history.to_vec(),
            active: entity.is_active(),
        }
    }
}

/// Configured pacing, echoed for engine-info queries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EngineTiming {
    pub tick_interval_ms: u64,
    pub publish_every_ticks: u64,
    pub trading_window_ticks: u64,
    pub closed_window_ticks: u64,
}

/// Point-in-time view of the whole engine, never mutated once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub tick: u64,
    pub phase: MarketPhase,
    pub ticks_in_phase: u64,
    pub regime: Regime,
    pub regime_label: &'static str,
    pub vix: f64,
    pub interest_rate: f64,
    pub total_market_cap: f64,
    pub active_count: usize,
    pub entities: Vec<EntitySnapshot>,
    pub events: Vec<LogEntry>,
    pub analytics: AnalyticsReport,
    pub timing: EngineTiming,
}

/// Receiver of published snapshots.
pub trait SnapshotSink: Send + Sync {
    fn publish(&self, snapshot: Arc<EngineSnapshot>);
}

/// Latest-snapshot holder backing pull queries. Publishing swaps the `Arc`;
/// readers keep whatever snapshot they already cloned.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<EngineSnapshot>>,
}

impl SnapshotStore {
    pub fn new(initial: EngineSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn latest(&self) -> Arc<EngineSnapshot> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }
}

impl SnapshotSink for SnapshotStore {
    fn publish(&self, snapshot: Arc<EngineSnapshot>) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = snapshot;
    }
}

impl SnapshotSink for broadcast::Sender<Arc<EngineSnapshot>> {
    fn publish(&self, snapshot: Arc<EngineSnapshot>) {
        let tick = snapshot.tick;
        if self.send(snapshot).is_err() {
            trace!(tick, "no push subscribers");
        }
    }
}
