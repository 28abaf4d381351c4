//! Read-only queries over one published snapshot.

use crate::analytics::AnalyticsReport;
use crate::snapshot::{EngineSnapshot, EntitySnapshot, SnapshotStore};
use market_core::{EntityId, MarketPhase, Sector, SubIndustry, HISTORY_CAPACITY};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    /// No entity carries the requested ticker.
    #[error("ticker {0} not found")]
    NotFound(String),
    /// A request parameter is out of range.
    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Which slots a listing includes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    Active,
    Bankrupt,
    All,
}

#[derive(Clone, Debug, Default)]
pub struct EntityFilter {
    pub sector: Option<Sector>,
    pub status: StatusFilter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Externally visible entity fields.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntityView {
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
}

impl From<&EntitySnapshot> for EntityView {
    fn from(e: &EntitySnapshot) -> Self {
        Self {
            id: e.id,
            ticker: e.ticker.clone(),
            name: e.name.clone(),
            sector: e.sector,
            sub_industry: e.sub_industry,
            price: e.price,
            market_status: e.market_status,
            shares_outstanding: e.shares_outstanding,
            market_cap: e.market_cap,
            volatility: e.volatility,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntityPage {
    pub items: Vec<EntityView>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryView {
    pub ticker: String,
    /// Oldest first.
    pub prices: Vec<f64>,
    pub market_status: MarketPhase,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MarketStats {
    pub total_market_cap: f64,
    pub active_count: usize,
    pub vix: f64,
    pub interest_rate: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EngineInfo {
    pub tick: u64,
    pub phase: MarketPhase,
    pub ticks_in_phase: u64,
    pub tick_interval_ms: u64,
    pub publish_every_ticks: u64,
    pub trading_window_ticks: u64,
    pub closed_window_ticks: u64,
}

/// Queries pinned to a single snapshot, so consecutive calls agree.
#[derive(Clone, Debug)]
pub struct MarketQuery {
    snapshot: Arc<EngineSnapshot>,
}

impl MarketQuery {
    pub fn new(snapshot: Arc<EngineSnapshot>) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &EngineSnapshot {
        &self.snapshot
    }

    pub fn list_entities(
        &self,
        filter: &EntityFilter,
        request: PageRequest,
    ) -> Result<EntityPage, QueryError> {
        if request.page == 0 {
            return Err(QueryError::InvalidParameter {
                name: "page",
                reason: "must be >= 1".into(),
            });
        }
        if !(1..=MAX_PAGE_SIZE).contains(&request.page_size) {
            return Err(QueryError::InvalidParameter {
                name: "page_size",
                reason: format!("must be within 1..={MAX_PAGE_SIZE}"),
            });
        }

        let matching: Vec<&EntitySnapshot> = self
            .snapshot
            .entities
            .iter()
            .filter(|e| filter.sector.map_or(true, |s| e.sector == s))
            .filter(|e| match filter.status {
                StatusFilter::Active => e.active,
                StatusFilter::Bankrupt => !e.active,
                StatusFilter::All => true,
            })
            .collect();
        let total = matching.len();
        let total_pages = total.div_ceil(request.page_size);
        if request.page > total_pages.max(1) {
            return Err(QueryError::InvalidParameter {
                name: "page",
                reason: format!("page {} exceeds {} pages", request.page, total_pages),
            });
        }
        let items = matching
            .into_iter()
            .skip((request.page - 1) * request.page_size)
            .take(request.page_size)
            .map(EntityView::from)
            .collect();
        Ok(EntityPage {
            items,
            page: request.page,
            page_size: request.page_size,
            total,
            total_pages,
        })
    }

    /// Case-insensitive lookup; an active holder of the ticker wins.
    pub fn entity(&self, ticker: &str) -> Result<EntityView, QueryError> {
        self.find(ticker).map(EntityView::from)
    }

    /// The `len` most recent prices, `1 <= len <= 60`.
    pub fn history(&self, ticker: &str, len: usize) -> Result<HistoryView, QueryError> {
        if !(1..=HISTORY_CAPACITY).contains(&len) {
            return Err(QueryError::InvalidParameter {
                name: "ticks",
                reason: format!("must be within 1..={HISTORY_CAPACITY}"),
            });
        }
        let e = self.find(ticker)?;
        let skip = e.history.len().saturating_sub(len);
        Ok(HistoryView {
            ticker: e.ticker.clone(),
            prices: e.history[skip..].to_vec(),
            market_status: e.market_status,
        })
    }

    pub fn market_stats(&self) -> MarketStats {
        MarketStats {
            total_market_cap: self.snapshot.total_market_cap,
            active_count: self.snapshot.active_count,
            vix: self.snapshot.vix,
            interest_rate: self.snapshot.interest_rate,
        }
    }

    pub fn engine_info(&self) -> EngineInfo {
        let s = &self.snapshot;
        EngineInfo {
            tick: s.tick,
            phase: s.phase,
            ticks_in_phase: s.ticks_in_phase,
            tick_interval_ms: s.timing.tick_interval_ms,
            publish_every_ticks: s.timing.publish_every_ticks,
            trading_window_ticks: s.timing.trading_window_ticks,
            closed_window_ticks: s.timing.closed_window_ticks,
        }
    }

    pub fn analytics(&self) -> &AnalyticsReport {
        &self.snapshot.analytics
    }

    fn find(&self, ticker: &str) -> Result<&EntitySnapshot, QueryError> {
        let matches = |e: &&EntitySnapshot| e.ticker.eq_ignore_ascii_case(ticker);
        let entities = &self.snapshot.entities;
        entities
            .iter()
            .filter(|e| e.active)
            .find(matches)
            .or_else(|| entities.iter().find(matches))
            .ok_or_else(|| QueryError::NotFound(ticker.to_string()))
    }
}

impl SnapshotStore {
    /// Queries against the snapshot current at call time.
    pub fn query(&self) -> MarketQuery {
        MarketQuery::new(self.latest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MarketEngine;
    use market_core::EngineConfig;

    fn query_after(ticks: u64) -> (MarketQuery, MarketEngine) {
        let mut engine = MarketEngine::new(EngineConfig::default()).unwrap();
        engine.run_ticks(ticks);
        let store = SnapshotStore::new(engine.snapshot());
        (store.query(), engine)
    }

    #[test]
    fn pagination_covers_all_active_entities() {
        let (q, _) = query_after(5);
        let first = q
            .list_entities(&EntityFilter::default(), PageRequest { page: 1, page_size: 30 })
            .unwrap();
        assert_eq!(first.total, 100);
        assert_eq!(first.total_pages, 4);
        assert_eq!(first.items.len(), 30);
        let last = q
            .list_entities(&EntityFilter::default(), PageRequest { page: 4, page_size: 30 })
            .unwrap();
        assert_eq!(last.items.len(), 10);
    }

    #[test]
    fn out_of_range_pagination_is_invalid() {
        let (q, _) = query_after(1);
        let f = EntityFilter::default();
        for req in [
            PageRequest { page: 0, page_size: 10 },
            PageRequest { page: 1, page_size: 0 },
            PageRequest { page: 1, page_size: 101 },
            PageRequest { page: 3, page_size: 50 },
        ] {
            assert!(matches!(
                q.list_entities(&f, req),
                Err(QueryError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn bankrupt_entities_only_appear_outside_the_active_listing() {
        let mut engine = MarketEngine::new(EngineConfig::default()).unwrap();
        let ticker = {
            let slot = engine.population_mut().slot_mut(4).unwrap();
            slot.declare_bankrupt();
            slot.ticker.clone()
        };
        let q = SnapshotStore::new(engine.snapshot()).query();
        let active = q
            .list_entities(&EntityFilter::default(), PageRequest { page: 1, page_size: 100 })
            .unwrap();
        assert_eq!(active.total, 99);
        assert!(active.items.iter().all(|e| e.ticker != ticker));
        let gone = q
            .list_entities(
                &EntityFilter {
                    sector: None,
                    status: StatusFilter::Bankrupt,
                },
                PageRequest::default(),
            )
            .unwrap();
        assert_eq!(gone.items[0].ticker, ticker);
        assert_eq!(gone.items[0].market_cap, 0.0);
    }

    #[test]
    fn sector_filter_restricts_listing() {
        let (q, _) = query_after(1);
        let tech = q
            .list_entities(
                &EntityFilter {
                    sector: Some(Sector::Technology),
                    status: StatusFilter::All,
                },
                PageRequest { page: 1, page_size: 100 },
            )
            .unwrap();
        assert!(tech.items.iter().all(|e| e.sector == Sector::Technology));
    }

    #[test]
    fn lookup_and_history() {
        let (q, engine) = query_after(70);
        let ticker = engine.population().slots()[0].ticker.clone();
        let view = q.entity(&ticker.to_lowercase()).unwrap();
        assert_eq!(view.ticker, ticker);

        let h = q.history(&ticker, 60).unwrap();
        assert_eq!(h.prices.len(), 60);
        assert_eq!(*h.prices.last().unwrap(), view.price);
        assert_eq!(q.history(&ticker, 5).unwrap().prices, h.prices[55..].to_vec());

        assert!(matches!(q.entity("ZZZZZ"), Err(QueryError::NotFound(_))));
        assert!(matches!(
            q.history(&ticker, 61),
            Err(QueryError::InvalidParameter { .. })
        ));
        assert!(matches!(
            q.history(&ticker, 0),
            Err(QueryError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn stats_and_info_mirror_snapshot() {
        let (q, engine) = query_after(13);
        let stats = q.market_stats();
        assert_eq!(stats.active_count, engine.population().active_count());
        assert_eq!(stats.vix, engine.macro_state().vix);
        let info = q.engine_info();
        assert_eq!(info.tick, 13);
        assert_eq!(info.phase, MarketPhase::Closed);
        assert_eq!(info.ticks_in_phase, 1);
        assert_eq!((info.trading_window_ticks, info.closed_window_ticks), (12, 8));
        assert_eq!(q.analytics().current.ticks, 13);
    }
}
