#![deny(warnings)]

//! Engine composition, analytics and observation for the market simulator.
//!
//! [`MarketEngine`] owns every piece of simulation state and advances it one
//! tick at a time. [`EngineClock`] drives it on a tokio interval and publishes
//! an immutable [`EngineSnapshot`] after each tick; [`MarketQuery`] answers
//! read-only questions against whichever snapshot it was created from.

pub mod analytics;
pub mod clock;
pub mod engine;
pub mod query;
pub mod snapshot;

pub use analytics::{
    AnalyticsReport, AnalyticsSummary, CycleAnalytics, CycleRecord, RegimeTicks, Spread,
    TickObservation, TrailingReturns, RETURN_WINDOWS,
};
pub use clock::{ClockError, ClockHandle, EngineClock};
pub use engine::{EngineError, MarketEngine, TickReport};
pub use query::{
    EngineInfo, EntityFilter, EntityPage, EntityView, HistoryView, MarketQuery, MarketStats,
    PageRequest, QueryError, StatusFilter, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use snapshot::{EngineSnapshot, EngineTiming, EntitySnapshot, SnapshotSink, SnapshotStore};
