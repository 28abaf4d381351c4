#![deny(warnings)]

//! Core vocabulary for the market simulator.
//!
//! This crate defines the serializable types shared by the dynamics and
//! runtime crates (regimes, sectors, entities, macro scalars, events) and the
//! engine configuration together with its validation rules.

pub mod config;
pub mod entity;
pub mod market;
pub mod regime;
pub mod sector;

pub use config::{
    AnalyticsConfig, ClockConfig, ConfigError, EngineConfig, LifecycleConfig, MacroConfig,
    RegimeConfig, ScheduleConfig, SeedingConfig,
};
pub use entity::{
    Entity, EntityId, EntityStatus, PriceHistory, HEALTH_INITIAL, HEALTH_MAX, HISTORY_CAPACITY,
};
pub use market::{
    EventCategory, EventLog, LogEntry, MacroState, MarketEvent, MarketPhase, EVENT_LOG_CAPACITY,
};
pub use regime::{Band, Regime, RegimeProfile, TransitionRow};
pub use sector::{Sector, SubIndustry};
