#![deny(warnings)]

//! Stochastic state transitions for the market simulator.
//!
//! Each component advances one tick at a time and takes the outputs of the
//! previous pipeline stage as typed parameters:
//! - [`TradingScheduler`]: open/closed duty cycle and overnight gap draws
//! - [`RegimeModel`]: Markov chain over macro regimes
//! - [`MacroModel`]: interest rate and VIX tracking the regime targets
//! - [`Population`]: entity dynamics, bankruptcy and IPO replacement
//!
//! All randomness comes from a caller-supplied `rand::Rng`, so a seeded
//! `rand_chacha::ChaCha8Rng` makes every run reproducible.

pub mod factory;
pub mod lifecycle;
pub mod macro_model;
pub mod regime;
pub mod scheduler;

pub use factory::EntityFactory;
pub use lifecycle::{EntityFault, LifecycleOutcome, MarketConditions, Population};
pub use macro_model::MacroModel;
pub use regime::{RegimeModel, RegimeTransition};
pub use scheduler::{PhaseChange, TradingScheduler};
