//! Population arena: per-tick price/health dynamics, bankruptcy and IPO
//! replacement.
//!
//! The population is a fixed set of slots. Bankruptcy flips a slot's status;
//! an IPO reinitializes a bankrupt slot in place, so the slot count never
//! changes after seeding.

use crate::factory::EntityFactory;
use crate::scheduler::TradingScheduler;
use market_core::{
    ConfigError, Entity, EntityId, LifecycleConfig, MacroState, MarketEvent, MarketPhase, Regime,
    RegimeProfile, HEALTH_MAX,
};
use rand::Rng;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{error, info, warn};

/// Corrupt entity state detected before an update.
#[derive(Debug, Error, PartialEq)]
pub enum EntityFault {
    #[error("price {0} is not finite")]
    NonFinitePrice(f64),
    #[error("active price {0} is not positive")]
    NonPositivePrice(f64),
    #[error("health {0} is not finite")]
    NonFiniteHealth(f64),
    #[error("share count {0} is invalid")]
    InvalidShares(f64),
}

/// Inputs from the upstream pipeline stages for one tick.
#[derive(Clone, Copy, Debug)]
pub struct MarketConditions<'a> {
    pub regime: Regime,
    pub profile: &'a RegimeProfile,
    pub macro_state: MacroState,
    pub phase: MarketPhase,
}

/// Result of one lifecycle pass.
#[derive(Clone, Debug, Default)]
pub struct LifecycleOutcome {
    pub events: Vec<MarketEvent>,
    pub bankruptcies: u32,
    pub ipos: u32,
    /// Entities skipped because their state was corrupt.
    pub faults: u32,
    pub active_count: usize,
    pub total_market_cap: f64,
}

#[derive(Clone, Debug)]
pub struct Population {
    slots: Vec<Entity>,
    next_id: u64,
    factory: EntityFactory,
    cfg: LifecycleConfig,
}

impl Population {
    /// Cold-start `cfg.population_size` entities.
    pub fn seed<R: Rng + ?Sized>(cfg: &LifecycleConfig, rng: &mut R) -> Result<Self, ConfigError> {
        let factory = EntityFactory::new(&cfg.seeding, cfg.price_floor)?;
        let mut taken = HashSet::with_capacity(cfg.population_size);
        let mut slots = Vec::with_capacity(cfg.population_size);
        for i in 0..cfg.population_size {
            let entity = factory.cold_start(EntityId(i as u64), &taken, rng);
            taken.insert(entity.ticker.clone());
            slots.push(entity);
        }
        Ok(Self {
            slots,
            next_id: cfg.population_size as u64,
            factory,
            cfg: cfg.clone(),
        })
    }

    pub fn slots(&self) -> &[Entity] {
        &self.slots
    }

    /// Direct slot access for scenario setup.
    pub fn slot_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.slots.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|e| e.is_active()).count()
    }

    pub fn total_market_cap(&self) -> f64 {
        self.slots
            .iter()
            .filter(|e| e.is_active())
            .map(|e| e.market_cap)
            .sum()
    }

    /// Apply the overnight gap to every active entity. Returns the mean gap.
    pub fn apply_open_gap<R: Rng + ?Sized>(&mut self, scheduler: &TradingScheduler, rng: &mut R) -> f64 {
        let floor = self.cfg.price_floor;
        let mut total = 0.0;
        let mut n = 0usize;
        for entity in self.slots.iter_mut().filter(|e| e.is_active()) {
            let gap = scheduler.draw_gap(rng);
            entity.price = (entity.price * (1.0 + gap)).max(floor);
            entity.refresh_market_cap();
            total += gap;
            n += 1;
        }
        if n == 0 {
            0.0
        } else {
            total / n as f64
        }
    }

    /// Evolve every active entity, detect bankruptcies, then list at most one
    /// replacement.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        conditions: &MarketConditions<'_>,
        rng: &mut R,
    ) -> LifecycleOutcome {
        let mut outcome = LifecycleOutcome::default();
        let cfg = &self.cfg;

        for entity in self.slots.iter_mut().filter(|e| e.is_active()) {
            if let Err(fault) = inspect(entity) {
                error!(id = %entity.id, ticker = %entity.ticker, %fault, "skipping corrupt entity");
                outcome.faults += 1;
                continue;
            }
            evolve(entity, cfg, conditions, rng);
            if entity.price < cfg.bankruptcy_price && entity.health <= cfg.bankruptcy_health {
                entity.declare_bankrupt();
                warn!(id = %entity.id, ticker = %entity.ticker, "bankruptcy");
                outcome.bankruptcies += 1;
                outcome.events.push(MarketEvent::Bankruptcy {
                    id: entity.id,
                    ticker: entity.ticker.clone(),
                });
            }
        }

        if let Some(event) = self.maybe_list(conditions, rng) {
            outcome.ipos += 1;
            outcome.events.push(event);
        }

        outcome.active_count = self.active_count();
        outcome.total_market_cap = self.total_market_cap();
        outcome
    }

    fn maybe_list<R: Rng + ?Sized>(
        &mut self,
        conditions: &MarketConditions<'_>,
        rng: &mut R,
    ) -> Option<MarketEvent> {
        if conditions.phase != MarketPhase::Open || self.slots.is_empty() {
            return None;
        }
        let fraction = self.active_count() as f64 / self.slots.len() as f64;
        let vix_ok = self
            .cfg
            .ipo_max_vix
            .map_or(true, |cap| conditions.macro_state.vix < cap);
        let regular =
            fraction < self.cfg.ipo_active_fraction && conditions.regime == Regime::Growth && vix_ok;
        let emergency = !regular && fraction < self.cfg.emergency_active_fraction;
        if !(regular || emergency) {
            return None;
        }

        let index = self.slots.iter().position(|e| !e.is_active())?;
        let taken: HashSet<String> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, e)| e.ticker.clone())
            .collect();
        let id = EntityId(self.next_id);
        self.next_id += 1;
        let entity = self.factory.listing(id, &taken, rng);
        info!(slot = index, id = %id, ticker = %entity.ticker, emergency, "ipo");
        let event = MarketEvent::Ipo {
            id,
            ticker: entity.ticker.clone(),
            name: entity.name.clone(),
            emergency,
        };
        self.slots[index] = entity;
        Some(event)
    }
}

fn inspect(entity: &Entity) -> Result<(), EntityFault> {
    if !entity.price.is_finite() {
        return Err(EntityFault::NonFinitePrice(entity.price));
    }
    if entity.price <= 0.0 {
        return Err(EntityFault::NonPositivePrice(entity.price));
    }
    if !entity.health.is_finite() {
        return Err(EntityFault::NonFiniteHealth(entity.health));
    }
    if !(entity.shares_outstanding.is_finite() && entity.shares_outstanding > 0.0) {
        return Err(EntityFault::InvalidShares(entity.shares_outstanding));
    }
    Ok(())
}

/// Health first, then price, history and market cap.
fn evolve<R: Rng + ?Sized>(
    entity: &mut Entity,
    cfg: &LifecycleConfig,
    conditions: &MarketConditions<'_>,
    rng: &mut R,
) {
    let m = conditions.macro_state;

    let base_cost = m.interest_rate * cfg.rate_cost + m.vix * cfg.vix_cost;
    let performance = entity
        .history_return()
        .map_or(0.0, |r| r * cfg.performance_gain);
    entity.health = (entity.health - base_cost + performance + conditions.profile.health_regen)
        .clamp(0.0, HEALTH_MAX);

    let drift = entity.value_score * cfg.drift_scale * conditions.profile.drift_multiplier
        + (entity.health - 0.5) * cfg.health_bonus_scale;
    let amplitude = ((entity.volatility / cfg.volatility_scale) * (m.vix / cfg.baseline_vix))
        .min(cfg.volatility_cap);
    let draw = rng.gen::<f64>() * 2.0 - 1.0;
    let base = entity.price.max(cfg.price_floor);
    let log_move = drift + amplitude * draw - noise_drag(amplitude);
    entity.price = (base * log_move.exp()).max(cfg.price_floor);

    entity.history.push(entity.price);
    entity.age_ticks += 1;
    entity.refresh_market_cap();
}

/// `ln E[exp(a * U)]` for `U ~ Uniform(-1, 1)`, i.e. `ln(sinh(a) / a)`.
/// Subtracting it leaves the expected price move to the drift alone, so
/// dispersion across entities does not compound into aggregate returns.
fn noise_drag(amplitude: f64) -> f64 {
    if amplitude > 0.0 {
        (amplitude.sinh() / amplitude).ln()
    } else {
        0.0
    }
}
