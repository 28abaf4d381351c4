//! The owned engine aggregate and its strictly ordered tick pipeline.

use crate::analytics::{CycleAnalytics, CycleRecord, TickObservation};
use crate::snapshot::{EngineSnapshot, EngineTiming, EntitySnapshot};
use market_core::{
    ConfigError, EngineConfig, EventLog, MacroState, MarketEvent, MarketPhase, Regime,
};
use market_dynamics::{
    MacroModel, MarketConditions, PhaseChange, Population, RegimeModel, RegimeTransition,
    TradingScheduler,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// What happened during one [`MarketEngine::step`].
#[derive(Clone, Debug)]
pub struct TickReport {
    pub tick: u64,
    pub phase_change: Option<PhaseChange>,
    pub regime_transition: Option<RegimeTransition>,
    pub events: Vec<MarketEvent>,
    pub faults: u32,
    pub closed_cycle: Option<CycleRecord>,
}

/// All simulation state behind a single writer.
pub struct MarketEngine {
    config: EngineConfig,
    rng: ChaCha8Rng,
    tick: u64,
    epoch_ms: i64,
    scheduler: TradingScheduler,
    regime: RegimeModel,
    macro_model: MacroModel,
    population: Population,
    analytics: CycleAnalytics,
    log: EventLog,
}

impl MarketEngine {
    /// Engine whose event timestamps start at the Unix epoch.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Self::with_epoch_ms(config, 0)
    }

    /// Validate `config`, seed the RNG and cold-start the population.
    pub fn with_epoch_ms(config: EngineConfig, epoch_ms: i64) -> Result<Self, EngineError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let population = Population::seed(&config.lifecycle, &mut rng)?;
        let analytics = CycleAnalytics::new(&config.analytics, population.total_market_cap());
        info!(
            seed = config.seed,
            population = population.len(),
            regime = ?config.regimes.initial,
            "engine initialized"
        );
        Ok(Self {
            scheduler: TradingScheduler::new(&config.schedule),
            regime: RegimeModel::from_config(&config.regimes),
            macro_model: MacroModel::new(config.macro_.clone()),
            population,
            analytics,
            log: EventLog::new(),
            rng,
            tick: 0,
            epoch_ms,
            config,
        })
    }

    /// Advance one tick: scheduler, regime, macro, lifecycle, analytics, then
    /// the event log once every state change has been applied.
    pub fn step(&mut self) -> TickReport {
        self.tick += 1;
        let mut events = Vec::new();

        let phase_change = self.scheduler.advance();
        match phase_change {
            Some(PhaseChange::Opened) => {
                let mean_gap = self.population.apply_open_gap(&self.scheduler, &mut self.rng);
                debug!(tick = self.tick, mean_gap, "market open");
                events.push(MarketEvent::MarketOpened { mean_gap });
            }
            Some(PhaseChange::Closed) => {
                debug!(tick = self.tick, "market closed");
                events.push(MarketEvent::MarketClosed);
            }
            None => {}
        }

        let regime_transition = self.regime.maybe_transition(&mut self.rng);
        if let Some(t) = regime_transition {
            events.push(MarketEvent::RegimeShift {
                from: t.from,
                to: t.to,
            });
        }
        let regime = self.regime.current();
        let profile = self.config.regimes.profile(regime);

        let macro_state = self.macro_model.update(profile, &mut self.rng);

        let conditions = MarketConditions {
            regime,
            profile,
            macro_state,
            phase: self.scheduler.phase(),
        };
        let outcome = self.population.update(&conditions, &mut self.rng);

        let closed_cycle = self.analytics.record(&TickObservation {
            tick: self.tick,
            regime,
            regime_changed: regime_transition.is_some(),
            vix: macro_state.vix,
            interest_rate: macro_state.interest_rate,
            active_count: outcome.active_count,
            total_market_cap: outcome.total_market_cap,
            ipos: outcome.ipos,
            bankruptcies: outcome.bankruptcies,
        });
        events.extend(outcome.events);

        let timestamp_ms = self.timestamp_ms();
        for event in &events {
            self.log.record(self.tick, timestamp_ms, event);
        }

        TickReport {
            tick: self.tick,
            phase_change,
            regime_transition,
            events,
            faults: outcome.faults,
            closed_cycle,
        }
    }

    /// Step `ticks` times synchronously. Returns the cycles closed on the way.
    pub fn run_ticks(&mut self, ticks: u64) -> Vec<CycleRecord> {
        (0..ticks).filter_map(|_| self.step().closed_cycle).collect()
    }

    /// Immutable projection of the current state.
    pub fn snapshot(&self) -> EngineSnapshot {
        let phase = self.scheduler.phase();
        let macro_state = self.macro_model.state();
        let regime = self.regime.current();
        EngineSnapshot {
            tick: self.tick,
            phase,
            ticks_in_phase: self.scheduler.ticks_in_phase(),
            regime,
            regime_label: regime.label(),
            vix: macro_state.vix,
            interest_rate: macro_state.interest_rate,
            total_market_cap: self.population.total_market_cap(),
            active_count: self.population.active_count(),
            entities: self
                .population
                .slots()
                .iter()
                .map(|e| EntitySnapshot::project(e, phase))
                .collect(),
            events: self.log.to_vec(),
            analytics: self.analytics.report(),
            timing: EngineTiming {
                tick_interval_ms: self.config.clock.tick_interval_ms,
                publish_every_ticks: self.config.clock.publish_every_ticks,
                trading_window_ticks: self.scheduler.trading_window(),
                closed_window_ticks: self.scheduler.closed_window(),
            },
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn regime(&self) -> Regime {
        self.regime.current()
    }

    pub fn macro_state(&self) -> MacroState {
        self.macro_model.state()
    }

    pub fn phase(&self) -> MarketPhase {
        self.scheduler.phase()
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Mutable slot access for scenario setup.
    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }

    pub fn analytics(&self) -> &CycleAnalytics {
        &self.analytics
    }

    pub fn events(&self) -> &EventLog {
        &self.log
    }

    fn timestamp_ms(&self) -> i64 {
        let offset = self.tick.saturating_mul(self.config.clock.tick_interval_ms);
        self.epoch_ms
            .saturating_add(i64::try_from(offset).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::{EntityStatus, EventCategory, TransitionRow};
    use std::collections::HashSet;

    fn engine(seed: u64) -> MarketEngine {
        let mut cfg = EngineConfig::default();
        cfg.seed = seed;
        MarketEngine::new(cfg).unwrap()
    }

    #[test]
    fn invalid_config_fails_construction() {
        let mut cfg = EngineConfig::default();
        cfg.regimes.growth.transitions = TransitionRow::new(0.5, 0.1, 0.0, 0.0);
        assert!(matches!(
            MarketEngine::new(cfg),
            Err(EngineError::Config(ConfigError::RowSum { .. }))
        ));
    }

    #[test]
    fn forced_insolvency_goes_bankrupt_with_error_event() {
        let mut e = engine(21);
        let ticker = {
            let slot = e.population_mut().slot_mut(0).unwrap();
            slot.health = 0.0;
            slot.price = 0.05;
            slot.ticker.clone()
        };
        let report = e.step();
        let slot = &e.population().slots()[0];
        assert_eq!(slot.status, EntityStatus::Bankrupt);
        assert_eq!(slot.market_cap, 0.0);
        assert!(report
            .events
            .iter()
            .any(|ev| matches!(ev, MarketEvent::Bankruptcy { .. })));
        let logged = e
            .events()
            .iter()
            .find(|entry| entry.message.contains(&ticker))
            .unwrap();
        assert_eq!(logged.category, EventCategory::Error);
        assert_eq!(logged.tick, 1);
        assert_eq!(e.snapshot().entities[0].market_cap, 0.0);
    }

    #[test]
    fn growth_replaces_exactly_one_bankrupt_slot() {
        let mut cfg = EngineConfig::default();
        cfg.seed = 5;
        cfg.lifecycle.ipo_max_vix = None;
        let mut e = MarketEngine::new(cfg).unwrap();
        assert_eq!(e.regime(), Regime::Growth);
        for i in 0..15 {
            e.population_mut().slot_mut(i).unwrap().declare_bankrupt();
        }
        let old_ids: HashSet<_> = e.population().slots().iter().map(|s| s.id).collect();

        e.step();

        let revived: Vec<_> = e.population().slots()[..15]
            .iter()
            .filter(|s| s.is_active())
            .collect();
        assert_eq!(revived.len(), 1);
        assert_eq!(revived[0].health, 1.0);
        assert!(!old_ids.contains(&revived[0].id));
        assert_eq!(e.population().active_count(), 86);
        assert_eq!(e.analytics().current().ipo_count, 1);
    }

    #[test]
    fn events_are_logged_after_the_tick_with_simulated_time() {
        let mut e = engine(3);
        let mut closed_at = None;
        for _ in 0..12 {
            let r = e.step();
            if r.phase_change == Some(PhaseChange::Closed) {
                closed_at = Some(r.tick);
            }
        }
        assert_eq!(closed_at, Some(12));
        let latest = e.events().iter().next().unwrap();
        assert_eq!(latest.category, EventCategory::Warning);
        assert_eq!(latest.timestamp_ms, 12 * 500);
        assert_eq!(e.phase(), MarketPhase::Closed);
    }

    #[test]
    fn snapshot_hides_internal_fields() {
        let e = engine(1);
        let json = serde_json::to_value(e.snapshot()).unwrap();
        let first = &json["entities"][0];
        assert!(first.get("health").is_none());
        assert!(first.get("value_score").is_none());
        assert!(first.get("status").is_none());
        assert!(first.get("active").is_none());
        assert!(first.get("ticker").is_some());
        assert_eq!(json["regime"], "GROWTH");
    }

    #[test]
    fn same_seed_same_snapshots() {
        let mut a = engine(99);
        let mut b = engine(99);
        a.run_ticks(400);
        b.run_ticks(400);
        let sa = serde_json::to_string(&a.snapshot()).unwrap();
        let sb = serde_json::to_string(&b.snapshot()).unwrap();
        assert_eq!(sa, sb);

        let mut c = engine(100);
        c.run_ticks(400);
        assert_ne!(sa, serde_json::to_string(&c.snapshot()).unwrap());
    }
}
