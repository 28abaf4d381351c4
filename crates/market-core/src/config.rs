//! Engine configuration with calibrated defaults and fail-fast validation.

use crate::regime::{Band, Regime, RegimeProfile, TransitionRow};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance for transition rows summing to one.
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Largest share of a cycle a single regime visit may be expected to last.
pub const MAX_DWELL_CYCLE_FRACTION: f64 = 0.5;

/// Configuration errors, raised once at engine construction.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Counts and durations must be strictly positive.
    #[error("{field} must be > 0")]
    NonPositive { field: &'static str },
    /// Numeric value is NaN or infinite.
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },
    /// Range has `low > high` or a non-finite bound.
    #[error("{field} range [{low}, {high}] is invalid")]
    InvalidRange {
        field: &'static str,
        low: f64,
        high: f64,
    },
    /// Probability or fraction outside its allowed interval.
    #[error("{field} = {value} is outside [0, 1]")]
    ProbabilityOutOfRange { field: &'static str, value: f64 },
    /// Markov row does not sum to one.
    #[error("transition row for {regime:?} sums to {sum}, expected 1")]
    RowSum { regime: Regime, sum: f64 },
    /// Regime would dominate whole cycles.
    #[error(
        "{regime:?} expected dwell {dwell_ticks:.0} ticks exceeds half of a {cycle_ticks}-tick cycle"
    )]
    RegimeLockIn {
        regime: Regime,
        dwell_ticks: f64,
        cycle_ticks: u64,
    },
    /// Bankruptcy threshold sits at or below the price floor.
    #[error("bankruptcy price {bankruptcy_price} must exceed price floor {price_floor}")]
    UnreachableBankruptcy {
        price_floor: f64,
        bankruptcy_price: f64,
    },
    /// Invalid parameters for a sampling distribution.
    #[error("invalid distribution for {field}: {reason}")]
    Distribution { field: &'static str, reason: String },
}

/// Wall-clock pacing and publish throttling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Milliseconds between ticks.
    pub tick_interval_ms: u64,
    /// Push sinks receive every n-th snapshot.
    pub publish_every_ticks: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            publish_every_ticks: 2,
        }
    }
}

/// Open/closed duty cycle and overnight gap band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub trading_window_ticks: u64,
    pub closed_window_ticks: u64,
    /// Gap magnitude band; sign is drawn per entity.
    pub gap_magnitude: Band,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            trading_window_ticks: 12,
            closed_window_ticks: 8,
            gap_magnitude: Band::new(0.005, 0.02),
        }
    }
}

/// Cycle partitioning for analytics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub cycle_length_ticks: u64,
    pub ticks_per_period: u64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cycle_length_ticks: 7300,
            ticks_per_period: 20,
        }
    }
}

/// Markov chain cadence and per-regime profiles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    pub check_interval_ticks: u64,
    pub initial: Regime,
    pub growth: RegimeProfile,
    pub stagnation: RegimeProfile,
    pub contraction: RegimeProfile,
    pub crisis: RegimeProfile,
}

impl RegimeConfig {
    pub fn profile(&self, regime: Regime) -> &RegimeProfile {
        match regime {
            Regime::Growth => &self.growth,
            Regime::Stagnation => &self.stagnation,
            Regime::Contraction => &self.contraction,
            Regime::Crisis => &self.crisis,
        }
    }
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            check_interval_ticks: 20,
            initial: Regime::Growth,
            growth: RegimeProfile {
                rate_range: Band::new(0.0, 1.5),
                vix_baseline: 15.0,
                drift_multiplier: 6.5,
                health_regen: 5e-5,
                transitions: TransitionRow::new(0.95, 0.035, 0.015, 0.0),
            },
            stagnation: RegimeProfile {
                rate_range: Band::new(1.5, 3.5),
                vix_baseline: 18.0,
                drift_multiplier: 1.2,
                health_regen: 3e-5,
                transitions: TransitionRow::new(0.045, 0.93, 0.015, 0.01),
            },
            contraction: RegimeProfile {
                rate_range: Band::new(3.5, 5.0),
                vix_baseline: 25.0,
                drift_multiplier: -1.2,
                health_regen: -1e-5,
                transitions: TransitionRow::new(0.03, 0.03, 0.91, 0.03),
            },
            crisis: RegimeProfile {
                rate_range: Band::new(4.0, 5.5),
                vix_baseline: 35.0,
                drift_multiplier: -5.0,
                health_regen: -4e-5,
                transitions: TransitionRow::new(0.02, 0.04, 0.04, 0.90),
            },
        }
    }
}

/// Interest-rate and VIX dynamics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroConfig {
    pub initial_rate: f64,
    pub initial_vix: f64,
    /// Fraction of the gap to the rate target closed per tick.
    pub rate_approach: f64,
    /// Full width of the symmetric rate noise.
    pub rate_noise: f64,
    /// Fraction of the gap to the VIX baseline closed per tick.
    pub vix_decay: f64,
    /// Full width of the symmetric VIX noise.
    pub vix_noise: f64,
    pub vix_floor: f64,
    pub common_spike_probability: f64,
    pub common_spike: Band,
    pub rare_spike_probability: f64,
    pub rare_spike: Band,
}

impl Default for MacroConfig {
    fn default() -> Self {
        Self {
            initial_rate: 1.25,
            initial_vix: 15.5,
            rate_approach: 0.05,
            rate_noise: 0.02,
            vix_decay: 0.15,
            vix_noise: 1.5,
            vix_floor: 10.0,
            common_spike_probability: 0.01,
            common_spike: Band::new(5.0, 12.0),
            rare_spike_probability: 0.002,
            rare_spike: Band::new(15.0, 40.0),
        }
    }
}

/// Per-entity dynamics, bankruptcy and IPO rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    pub population_size: usize,
    /// Active prices never fall below this.
    pub price_floor: f64,
    /// Bankruptcy requires price below this...
    pub bankruptcy_price: f64,
    /// ...and health at or below this.
    pub bankruptcy_health: f64,
    /// Regular IPOs fire below this active fraction during growth.
    pub ipo_active_fraction: f64,
    /// Below this active fraction IPOs ignore regime and VIX gating.
    pub emergency_active_fraction: f64,
    /// Regular IPOs pause while VIX is above this level.
    pub ipo_max_vix: Option<f64>,
    /// Per-tick cap on the log-volatility term.
    pub volatility_cap: f64,
    /// Scales `value_score * drift_multiplier`.
    pub drift_scale: f64,
    /// Scales `health - 0.5`.
    pub health_bonus_scale: f64,
    /// Divides entity volatility in the noise amplitude.
    pub volatility_scale: f64,
    /// VIX level at which the noise amplitude is unscaled.
    pub baseline_vix: f64,
    /// Health cost per interest-rate point per tick.
    pub rate_cost: f64,
    /// Health cost per VIX point per tick.
    pub vix_cost: f64,
    /// Gain on the history-window return.
    pub performance_gain: f64,
    pub seeding: SeedingConfig,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            price_floor: 0.10,
            bankruptcy_price: 20.0,
            bankruptcy_health: 0.05,
            ipo_active_fraction: 0.95,
            emergency_active_fraction: 0.1,
            ipo_max_vix: Some(25.0),
            volatility_cap: 0.015,
            drift_scale: 3.5e-6,
            health_bonus_scale: 5e-6,
            volatility_scale: 30.0,
            baseline_vix: 15.0,
            rate_cost: 8e-6,
            vix_cost: 6.5e-7,
            performance_gain: 1e-2,
            seeding: SeedingConfig::default(),
        }
    }
}

/// Distributions used to generate cold-start and IPO entities.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedingConfig {
    pub initial_price_median: f64,
    pub initial_price_sigma: f64,
    pub initial_cap_median: f64,
    pub initial_cap_sigma: f64,
    pub volatility: Band,
    pub value_score: Band,
    pub ipo_price: Band,
    pub ipo_market_cap: f64,
    pub ipo_volatility: Band,
    pub ipo_value_score: Band,
}

impl Default for SeedingConfig {
    fn default() -> Self {
        Self {
            initial_price_median: 100.0,
            initial_price_sigma: 0.4,
            initial_cap_median: 10e9,
            initial_cap_sigma: 0.6,
            volatility: Band::new(0.15, 0.45),
            value_score: Band::new(0.25, 1.0),
            ipo_price: Band::new(80.0, 120.0),
            ipo_market_cap: 1e9,
            ipo_volatility: Band::new(0.40, 0.60),
            ipo_value_score: Band::new(0.4, 0.7),
        }
    }
}

/// Top-level engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed for the single engine RNG.
    pub seed: u64,
    pub clock: ClockConfig,
    pub schedule: ScheduleConfig,
    pub analytics: AnalyticsConfig,
    pub regimes: RegimeConfig,
    #[serde(rename = "macro")]
    pub macro_: MacroConfig,
    pub lifecycle: LifecycleConfig,
}

impl EngineConfig {
    /// Reject any setting the engine cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_clock(&self.clock)?;
        validate_schedule(&self.schedule)?;
        validate_analytics(&self.analytics)?;
        validate_regimes(&self.regimes, self.analytics.cycle_length_ticks)?;
        validate_macro(&self.macro_)?;
        validate_lifecycle(&self.lifecycle)?;
        Ok(())
    }
}

fn positive(field: &'static str, v: u64) -> Result<(), ConfigError> {
    if v == 0 {
        return Err(ConfigError::NonPositive { field });
    }
    Ok(())
}

fn finite(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if !v.is_finite() {
        return Err(ConfigError::NonFinite { field, value: v });
    }
    Ok(())
}

fn positive_f64(field: &'static str, v: f64) -> Result<(), ConfigError> {
    finite(field, v)?;
    if v <= 0.0 {
        return Err(ConfigError::NonPositive { field });
    }
    Ok(())
}

fn probability(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&v) {
        return Err(ConfigError::ProbabilityOutOfRange { field, value: v });
    }
    Ok(())
}

fn band(field: &'static str, b: &Band) -> Result<(), ConfigError> {
    if !b.is_well_formed() {
        return Err(ConfigError::InvalidRange {
            field,
            low: b.low,
            high: b.high,
        });
    }
    Ok(())
}

/// Validate clock pacing.
pub fn validate_clock(c: &ClockConfig) -> Result<(), ConfigError> {
    positive("clock.tick_interval_ms", c.tick_interval_ms)?;
    positive("clock.publish_every_ticks", c.publish_every_ticks)
}

/// Validate the trading duty cycle.
pub fn validate_schedule(s: &ScheduleConfig) -> Result<(), ConfigError> {
    positive("schedule.trading_window_ticks", s.trading_window_ticks)?;
    positive("schedule.closed_window_ticks", s.closed_window_ticks)?;
    band("schedule.gap_magnitude", &s.gap_magnitude)?;
    if s.gap_magnitude.low < 0.0 || s.gap_magnitude.high >= 1.0 {
        return Err(ConfigError::InvalidRange {
            field: "schedule.gap_magnitude",
            low: s.gap_magnitude.low,
            high: s.gap_magnitude.high,
        });
    }
    Ok(())
}

/// Validate cycle partitioning.
pub fn validate_analytics(a: &AnalyticsConfig) -> Result<(), ConfigError> {
    positive("analytics.cycle_length_ticks", a.cycle_length_ticks)?;
    positive("analytics.ticks_per_period", a.ticks_per_period)
}

/// Validate Markov rows, regime profiles and dwell time against the cycle.
pub fn validate_regimes(r: &RegimeConfig, cycle_ticks: u64) -> Result<(), ConfigError> {
    positive("regimes.check_interval_ticks", r.check_interval_ticks)?;
    for regime in Regime::ALL {
        let p = r.profile(regime);
        band("regimes.rate_range", &p.rate_range)?;
        positive_f64("regimes.vix_baseline", p.vix_baseline)?;
        finite("regimes.drift_multiplier", p.drift_multiplier)?;
        finite("regimes.health_regen", p.health_regen)?;
        for (_, prob) in p.transitions.entries() {
            probability("regimes.transitions", prob)?;
        }
        let sum = p.transitions.sum();
        if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
            return Err(ConfigError::RowSum { regime, sum });
        }
        let dwell_ticks = match p.expected_dwell_checks(regime) {
            Some(checks) => checks * r.check_interval_ticks as f64,
            None => f64::INFINITY,
        };
        if dwell_ticks > MAX_DWELL_CYCLE_FRACTION * cycle_ticks as f64 {
            return Err(ConfigError::RegimeLockIn {
                regime,
                dwell_ticks,
                cycle_ticks,
            });
        }
    }
    Ok(())
}

/// Validate macro dynamics.
pub fn validate_macro(m: &MacroConfig) -> Result<(), ConfigError> {
    finite("macro.initial_rate", m.initial_rate)?;
    positive_f64("macro.vix_floor", m.vix_floor)?;
    finite("macro.initial_vix", m.initial_vix)?;
    if m.initial_vix < m.vix_floor {
        return Err(ConfigError::InvalidRange {
            field: "macro.initial_vix",
            low: m.vix_floor,
            high: m.initial_vix,
        });
    }
    probability("macro.rate_approach", m.rate_approach)?;
    probability("macro.vix_decay", m.vix_decay)?;
    finite("macro.rate_noise", m.rate_noise)?;
    finite("macro.vix_noise", m.vix_noise)?;
    probability("macro.common_spike_probability", m.common_spike_probability)?;
    probability("macro.rare_spike_probability", m.rare_spike_probability)?;
    if m.common_spike_probability + m.rare_spike_probability > 1.0 {
        return Err(ConfigError::ProbabilityOutOfRange {
            field: "macro.spike_probabilities",
            value: m.common_spike_probability + m.rare_spike_probability,
        });
    }
    band("macro.common_spike", &m.common_spike)?;
    band("macro.rare_spike", &m.rare_spike)?;
    if m.common_spike.low < 0.0 || m.rare_spike.low < 0.0 {
        return Err(ConfigError::InvalidRange {
            field: "macro.spikes",
            low: m.common_spike.low.min(m.rare_spike.low),
            high: m.rare_spike.high,
        });
    }
    Ok(())
}

/// Validate lifecycle thresholds and seeding distributions.
pub fn validate_lifecycle(l: &LifecycleConfig) -> Result<(), ConfigError> {
    positive("lifecycle.population_size", l.population_size as u64)?;
    positive_f64("lifecycle.price_floor", l.price_floor)?;
    finite("lifecycle.bankruptcy_price", l.bankruptcy_price)?;
    if l.bankruptcy_price <= l.price_floor {
        return Err(ConfigError::UnreachableBankruptcy {
            price_floor: l.price_floor,
            bankruptcy_price: l.bankruptcy_price,
        });
    }
    finite("lifecycle.bankruptcy_health", l.bankruptcy_health)?;
    probability("lifecycle.ipo_active_fraction", l.ipo_active_fraction)?;
    probability(
        "lifecycle.emergency_active_fraction",
        l.emergency_active_fraction,
    )?;
    if l.emergency_active_fraction > l.ipo_active_fraction {
        return Err(ConfigError::InvalidRange {
            field: "lifecycle.active_fractions",
            low: l.emergency_active_fraction,
            high: l.ipo_active_fraction,
        });
    }
    if let Some(vix) = l.ipo_max_vix {
        positive_f64("lifecycle.ipo_max_vix", vix)?;
    }
    positive_f64("lifecycle.volatility_cap", l.volatility_cap)?;
    finite("lifecycle.drift_scale", l.drift_scale)?;
    finite("lifecycle.health_bonus_scale", l.health_bonus_scale)?;
    positive_f64("lifecycle.volatility_scale", l.volatility_scale)?;
    positive_f64("lifecycle.baseline_vix", l.baseline_vix)?;
    finite("lifecycle.rate_cost", l.rate_cost)?;
    finite("lifecycle.vix_cost", l.vix_cost)?;
    finite("lifecycle.performance_gain", l.performance_gain)?;
    validate_seeding(&l.seeding)
}

/// Validate entity generation parameters.
pub fn validate_seeding(s: &SeedingConfig) -> Result<(), ConfigError> {
    positive_f64("seeding.initial_price_median", s.initial_price_median)?;
    positive_f64("seeding.initial_cap_median", s.initial_cap_median)?;
    positive_f64("seeding.ipo_market_cap", s.ipo_market_cap)?;
    for (field, sigma) in [
        ("seeding.initial_price_sigma", s.initial_price_sigma),
        ("seeding.initial_cap_sigma", s.initial_cap_sigma),
    ] {
        finite(field, sigma)?;
        if sigma < 0.0 {
            return Err(ConfigError::Distribution {
                field,
                reason: format!("sigma {sigma} is negative"),
            });
        }
    }
    for (field, b) in [
        ("seeding.volatility", &s.volatility),
        ("seeding.ipo_volatility", &s.ipo_volatility),
        ("seeding.ipo_price", &s.ipo_price),
    ] {
        band(field, b)?;
        if b.low <= 0.0 {
            return Err(ConfigError::InvalidRange {
                field,
                low: b.low,
                high: b.high,
            });
        }
    }
    for (field, b) in [
        ("seeding.value_score", &s.value_score),
        ("seeding.ipo_value_score", &s.ipo_value_score),
    ] {
        band(field, b)?;
        if b.low <= 0.0 || b.high > 1.0 {
            return Err(ConfigError::InvalidRange {
                field,
                low: b.low,
                high: b.high,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn defaults_are_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn default_rows_sum_to_one() {
        let cfg = RegimeConfig::default();
        for regime in Regime::ALL {
            let sum = cfg.profile(regime).transitions.sum();
            assert!((sum - 1.0).abs() <= ROW_SUM_TOLERANCE, "{regime:?} sums to {sum}");
        }
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.clock.tick_interval_ms = 0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NonPositive {
                field: "clock.tick_interval_ms"
            })
        );
    }

    #[test]
    fn unbalanced_row_is_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.regimes.stagnation.transitions = TransitionRow::new(0.5, 0.4, 0.0, 0.0);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RowSum {
                regime: Regime::Stagnation,
                ..
            })
        ));
    }

    #[test]
    fn sticky_regime_is_rejected_as_lock_in() {
        let mut cfg = EngineConfig::default();
        cfg.regimes.growth.transitions = TransitionRow::new(0.999, 0.001, 0.0, 0.0);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RegimeLockIn {
                regime: Regime::Growth,
                ..
            })
        ));
        cfg.regimes.growth.transitions = TransitionRow::new(1.0, 0.0, 0.0, 0.0);
        assert!(matches!(cfg.validate(), Err(ConfigError::RegimeLockIn { .. })));
    }

    #[test]
    fn inverted_rate_range_is_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.regimes.crisis.rate_range = Band::new(5.5, 4.0);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidRange { .. })
        ));
    }

    #[test]
    fn bankruptcy_below_floor_is_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.lifecycle.bankruptcy_price = 0.05;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::UnreachableBankruptcy { .. })
        ));
    }

    #[test]
    fn partial_yaml_overrides_only_named_fields() {
        let yaml = "seed: 9\nclock:\n  tick_interval_ms: 250\nlifecycle:\n  population_size: 40\n";
        let cfg: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.seed, 9);
        assert_eq!(cfg.clock.tick_interval_ms, 250);
        assert_eq!(cfg.clock.publish_every_ticks, 2);
        assert_eq!(cfg.lifecycle.population_size, 40);
        assert_eq!(cfg.lifecycle.price_floor, 0.10);
        assert_eq!(cfg.analytics.cycle_length_ticks, 7300);
        cfg.validate().unwrap();
    }

    proptest! {
        #[test]
        fn out_of_range_probabilities_are_rejected(p in 1.0001f64..10.0) {
            let mut cfg = EngineConfig::default();
            cfg.macro_.rare_spike_probability = p;
            prop_assert!(cfg.validate().is_err());
        }

        #[test]
        fn normalized_rows_validate(a in 0.01f64..1.0, b in 0.01f64..1.0, c in 0.01f64..1.0, d in 0.01f64..1.0) {
            let total = a + b + c + d;
            let mut cfg = EngineConfig::default();
            cfg.regimes.contraction.transitions = TransitionRow::new(a / total, b / total, c / total, d / total);
            prop_assert!(cfg.validate().is_ok());
        }
    }
}
