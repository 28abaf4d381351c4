//! Macro regimes and their parameter profiles.

use serde::{Deserialize, Serialize};

/// Global macro "weather" shared by every entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    /// Expansion.
    Growth,
    /// Sideways market.
    Stagnation,
    /// Correction.
    Contraction,
    /// Bear market.
    Crisis,
}

impl Regime {
    /// All regimes in transition-row order.
    pub const ALL: [Regime; 4] = [
        Regime::Growth,
        Regime::Stagnation,
        Regime::Contraction,
        Regime::Crisis,
    ];

    /// Position of this regime in [`Regime::ALL`].
    pub fn index(self) -> usize {
        match self {
            Regime::Growth => 0,
            Regime::Stagnation => 1,
            Regime::Contraction => 2,
            Regime::Crisis => 3,
        }
    }

    /// Human-facing label used in event messages.
    pub fn label(self) -> &'static str {
        match self {
            Regime::Growth => "Bull Market",
            Regime::Stagnation => "Sideways Market",
            Regime::Contraction => "Correction",
            Regime::Crisis => "Bear Market",
        }
    }
}

/// Closed numeric interval `[low, high]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }

    /// Linear interpolation; `t` in [0, 1] maps onto the band.
    pub fn lerp(&self, t: f64) -> f64 {
        self.low + (self.high - self.low) * t
    }

    /// Finite with `low <= high`.
    pub fn is_well_formed(&self) -> bool {
        self.low.is_finite() && self.high.is_finite() && self.low <= self.high
    }
}

/// Outgoing transition probabilities from one regime.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionRow {
    pub growth: f64,
    pub stagnation: f64,
    pub contraction: f64,
    pub crisis: f64,
}

impl TransitionRow {
    pub const fn new(growth: f64, stagnation: f64, contraction: f64, crisis: f64) -> Self {
        Self {
            growth,
            stagnation,
            contraction,
            crisis,
        }
    }

    /// Probability of moving to `to`.
    pub fn probability(&self, to: Regime) -> f64 {
        match to {
            Regime::Growth => self.growth,
            Regime::Stagnation => self.stagnation,
            Regime::Contraction => self.contraction,
            Regime::Crisis => self.crisis,
        }
    }

    /// `(target, probability)` pairs in [`Regime::ALL`] order.
    pub fn entries(&self) -> [(Regime, f64); 4] {
        Regime::ALL.map(|r| (r, self.probability(r)))
    }

    pub fn sum(&self) -> f64 {
        self.growth + self.stagnation + self.contraction + self.crisis
    }
}

/// Everything a regime contributes to macro and entity dynamics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegimeProfile {
    /// Interest-rate target range (percent); the rate chases its midpoint.
    pub rate_range: Band,
    /// VIX level the index mean-reverts to.
    pub vix_baseline: f64,
    /// Multiplier on the value-score drift term. Negative in downturns.
    pub drift_multiplier: f64,
    /// Per-tick additive health bias.
    pub health_regen: f64,
    /// Markov row used on transition checks.
    pub transitions: TransitionRow,
}

impl RegimeProfile {
    /// Expected number of transition checks spent in this regime per visit.
    /// `None` for an absorbing regime.
    pub fn expected_dwell_checks(&self, own: Regime) -> Option<f64> {
        let leave = 1.0 - self.transitions.probability(own);
        if leave <= 0.0 {
            None
        } else {
            Some(1.0 / leave)
        }
    }
}
