//! Markov chain over macro regimes.

use market_core::{Regime, RegimeConfig, TransitionRow};
use rand::Rng;
use serde::Serialize;
use tracing::info;

/// A regime change produced by a transition check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RegimeTransition {
    pub from: Regime,
    pub to: Regime,
}

/// Owns the current regime and draws a transition every `check_interval` ticks.
#[derive(Clone, Debug)]
pub struct RegimeModel {
    current: Regime,
    rows: [TransitionRow; 4],
    check_interval: u64,
    ticks_since_check: u64,
}

impl RegimeModel {
    pub fn new(initial: Regime, rows: [TransitionRow; 4], check_interval: u64) -> Self {
        Self {
            current: initial,
            rows,
            check_interval: check_interval.max(1),
            ticks_since_check: 0,
        }
    }

    pub fn from_config(cfg: &RegimeConfig) -> Self {
        let rows = Regime::ALL.map(|r| cfg.profile(r).transitions);
        Self::new(cfg.initial, rows, cfg.check_interval_ticks)
    }

    pub fn current(&self) -> Regime {
        self.current
    }

    /// Called once per tick. Draws only on check ticks; a self-transition
    /// returns `None`.
    pub fn maybe_transition<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<RegimeTransition> {
        self.ticks_since_check += 1;
        if self.ticks_since_check < self.check_interval {
            return None;
        }
        self.ticks_since_check = 0;

        let from = self.current;
        let to = sample_row(&self.rows[from.index()], rng.gen::<f64>()).unwrap_or(from);
        if to == from {
            return None;
        }
        self.current = to;
        info!(from = ?from, to = ?to, label = to.label(), "regime shift");
        Some(RegimeTransition { from, to })
    }
}

/// First regime whose cumulative probability exceeds `r`.
fn sample_row(row: &TransitionRow, r: f64) -> Option<Regime> {
    let mut cumulative = 0.0;
    for (regime, p) in row.entries() {
        cumulative += p;
        if cumulative > r {
            return Some(regime);
        }
    }
    None
}
