//! Simulated companies and their rolling price history.

use crate::sector::{Sector, SubIndustry};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Number of prices retained per entity.
pub const HISTORY_CAPACITY: usize = 60;

/// Upper bound of the health scalar.
pub const HEALTH_MAX: f64 = 1.2;

/// Health assigned to every freshly created entity.
pub const HEALTH_INITIAL: f64 = 1.0;

/// Monotonic entity identifier. Never reused, even when a slot is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stock-{}", self.0)
    }
}

/// Lifecycle status. `Active -> Bankrupt` is one-way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    Active,
    Bankrupt,
}

/// Fixed-capacity price buffer ordered oldest to newest.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceHistory {
    prices: VecDeque<f64>,
}

impl PriceHistory {
    /// History holding a single initial price.
    pub fn starting_at(price: f64) -> Self {
        let mut prices = VecDeque::with_capacity(HISTORY_CAPACITY);
        prices.push_back(price);
        Self { prices }
    }

    /// Append a price, evicting the oldest once full.
    pub fn push(&mut self, price: f64) {
        if self.prices.len() == HISTORY_CAPACITY {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn oldest(&self) -> Option<f64> {
        self.prices.front().copied()
    }

    pub fn latest(&self) -> Option<f64> {
        self.prices.back().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.prices.iter().copied().collect()
    }
}

/// A simulated company occupying one population slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    /// Sector-coded symbol, unique among occupied slots.
    pub ticker: String,
    pub name: String,
    pub sector: Sector,
    pub sub_industry: SubIndustry,
    /// Strictly positive while active; zero once bankrupt.
    pub price: f64,
    /// Fixed at creation.
    pub shares_outstanding: f64,
    /// `price * shares_outstanding`, refreshed every tick.
    pub market_cap: f64,
    /// Relative noise level fixed at creation.
    pub volatility: f64,
    /// Growth bias in (0, 1].
    pub value_score: f64,
    /// Vitality in [0, HEALTH_MAX].
    pub health: f64,
    pub history: PriceHistory,
    pub status: EntityStatus,
    /// Ticks survived since creation.
    pub age_ticks: u64,
}

impl Entity {
    pub fn is_active(&self) -> bool {
        self.status == EntityStatus::Active
    }

    /// Recompute the derived market cap from price and share count.
    pub fn refresh_market_cap(&mut self) {
        self.market_cap = self.price * self.shares_outstanding;
    }

    /// Freeze the slot: zero price and market cap, no further updates.
    pub fn declare_bankrupt(&mut self) {
        self.status = EntityStatus::Bankrupt;
        self.price = 0.0;
        self.market_cap = 0.0;
    }

    /// Simple return over the retained history, or `None` when the oldest
    /// sample is not a usable baseline.
    pub fn history_return(&self) -> Option<f64> {
        let base = self.history.oldest()?;
        if !(base.is_finite() && base > 0.0) {
            return None;
        }
        Some(self.price / base - 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_entity() -> Entity {
        Entity {
            id: EntityId(7),
            ticker: "TAB".to_string(),
            name: "Cloud Corp".to_string(),
            sector: Sector::Technology,
            sub_industry: SubIndustry::Cloud,
            price: 100.0,
            shares_outstanding: 1_000.0,
            market_cap: 100_000.0,
            volatility: 0.3,
            value_score: 0.5,
            health: HEALTH_INITIAL,
            history: PriceHistory::starting_at(100.0),
            status: EntityStatus::Active,
            age_ticks: 0,
        }
    }

    #[test]
    fn bankruptcy_zeroes_price_and_cap() {
        let mut e = sample_entity();
        e.declare_bankrupt();
        assert!(!e.is_active());
        assert_eq!(e.price, 0.0);
        assert_eq!(e.market_cap, 0.0);
    }

    #[test]
    fn history_return_guards_zero_baseline() {
        let mut e = sample_entity();
        e.price = 110.0;
        assert!((e.history_return().unwrap() - 0.1).abs() < 1e-12);
        e.history = PriceHistory::starting_at(0.0);
        assert_eq!(e.history_return(), None);
        e.history = PriceHistory::default();
        assert_eq!(e.history_return(), None);
    }

    #[test]
    fn history_is_ordered_oldest_first() {
        let mut h = PriceHistory::starting_at(1.0);
        for p in 2..=5 {
            h.push(p as f64);
        }
        assert_eq!(h.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!((h.oldest(), h.latest()), (Some(1.0), Some(5.0)));
        assert_eq!(EntityId(3).to_string(), "stock-3");
    }

    proptest! {
        #[test]
        fn history_never_exceeds_capacity(pushes in 0usize..300) {
            let mut h = PriceHistory::starting_at(1.0);
            for i in 0..pushes {
                h.push(i as f64);
            }
            prop_assert_eq!(h.len(), (pushes + 1).min(HISTORY_CAPACITY));
            prop_assert_eq!(h.latest(), Some(if pushes == 0 { 1.0 } else { (pushes - 1) as f64 }));
        }
    }
}
