//! Full-cycle runs against the public engine API.

use market_core::{EngineConfig, Regime, HEALTH_MAX, HISTORY_CAPACITY};
use market_runtime::MarketEngine;

fn engine(seed: u64, population: usize) -> MarketEngine {
    let mut cfg = EngineConfig::default();
    cfg.seed = seed;
    cfg.lifecycle.population_size = population;
    MarketEngine::new(cfg).unwrap()
}

#[test]
fn one_cycle_closes_after_exactly_7300_ticks() {
    let mut e = engine(2024, 100);
    assert_eq!(e.regime(), Regime::Growth);
    let closed = e.run_ticks(7299);
    assert!(closed.is_empty());
    assert!(e.analytics().completed().is_empty());

    e.step();
    let completed = e.analytics().completed();
    assert_eq!(completed.len(), 1);
    let cycle = &completed[0];
    assert_eq!(cycle.end_tick - cycle.start_tick, 7300);
    assert!(cycle.is_complete);
    assert!(cycle.returns.p365.is_some());
    let regime_ticks: u64 = Regime::ALL.iter().map(|r| cycle.regime_ticks.get(*r)).sum();
    assert_eq!(regime_ticks, 7300);
    assert_eq!(e.analytics().summary().total_completed_cycles, 1);
}

#[test]
fn invariants_hold_every_tick_for_a_full_cycle() {
    let mut e = engine(77, 100);
    let size = e.population().len();
    for _ in 0..7300 {
        e.step();
        let pop = e.population();
        assert_eq!(pop.len(), size);
        for s in pop.slots() {
            assert!((0.0..=HEALTH_MAX).contains(&s.health), "health {}", s.health);
            assert!(s.history.len() <= HISTORY_CAPACITY);
            if s.is_active() {
                assert!(s.price >= 0.10, "price {}", s.price);
                assert_eq!(
                    s.history.len() as u64,
                    (s.age_ticks + 1).min(HISTORY_CAPACITY as u64)
                );
            } else {
                assert_eq!(s.price, 0.0);
                assert_eq!(s.market_cap, 0.0);
            }
        }
        assert!(e.macro_state().vix >= 10.0);
        assert!(e.events().len() <= 5);
    }
}

#[test]
fn calibrated_cycle_returns_stay_in_band() {
    let returns: Vec<f64> = (1..=10u64)
        .map(|seed| {
            let mut e = engine(seed, 200);
            let closed = e.run_ticks(7300);
            assert_eq!(closed.len(), 1);
            closed[0].returns.p365.unwrap()
        })
        .collect();
    for r in &returns {
        assert!(*r < 60.0, "cycle return {r:.2}% above sanity ceiling");
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    assert!(
        (5.0..=15.0).contains(&mean),
        "mean cycle return {mean:.2}% outside band, cycles: {returns:?}"
    );
}

#[test]
fn default_population_fails_and_relists_on_its_own() {
    let mut ipos = 0;
    for seed in 1..=3u64 {
        let mut e = engine(seed, 100);
        let closed = e.run_ticks(4 * 7300);
        assert_eq!(closed.len(), 4);
        let summary = e.analytics().summary();
        assert!(
            summary.total_bankruptcies > 0,
            "seed {seed}: no bankruptcies in four cycles"
        );
        let per_cycle: u64 = closed.iter().map(|c| c.bankruptcy_count).sum();
        assert_eq!(per_cycle, summary.total_bankruptcies);
        assert!(e.population().active_count() >= 10);
        ipos += summary.total_ipos;
    }
    assert!(ipos > 0, "no replacement listings across seeds");
}

#[test]
fn replay_is_bit_identical() {
    let run = |seed| {
        let mut e = engine(seed, 50);
        e.run_ticks(1500);
        serde_json::to_string(&e.snapshot()).unwrap()
    };
    assert_eq!(run(31), run(31));
}
