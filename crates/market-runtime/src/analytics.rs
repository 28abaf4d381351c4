//! Fixed-length cycle aggregation over the tick stream.

use market_core::{AnalyticsConfig, Regime};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::info;

/// Trailing windows, in periods, for market-cap returns.
pub const RETURN_WINDOWS: [u64; 3] = [60, 180, 365];

/// Everything analytics needs from one completed tick.
#[derive(Clone, Copy, Debug)]
pub struct TickObservation {
    pub tick: u64,
    pub regime: Regime,
    pub regime_changed: bool,
    pub vix: f64,
    pub interest_rate: f64,
    pub active_count: usize,
    pub total_market_cap: f64,
    pub ipos: u32,
    pub bankruptcies: u32,
}

/// Ticks spent in each regime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RegimeTicks {
    pub growth: u64,
    pub stagnation: u64,
    pub contraction: u64,
    pub crisis: u64,
}

impl RegimeTicks {
    fn add(&mut self, regime: Regime) {
        match regime {
            Regime::Growth => self.growth += 1,
            Regime::Stagnation => self.stagnation += 1,
            Regime::Contraction => self.contraction += 1,
            Regime::Crisis => self.crisis += 1,
        }
    }

    pub fn get(&self, regime: Regime) -> u64 {
        match regime {
            Regime::Growth => self.growth,
            Regime::Stagnation => self.stagnation,
            Regime::Contraction => self.contraction,
            Regime::Crisis => self.crisis,
        }
    }

    /// Whole periods per regime.
    pub fn periods(&self, ticks_per_period: u64) -> RegimeTicks {
        let p = ticks_per_period.max(1);
        RegimeTicks {
            growth: self.growth / p,
            stagnation: self.stagnation / p,
            contraction: self.contraction / p,
            crisis: self.crisis / p,
        }
    }
}

/// Min / median / max of a sampled series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Spread {
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

impl Spread {
    /// Spread of samples already in ascending order.
    fn of_sorted(sorted: &[f64]) -> Option<Spread> {
        let (&min, &max) = (sorted.first()?, sorted.last()?);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        Some(Spread { min, median, max })
    }
}

/// Samples kept in ascending order as they arrive, so reading a spread never
/// sorts.
#[derive(Clone, Debug, Default)]
struct SortedSamples {
    values: Vec<f64>,
}

impl SortedSamples {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    fn insert(&mut self, value: f64) {
        let at = self.values.partition_point(|x| x.total_cmp(&value).is_le());
        self.values.insert(at, value);
    }

    fn spread(&self) -> Option<Spread> {
        Spread::of_sorted(&self.values)
    }
}

/// Trailing market-cap returns in percent. `None` means insufficient data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct TrailingReturns {
    pub p60: Option<f64>,
    pub p180: Option<f64>,
    pub p365: Option<f64>,
}

/// Statistics for one cycle, complete or in progress.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CycleRecord {
    pub cycle_number: u64,
    pub start_tick: u64,
    pub end_tick: u64,
    pub is_complete: bool,
    pub ticks: u64,
    pub ipo_count: u64,
    pub bankruptcy_count: u64,
    pub regime_transitions: u64,
    pub min_active: usize,
    pub avg_active: f64,
    pub max_active: usize,
    pub vix: Option<Spread>,
    pub interest_rate: Option<Spread>,
    pub returns: TrailingReturns,
    pub regime_ticks: RegimeTicks,
    pub regime_periods: RegimeTicks,
}

/// Aggregate view across all cycles.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total_completed_cycles: usize,
    pub total_ipos: u64,
    pub total_bankruptcies: u64,
    pub avg_active: f64,
    pub current_cycle_ticks: u64,
    pub current_cycle_progress_pct: f64,
}

/// Completed cycles, the partial current one, and a summary.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub completed: Vec<CycleRecord>,
    pub current: CycleRecord,
    pub summary: AnalyticsSummary,
}

/// Mutable accumulator for the open cycle.
#[derive(Clone, Debug)]
struct CycleAccumulator {
    number: u64,
    start_tick: u64,
    ticks: u64,
    ipos: u64,
    bankruptcies: u64,
    transitions: u64,
    min_active: usize,
    max_active: usize,
    active_sum: u64,
    vix: SortedSamples,
    rates: SortedSamples,
    regime_ticks: RegimeTicks,
}

impl CycleAccumulator {
    fn open(number: u64, start_tick: u64, expected_ticks: usize) -> Self {
        Self {
            number,
            start_tick,
            ticks: 0,
            ipos: 0,
            bankruptcies: 0,
            transitions: 0,
            min_active: usize::MAX,
            max_active: 0,
            active_sum: 0,
            vix: SortedSamples::with_capacity(expected_ticks),
            rates: SortedSamples::with_capacity(expected_ticks),
            regime_ticks: RegimeTicks::default(),
        }
    }

    fn observe(&mut self, obs: &TickObservation) {
        self.ticks += 1;
        self.ipos += u64::from(obs.ipos);
        self.bankruptcies += u64::from(obs.bankruptcies);
        if obs.regime_changed {
            self.transitions += 1;
        }
        self.min_active = self.min_active.min(obs.active_count);
        self.max_active = self.max_active.max(obs.active_count);
        self.active_sum += obs.active_count as u64;
        self.vix.insert(obs.vix);
        self.rates.insert(obs.interest_rate);
        self.regime_ticks.add(obs.regime);
    }

    fn avg_active(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.active_sum as f64 / self.ticks as f64
        }
    }

    fn record(
        &self,
        end_tick: u64,
        is_complete: bool,
        returns: TrailingReturns,
        ticks_per_period: u64,
    ) -> CycleRecord {
        let (min_active, max_active) = if self.ticks == 0 {
            (0, 0)
        } else {
            (self.min_active, self.max_active)
        };
        CycleRecord {
            cycle_number: self.number,
            start_tick: self.start_tick,
            end_tick,
            is_complete,
            ticks: self.ticks,
            ipo_count: self.ipos,
            bankruptcy_count: self.bankruptcies,
            regime_transitions: self.transitions,
            min_active,
            avg_active: self.avg_active(),
            max_active,
            vix: self.vix.spread(),
            interest_rate: self.rates.spread(),
            returns,
            regime_ticks: self.regime_ticks,
            regime_periods: self.regime_ticks.periods(ticks_per_period),
        }
    }
}

/// Partitions ticks into cycles of `cycle_length_ticks` and tracks trailing
/// market-cap returns over a rolling per-tick buffer.
#[derive(Clone, Debug)]
pub struct CycleAnalytics {
    cycle_length: u64,
    ticks_per_period: u64,
    caps: VecDeque<f64>,
    cap_capacity: usize,
    last_tick: u64,
    current: CycleAccumulator,
    completed: Vec<CycleRecord>,
}

impl CycleAnalytics {
    /// `initial_market_cap` is the tick-0 sample, so the longest window is
    /// available exactly when enough ticks have elapsed.
    pub fn new(cfg: &AnalyticsConfig, initial_market_cap: f64) -> Self {
        let ticks_per_period = cfg.ticks_per_period.max(1);
        let longest = RETURN_WINDOWS[RETURN_WINDOWS.len() - 1];
        let cap_capacity = (longest * ticks_per_period + 1) as usize;
        let mut caps = VecDeque::with_capacity(cap_capacity);
        caps.push_back(initial_market_cap);
        Self {
            cycle_length: cfg.cycle_length_ticks.max(1),
            ticks_per_period,
            caps,
            cap_capacity,
            last_tick: 0,
            current: CycleAccumulator::open(1, 0, cfg.cycle_length_ticks as usize),
            completed: Vec::new(),
        }
    }

    pub fn completed(&self) -> &[CycleRecord] {
        &self.completed
    }

    /// Fold one tick in. Returns the record of a cycle closed by this tick.
    pub fn record(&mut self, obs: &TickObservation) -> Option<CycleRecord> {
        if self.caps.len() == self.cap_capacity {
            self.caps.pop_front();
        }
        self.caps.push_back(obs.total_market_cap);
        self.last_tick = obs.tick;
        self.current.observe(obs);

        if obs.tick - self.current.start_tick < self.cycle_length {
            return None;
        }
        let record = self
            .current
            .record(obs.tick, true, self.trailing_returns(), self.ticks_per_period);
        info!(
            cycle = record.cycle_number,
            start = record.start_tick,
            end = record.end_tick,
            return_365 = ?record.returns.p365,
            ipos = record.ipo_count,
            bankruptcies = record.bankruptcy_count,
            "cycle closed"
        );
        self.current = CycleAccumulator::open(
            record.cycle_number + 1,
            obs.tick,
            self.cycle_length as usize,
        );
        self.completed.push(record.clone());
        Some(record)
    }

    /// Percent return of the latest cap against the cap `periods` back.
    pub fn trailing_return(&self, periods: u64) -> Option<f64> {
        let lag = (periods * self.ticks_per_period) as usize;
        let latest_index = self.caps.len().checked_sub(1)?;
        let past_index = latest_index.checked_sub(lag)?;
        let past = self.caps[past_index];
        let latest = self.caps[latest_index];
        if !(past.is_finite() && past > 0.0 && latest.is_finite()) {
            return None;
        }
        Some((latest / past - 1.0) * 100.0)
    }

    pub fn trailing_returns(&self) -> TrailingReturns {
        TrailingReturns {
            p60: self.trailing_return(RETURN_WINDOWS[0]),
            p180: self.trailing_return(RETURN_WINDOWS[1]),
            p365: self.trailing_return(RETURN_WINDOWS[2]),
        }
    }

    /// The open cycle as of the latest tick.
    pub fn current(&self) -> CycleRecord {
        self.current
            .record(self.last_tick, false, self.trailing_returns(), self.ticks_per_period)
    }

    pub fn summary(&self) -> AnalyticsSummary {
        let current_ticks = self.current.ticks;
        let mut avgs: Vec<f64> = self.completed.iter().map(|c| c.avg_active).collect();
        if current_ticks > 0 {
            avgs.push(self.current.avg_active());
        }
        let avg_active = if avgs.is_empty() {
            0.0
        } else {
            avgs.iter().sum::<f64>() / avgs.len() as f64
        };
        AnalyticsSummary {
            total_completed_cycles: self.completed.len(),
            total_ipos: self.completed.iter().map(|c| c.ipo_count).sum::<u64>() + self.current.ipos,
            total_bankruptcies: self
                .completed
                .iter()
                .map(|c| c.bankruptcy_count)
                .sum::<u64>()
                + self.current.bankruptcies,
            avg_active,
            current_cycle_ticks: current_ticks,
            current_cycle_progress_pct: current_ticks as f64 / self.cycle_length as f64 * 100.0,
        }
    }

    pub fn report(&self) -> AnalyticsReport {
        AnalyticsReport {
            completed: self.completed.clone(),
            current: self.current(),
            summary: self.summary(),
        }
    }
}
