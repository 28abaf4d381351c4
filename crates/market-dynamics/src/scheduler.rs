//! Open/closed trading duty cycle.

use market_core::{Band, MarketPhase, ScheduleConfig};
use rand::Rng;
use serde::Serialize;

/// Phase boundary crossed during [`TradingScheduler::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PhaseChange {
    Closed,
    /// Overnight gap is due.
    Opened,
}

#[derive(Clone, Debug)]
pub struct TradingScheduler {
    phase: MarketPhase,
    ticks_in_phase: u64,
    trading_window: u64,
    closed_window: u64,
    gap: Band,
}

impl TradingScheduler {
    /// Starts OPEN with no elapsed ticks.
    pub fn new(cfg: &ScheduleConfig) -> Self {
        Self {
            phase: MarketPhase::Open,
            ticks_in_phase: 0,
            trading_window: cfg.trading_window_ticks.max(1),
            closed_window: cfg.closed_window_ticks.max(1),
            gap: cfg.gap_magnitude,
        }
    }

    pub fn phase(&self) -> MarketPhase {
        self.phase
    }

    pub fn ticks_in_phase(&self) -> u64 {
        self.ticks_in_phase
    }

    pub fn trading_window(&self) -> u64 {
        self.trading_window
    }

    pub fn closed_window(&self) -> u64 {
        self.closed_window
    }

    pub fn advance(&mut self) -> Option<PhaseChange> {
        self.ticks_in_phase += 1;
        match self.phase {
            MarketPhase::Open if self.ticks_in_phase >= self.trading_window => {
                self.phase = MarketPhase::Closed;
                self.ticks_in_phase = 0;
                Some(PhaseChange::Closed)
            }
            MarketPhase::Closed if self.ticks_in_phase >= self.closed_window => {
                self.phase = MarketPhase::Open;
                self.ticks_in_phase = 0;
                Some(PhaseChange::Opened)
            }
            _ => None,
        }
    }

    /// Signed multiplicative gap for one entity.
    pub fn draw_gap<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let magnitude = self.gap.lerp(rng.gen());
        if rng.gen_bool(0.5) {
            magnitude
        } else {
            -magnitude
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn alternates_between_windows_forever() {
        let mut s = TradingScheduler::new(&ScheduleConfig::default());
        assert_eq!(s.phase(), MarketPhase::Open);
        let mut changes = Vec::new();
        for tick in 1..=60u64 {
            if let Some(c) = s.advance() {
                changes.push((tick, c));
            }
        }
        assert_eq!(
            changes,
            vec![
                (12, PhaseChange::Closed),
                (20, PhaseChange::Opened),
                (32, PhaseChange::Closed),
                (40, PhaseChange::Opened),
                (52, PhaseChange::Closed),
                (60, PhaseChange::Opened),
            ]
        );
    }

    #[test]
    fn gap_magnitude_within_band() {
        let s = TradingScheduler::new(&ScheduleConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let (mut up, mut down) = (0, 0);
        for _ in 0..1000 {
            let g = s.draw_gap(&mut rng);
            assert!((0.005..=0.02).contains(&g.abs()));
            if g > 0.0 {
                up += 1;
            } else {
                down += 1;
            }
        }
        assert!(up > 300 && down > 300);
    }
}
