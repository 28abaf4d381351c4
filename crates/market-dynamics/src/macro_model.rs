//! Interest-rate and VIX dynamics.

use market_core::{MacroConfig, MacroState, RegimeProfile};
use rand::Rng;
use tracing::debug;

/// Mean-reverting macro scalars with upward-only VIX spikes.
#[derive(Clone, Debug)]
pub struct MacroModel {
    cfg: MacroConfig,
    state: MacroState,
}

impl MacroModel {
    pub fn new(cfg: MacroConfig) -> Self {
        let state = MacroState {
            interest_rate: cfg.initial_rate,
            vix: cfg.initial_vix.max(cfg.vix_floor),
        };
        Self { cfg, state }
    }

    pub fn with_state(cfg: MacroConfig, state: MacroState) -> Self {
        Self { cfg, state }
    }

    pub fn state(&self) -> MacroState {
        self.state
    }

    /// Advance one tick toward the regime's targets.
    pub fn update<R: Rng + ?Sized>(&mut self, profile: &RegimeProfile, rng: &mut R) -> MacroState {
        let target = profile.rate_range.midpoint();
        let rate_noise = (rng.gen::<f64>() - 0.5) * self.cfg.rate_noise;
        self.state.interest_rate +=
            (target - self.state.interest_rate) * self.cfg.rate_approach + rate_noise;

        let spike = self.spike(rng);
        let vix_noise = (rng.gen::<f64>() - 0.5) * self.cfg.vix_noise;
        let reverted = self.state.vix - (self.state.vix - profile.vix_baseline) * self.cfg.vix_decay;
        // Floor applies after every adjustment, spikes included.
        self.state.vix = (reverted + spike + vix_noise).max(self.cfg.vix_floor);
        self.state
    }

    fn spike<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let cfg = &self.cfg;
        let u = rng.gen::<f64>();
        if u < cfg.rare_spike_probability {
            let jump = cfg.rare_spike.lerp(rng.gen());
            debug!(jump, "rare volatility spike");
            jump
        } else if u < cfg.rare_spike_probability + cfg.common_spike_probability {
            cfg.common_spike.lerp(rng.gen())
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::{Regime, RegimeConfig};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn rate_converges_toward_regime_midpoint() {
        let regimes = RegimeConfig::default();
        let crisis = regimes.profile(Regime::Crisis);
        let mut model = MacroModel::new(MacroConfig::default());
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..400 {
            model.update(crisis, &mut rng);
        }
        let rate = model.state().interest_rate;
        assert!((rate - crisis.rate_range.midpoint()).abs() < 0.5, "rate {rate}");
    }

    #[test]
    fn vix_reverts_after_spike() {
        let regimes = RegimeConfig::default();
        let growth = regimes.profile(Regime::Growth);
        let mut cfg = MacroConfig::default();
        cfg.common_spike_probability = 0.0;
        cfg.rare_spike_probability = 0.0;
        let mut model = MacroModel::with_state(
            cfg,
            MacroState {
                interest_rate: 1.0,
                vix: 60.0,
            },
        );
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..100 {
            model.update(growth, &mut rng);
        }
        assert!(model.state().vix < 20.0);
    }

    proptest! {
        #[test]
        fn vix_at_floor_stays_at_or_above_floor(seed in any::<u64>()) {
            let regimes = RegimeConfig::default();
            let cfg = MacroConfig::default();
            let floor = cfg.vix_floor;
            let mut model = MacroModel::with_state(cfg, MacroState { interest_rate: 2.5, vix: floor });
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let next = model.update(regimes.profile(Regime::Stagnation), &mut rng);
            prop_assert!(next.vix >= floor);
        }

        #[test]
        fn vix_floor_holds_over_long_runs(seed in any::<u64>()) {
            let regimes = RegimeConfig::default();
            let mut model = MacroModel::new(MacroConfig::default());
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for i in 0..2000 {
                let regime = Regime::ALL[(i / 100) % 4];
                let s = model.update(regimes.profile(regime), &mut rng);
                prop_assert!(s.vix >= 10.0);
                prop_assert!(s.interest_rate.is_finite());
            }
        }
    }
}
