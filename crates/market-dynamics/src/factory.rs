//! Generation of cold-start and IPO entities.

use market_core::{
    ConfigError, Entity, EntityId, EntityStatus, PriceHistory, Sector, SeedingConfig, SubIndustry,
    HEALTH_INITIAL,
};
use market_core::config::validate_seeding;
use rand::Rng;
use rand_distr::{Distribution, LogNormal};
use std::collections::HashSet;

const FOUNDING_SUFFIXES: [&str; 5] = ["Corp", "Systems", "Global", "Tech", "Industries"];
const LISTING_SUFFIXES: [&str; 4] = ["Inc", "Corp", "Group", "Holdings"];
const TICKER_ATTEMPTS: usize = 64;

/// Builds fresh entities from the seeding distributions.
#[derive(Clone, Debug)]
pub struct EntityFactory {
    seeding: SeedingConfig,
    price_floor: f64,
    initial_price: LogNormal<f64>,
    initial_cap: LogNormal<f64>,
}

impl EntityFactory {
    /// Fails on the same seeding parameters `validate_seeding` rejects,
    /// including a negative sigma that `LogNormal::new` would accept.
    pub fn new(seeding: &SeedingConfig, price_floor: f64) -> Result<Self, ConfigError> {
        validate_seeding(seeding)?;
        Ok(Self {
            initial_price: log_normal(
                "seeding.initial_price_sigma",
                seeding.initial_price_median,
                seeding.initial_price_sigma,
            )?,
            initial_cap: log_normal(
                "seeding.initial_cap_sigma",
                seeding.initial_cap_median,
                seeding.initial_cap_sigma,
            )?,
            seeding: seeding.clone(),
            price_floor,
        })
    }

    /// Entity for population initialization.
    pub fn cold_start<R: Rng + ?Sized>(
        &self,
        id: EntityId,
        taken: &HashSet<String>,
        rng: &mut R,
    ) -> Entity {
        let (sector, sub_industry) = pick_industry(rng);
        let ticker = issue_ticker(sector, id, taken, rng);
        let name = format!("{} {}", sub_industry.label(), pick(&FOUNDING_SUFFIXES, rng));
        let cap = self.initial_cap.sample(rng);
        let price = self.initial_price.sample(rng).max(self.price_floor);
        let volatility = self.seeding.volatility.lerp(rng.gen());
        let value_score = self.seeding.value_score.lerp(rng.gen());
        build(
            id,
            ticker,
            name,
            (sector, sub_industry),
            price,
            cap / price,
            volatility,
            value_score,
        )
    }

    /// Newly listed replacement with a fixed initial market cap.
    pub fn listing<R: Rng + ?Sized>(&self, id: EntityId, taken: &HashSet<String>, rng: &mut R) -> Entity {
        let (sector, sub_industry) = pick_industry(rng);
        let ticker = issue_ticker(sector, id, taken, rng);
        let name = format!("{} {}", sub_industry.label(), pick(&LISTING_SUFFIXES, rng));
        let price = self.seeding.ipo_price.lerp(rng.gen()).max(self.price_floor);
        let volatility = self.seeding.ipo_volatility.lerp(rng.gen());
        let value_score = self.seeding.ipo_value_score.lerp(rng.gen());
        build(
            id,
            ticker,
            name,
            (sector, sub_industry),
            price,
            self.seeding.ipo_market_cap / price,
            volatility,
            value_score,
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn build(
    id: EntityId,
    ticker: String,
    name: String,
    (sector, sub_industry): (Sector, SubIndustry),
    price: f64,
    shares_outstanding: f64,
    volatility: f64,
    value_score: f64,
) -> Entity {
    let mut entity = Entity {
        id,
        ticker,
        name,
        sector,
        sub_industry,
        price,
        shares_outstanding,
        market_cap: 0.0,
        volatility,
        value_score,
        health: HEALTH_INITIAL,
        history: PriceHistory::starting_at(price),
        status: EntityStatus::Active,
        age_ticks: 0,
    };
    entity.refresh_market_cap();
    entity
}

fn pick<'a, R: Rng + ?Sized>(options: &[&'a str], rng: &mut R) -> &'a str {
    options[rng.gen_range(0..options.len())]
}

fn pick_industry<R: Rng + ?Sized>(rng: &mut R) -> (Sector, SubIndustry) {
    let sector = Sector::ALL[rng.gen_range(0..Sector::ALL.len())];
    let subs = sector.sub_industries();
    (sector, subs[rng.gen_range(0..subs.len())])
}

fn log_normal(field: &'static str, median: f64, sigma: f64) -> Result<LogNormal<f64>, ConfigError> {
    LogNormal::new(median.ln(), sigma).map_err(|e| ConfigError::Distribution {
        field,
        reason: e.to_string(),
    })
}

/// Sector letter plus two or three random letters, unique against `taken`.
/// Falls back to a digit-bearing symbol, which no random ticker can collide with.
fn issue_ticker<R: Rng + ?Sized>(
    sector: Sector,
    id: EntityId,
    taken: &HashSet<String>,
    rng: &mut R,
) -> String {
    for _ in 0..TICKER_ATTEMPTS {
        let extra = if rng.gen_bool(0.5) { 2 } else { 3 };
        let mut ticker = String::with_capacity(4);
        ticker.push(sector.ticker_prefix());
        for _ in 0..extra {
            ticker.push(char::from(b'A' + rng.gen_range(0..26u8)));
        }
        if !taken.contains(&ticker) {
            return ticker;
        }
    }
    format!("{}{}", sector.ticker_prefix(), id.0)
}
