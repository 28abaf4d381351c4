#![deny(warnings)]

//! Headless runner: load a config, run the engine in batch or real time, and
//! print the analytics report.

use anyhow::{Context, Result};
use market_core::EngineConfig;
use market_runtime::{EngineClock, EngineSnapshot, MarketEngine, SnapshotStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct Args {
    config: Option<PathBuf>,
    seed: Option<u64>,
    ticks: Option<u64>,
    realtime: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        config: None,
        seed: None,
        ticks: None,
        realtime: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = it.next().map(PathBuf::from),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()),
            "--ticks" => args.ticks = it.next().and_then(|s| s.parse().ok()),
            "--realtime" => args.realtime = true,
            other => warn!(arg = other, "ignoring unknown argument"),
        }
    }
    args
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn run_batch(mut engine: MarketEngine, ticks: u64) -> MarketEngine {
    info!(ticks, "batch run");
    for cycle in engine.run_ticks(ticks) {
        info!(
            cycle = cycle.cycle_number,
            return_365 = ?cycle.returns.p365,
            bankruptcies = cycle.bankruptcy_count,
            ipos = cycle.ipo_count,
            "cycle complete"
        );
    }
    engine
}

async fn run_realtime(engine: MarketEngine, ticks: Option<u64>) -> Result<MarketEngine> {
    let store = Arc::new(SnapshotStore::new(engine.snapshot()));
    let (tx, mut rx) = broadcast::channel::<Arc<EngineSnapshot>>(16);
    let feed = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(snap) => info!(
                    tick = snap.tick,
                    regime = snap.regime_label,
                    phase = ?snap.phase,
                    vix = format!("{:.2}", snap.vix),
                    active = snap.active_count,
                    "market"
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "feed lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut clock = EngineClock::new(engine, Arc::clone(&store)).with_sink(Arc::new(tx));
    let engine = match ticks {
        Some(limit) => {
            clock = clock.with_tick_limit(limit);
            clock.spawn().join().await?
        }
        None => {
            let handle = clock.spawn();
            tokio::signal::ctrl_c()
                .await
                .context("waiting for ctrl-c")?;
            info!("shutdown requested");
            handle.stop().await?
        }
    };
    feed.await.context("feed task")?;

    let stats = store.query().market_stats();
    info!(
        total_market_cap = stats.total_market_cap,
        active = stats.active_count,
        "final snapshot"
    );
    Ok(engine)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        git_sha = env!("GIT_SHA"),
        build_date = env!("BUILD_DATE"),
        "starting market simulator"
    );
    let args = parse_args();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let cycle_length = config.analytics.cycle_length_ticks;
    let engine = MarketEngine::with_epoch_ms(config, chrono::Utc::now().timestamp_millis())?;

    let engine = if args.realtime {
        run_realtime(engine, args.ticks).await?
    } else {
        run_batch(engine, args.ticks.unwrap_or(cycle_length))
    };

    let summary = engine.analytics().summary();
    let stats = engine.snapshot();
    println!(
        "Market | tick: {} | regime: {} | vix: {:.2} | rate: {:.2}% | active: {}/{} | cap: ${:.3}T",
        stats.tick,
        stats.regime_label,
        stats.vix,
        stats.interest_rate,
        stats.active_count,
        stats.entities.len(),
        stats.total_market_cap / 1e12
    );
    println!(
        "Cycles | completed: {} | ipos: {} | bankruptcies: {} | progress: {:.1}%",
        summary.total_completed_cycles,
        summary.total_ipos,
        summary.total_bankruptcies,
        summary.current_cycle_progress_pct
    );
    for entry in &stats.events {
        println!("[{:?}] tick {} {}", entry.category, entry.tick, entry.message);
    }
    println!("{}", serde_json::to_string_pretty(&stats.analytics)?);
    Ok(())
}
