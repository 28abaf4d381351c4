//! Market-wide scalars, trading phases and the event log.

use crate::entity::EntityId;
use crate::regime::Regime;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Entries kept in the recent-event ring buffer.
pub const EVENT_LOG_CAPACITY: usize = 5;

/// Smoothed macro scalars chasing the active regime's targets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MacroState {
    /// Short-term interest rate in percent.
    pub interest_rate: f64,
    /// Volatility index.
    pub vix: f64,
}

/// Trading-session phase reported alongside prices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketPhase {
    /// Prices are live.
    Open,
    /// After hours; prices keep drifting but are reported as delayed.
    Closed,
}

/// Severity tag attached to log entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Info,
    Success,
    Warning,
    Error,
}

/// Something noteworthy that happened during a tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarketEvent {
    RegimeShift {
        from: Regime,
        to: Regime,
    },
    Bankruptcy {
        id: EntityId,
        ticker: String,
    },
    Ipo {
        id: EntityId,
        ticker: String,
        name: String,
        emergency: bool,
    },
    MarketClosed,
    MarketOpened {
        /// Mean signed gap applied across active entities.
        mean_gap: f64,
    },
}

impl MarketEvent {
    pub fn category(&self) -> EventCategory {
        match self {
            MarketEvent::RegimeShift { to, .. } => {
                if *to == Regime::Growth {
                    EventCategory::Success
                } else {
                    EventCategory::Warning
                }
            }
            MarketEvent::Bankruptcy { .. } => EventCategory::Error,
            MarketEvent::Ipo { emergency, .. } => {
                if *emergency {
                    EventCategory::Error
                } else {
                    EventCategory::Success
                }
            }
            MarketEvent::MarketClosed => EventCategory::Warning,
            MarketEvent::MarketOpened { .. } => EventCategory::Success,
        }
    }

    pub fn message(&self) -> String {
        match self {
            MarketEvent::RegimeShift { from, to } => {
                format!("Regime shift: {} -> {}", from.label(), to.label())
            }
            MarketEvent::Bankruptcy { ticker, .. } => format!("Extinction: {ticker}"),
            MarketEvent::Ipo {
                ticker,
                name,
                emergency,
                ..
            } => {
                if *emergency {
                    format!("Emergency IPO: {ticker} ({name})")
                } else {
                    format!("IPO: {ticker} ({name})")
                }
            }
            MarketEvent::MarketClosed => "Market closed: after-hours trading".to_string(),
            MarketEvent::MarketOpened { mean_gap } => {
                format!("Market open: overnight gap {:+.2}%", mean_gap * 100.0)
            }
        }
    }
}

/// One rendered log line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogEntry {
    pub tick: u64,
    /// Simulated wall time in epoch milliseconds.
    pub timestamp_ms: i64,
    pub category: EventCategory,
    pub message: String,
}

/// Bounded log, most recent entry first.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(EVENT_LOG_CAPACITY + 1),
        }
    }

    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(EVENT_LOG_CAPACITY);
    }

    pub fn record(&mut self, tick: u64, timestamp_ms: i64, event: &MarketEvent) {
        self.append(LogEntry {
            tick,
            timestamp_ms,
            category: event.category(),
            message: event.message(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }
}
