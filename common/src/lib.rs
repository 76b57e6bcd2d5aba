//! Shared domain types for the signal admission workspace.
//!
//! Everything here is plain data: ticks coming in from the execution engine,
//! candidate signals produced by strategies, and the timeframe tokens used to
//! window cached indicator data.

mod timeframe;

pub use timeframe::{Timeframe, TimeframeError};

pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a proposed position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn is_long(&self) -> bool {
        matches!(self, PositionSide::Long)
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSide::Long => write!(f, "long"),
            PositionSide::Short => write!(f, "short"),
        }
    }
}

/// Market tick delivered by the execution engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl Tick {
    pub fn new(symbol: impl Into<String>, price: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp,
        }
    }
}

/// Candidate trade awaiting admission.
///
/// `price_open` is optional: a signal without an explicit entry is meant to
/// open at market, and evaluators fall back to the current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSignal {
    pub id: Uuid,
    pub symbol: String,
    pub position: PositionSide,
    pub price_open: Option<f64>,
    pub price_take_profit: f64,
    pub price_stop_loss: f64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PendingSignal {
    pub fn new(
        symbol: impl Into<String>,
        position: PositionSide,
        price_take_profit: f64,
        price_stop_loss: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: symbol.into(),
            position,
            price_open: None,
            price_take_profit,
            price_stop_loss,
            note: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_price_open(mut self, price_open: f64) -> Self {
        self.price_open = Some(price_open);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Entry price, falling back to `current_price` for market entries
    pub fn resolved_price_open(&self, current_price: f64) -> f64 {
        self.price_open.unwrap_or(current_price)
    }
}
