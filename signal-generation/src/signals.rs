//! Indicator data and pending signal construction

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{PendingSignal, PositionSide, Tick, Timeframe};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Positive for an uptrend, negative for a downtrend, zero for flat
pub const TREND_INDICATOR: &str = "trend";
/// Average true range in price units
pub const ATR_INDICATOR: &str = "atr";

/// Named indicator values for one symbol, computed for one timeframe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub values: BTreeMap<String, f64>,
    pub computed_at: DateTime<Utc>,
}

impl IndicatorSnapshot {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            values: BTreeMap::new(),
            computed_at: Utc::now(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// Expensive indicator computation, typically candle fetches plus math
#[async_trait]
pub trait IndicatorSource: Send + Sync {
    async fn compute(&self, symbol: &str, timeframe: &Timeframe) -> anyhow::Result<IndicatorSnapshot>;
}

/// Turns a tick and its indicator data into a candidate signal, if any
pub trait SignalBuilder: Send + Sync {
    fn build(&self, tick: &Tick, indicators: &IndicatorSnapshot) -> Option<PendingSignal>;
}

/// Builds a bracket order around the tick price.
///
/// Side follows the sign of [`TREND_INDICATOR`]; take-profit and stop-loss
/// are placed a multiple of [`ATR_INDICATOR`] away from entry.
#[derive(Debug, Clone)]
pub struct BracketSignalBuilder {
    pub sl_atr_multiplier: f64,
    pub tp_atr_multiplier: f64,
}

impl BracketSignalBuilder {
    pub fn new(sl_atr_multiplier: f64, tp_atr_multiplier: f64) -> Self {
        Self {
            sl_atr_multiplier,
            tp_atr_multiplier,
        }
    }
}

impl Default for BracketSignalBuilder {
    fn default() -> Self {
        Self::new(1.5, 3.0)
    }
}

impl SignalBuilder for BracketSignalBuilder {
    fn build(&self, tick: &Tick, indicators: &IndicatorSnapshot) -> Option<PendingSignal> {
        let trend = indicators.get(TREND_INDICATOR)?;
        let atr = indicators.get(ATR_INDICATOR).filter(|atr| atr.is_finite() && *atr > 0.0)?;

        let position = if trend > 0.0 {
            PositionSide::Long
        } else if trend < 0.0 {
            PositionSide::Short
        } else {
            return None;
        };

        let price = tick.price;
        let (tp, sl) = match position {
            PositionSide::Long => (
                price + atr * self.tp_atr_multiplier,
                price - atr * self.sl_atr_multiplier,
            ),
            PositionSide::Short => (
                price - atr * self.tp_atr_multiplier,
                price + atr * self.sl_atr_multiplier,
            ),
        };

        Some(
            PendingSignal::new(tick.symbol.clone(), position, tp, sl)
                .with_price_open(price)
                .with_note(format!("{} bracket, atr {:.4}", position, atr)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(trend: f64, atr: f64) -> IndicatorSnapshot {
        IndicatorSnapshot::new("BTCUSDT", Timeframe::minutes(15))
            .with_value(TREND_INDICATOR, trend)
            .with_value(ATR_INDICATOR, atr)
    }

    fn tick(price: f64) -> Tick {
        Tick::new("BTCUSDT", price, Utc::now())
    }

    #[test]
    fn test_long_bracket() {
        let signal = BracketSignalBuilder::default()
            .build(&tick(100.0), &snapshot(1.0, 2.0))
            .unwrap();

        assert_eq!(signal.position, PositionSide::Long);
        assert_eq!(signal.price_open, Some(100.0));
        assert_eq!(signal.price_take_profit, 106.0);
        assert_eq!(signal.price_stop_loss, 97.0);
    }

    #[test]
    fn test_short_bracket() {
        let signal = BracketSignalBuilder::new(1.0, 2.0)
            .build(&tick(100.0), &snapshot(-0.4, 2.0))
            .unwrap();

        assert_eq!(signal.position, PositionSide::Short);
        assert_eq!(signal.price_take_profit, 96.0);
        assert_eq!(signal.price_stop_loss, 102.0);
    }

    #[test]
    fn test_no_signal_without_direction_or_range() {
        let builder = BracketSignalBuilder::default();

        assert!(builder.build(&tick(100.0), &snapshot(0.0, 2.0)).is_none());
        assert!(builder.build(&tick(100.0), &snapshot(1.0, 0.0)).is_none());
        assert!(builder.build(&tick(100.0), &snapshot(1.0, f64::NAN)).is_none());

        let missing = IndicatorSnapshot::new("BTCUSDT", Timeframe::minutes(15));
        assert!(builder.build(&tick(100.0), &missing).is_none());
    }
}
