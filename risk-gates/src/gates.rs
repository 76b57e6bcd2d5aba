//! Reference price gates
//!
//! All distances are measured from the entry price (`price_open`, falling
//! back to the current price). A gate with no usable entry price passes.

use crate::validation::{RiskCheck, Validation, ValidationOutcome};
use async_trait::async_trait;
use common::PositionSide;

/// Requires `reward / risk >= min_ratio`
#[derive(Debug, Clone)]
pub struct RiskRewardGate {
    min_ratio: f64,
    note: String,
}

impl RiskRewardGate {
    pub fn new(min_ratio: f64) -> Self {
        Self {
            min_ratio,
            note: format!("Risk/reward ratio must be at least {:.2}", min_ratio),
        }
    }

    pub fn check(&self, check: &RiskCheck) -> ValidationOutcome {
        let Some(open) = check.price_open else {
            return ValidationOutcome::Pass;
        };
        let signal = &check.signal;

        let (reward, risk) = match signal.position {
            PositionSide::Long => (
                signal.price_take_profit - open,
                open - signal.price_stop_loss,
            ),
            PositionSide::Short => (
                open - signal.price_take_profit,
                signal.price_stop_loss - open,
            ),
        };

        if risk <= 0.0 {
            return ValidationOutcome::fail(format!(
                "Invalid SL: risk <= 0 (stop-loss {} is on the wrong side of entry {})",
                signal.price_stop_loss, open
            ));
        }

        let ratio = reward / risk;
        if ratio < self.min_ratio {
            return ValidationOutcome::fail(format!(
                "Poor R/R ratio: {:.2} (minimum {:.2})",
                ratio, self.min_ratio
            ));
        }

        ValidationOutcome::Pass
    }
}

impl Default for RiskRewardGate {
    fn default() -> Self {
        Self::new(2.0)
    }
}

#[async_trait]
impl Validation for RiskRewardGate {
    fn note(&self) -> &str {
        &self.note
    }

    async fn validate(&self, check: &RiskCheck) -> ValidationOutcome {
        self.check(check)
    }
}

/// Requires the stop-loss to sit at least `min_distance_pct` percent away
/// from entry, and optionally no further than `max_distance_pct`
#[derive(Debug, Clone)]
pub struct StopLossDistanceGate {
    min_distance_pct: f64,
    max_distance_pct: Option<f64>,
    note: String,
}

impl StopLossDistanceGate {
    pub fn new(min_distance_pct: f64) -> Self {
        Self {
            min_distance_pct,
            max_distance_pct: None,
            note: format!("Stop-loss must be at least {:.2}% from entry", min_distance_pct),
        }
    }

    pub fn with_max_distance(mut self, max_distance_pct: f64) -> Self {
        self.max_distance_pct = Some(max_distance_pct);
        self.note = format!(
            "Stop-loss must be between {:.2}% and {:.2}% from entry",
            self.min_distance_pct, max_distance_pct
        );
        self
    }

    pub fn check(&self, check: &RiskCheck) -> ValidationOutcome {
        let Some(open) = check.price_open else {
            return ValidationOutcome::Pass;
        };
        let sl = check.signal.price_stop_loss;

        let distance_pct = match check.signal.position {
            PositionSide::Long => (open - sl) / open * 100.0,
            PositionSide::Short => (sl - open) / open * 100.0,
        };

        if distance_pct < self.min_distance_pct {
            return ValidationOutcome::fail(format!(
                "SL too tight: {:.2}% (minimum {:.2}%)",
                distance_pct, self.min_distance_pct
            ));
        }

        if let Some(max) = self.max_distance_pct {
            if distance_pct > max {
                return ValidationOutcome::fail(format!(
                    "SL too wide: {:.2}% (maximum {:.2}%)",
                    distance_pct, max
                ));
            }
        }

        ValidationOutcome::Pass
    }
}

impl Default for StopLossDistanceGate {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[async_trait]
impl Validation for StopLossDistanceGate {
    fn note(&self) -> &str {
        &self.note
    }

    async fn validate(&self, check: &RiskCheck) -> ValidationOutcome {
        self.check(check)
    }
}

/// Requires the take-profit to sit at least `min_distance_pct` percent away
/// from entry, so the target still clears trading fees
#[derive(Debug, Clone)]
pub struct TakeProfitDistanceGate {
    min_distance_pct: f64,
    note: String,
}

impl TakeProfitDistanceGate {
    pub fn new(min_distance_pct: f64) -> Self {
        Self {
            min_distance_pct,
            note: format!("Take-profit must be at least {:.2}% from entry", min_distance_pct),
        }
    }

    pub fn check(&self, check: &RiskCheck) -> ValidationOutcome {
        let Some(open) = check.price_open else {
            return ValidationOutcome::Pass;
        };
        let tp = check.signal.price_take_profit;

        let distance_pct = match check.signal.position {
            PositionSide::Long => (tp - open) / open * 100.0,
            PositionSide::Short => (open - tp) / open * 100.0,
        };

        if distance_pct < self.min_distance_pct {
            return ValidationOutcome::fail(format!(
                "TP too close: {:.2}% (minimum {:.2}%)",
                distance_pct, self.min_distance_pct
            ));
        }

        ValidationOutcome::Pass
    }
}

#[async_trait]
impl Validation for TakeProfitDistanceGate {
    fn note(&self) -> &str {
        &self.note
    }

    async fn validate(&self, check: &RiskCheck) -> ValidationOutcome {
        self.check(check)
    }
}
