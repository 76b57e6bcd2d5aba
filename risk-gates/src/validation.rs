//! Validation trait and the input every validation receives

use async_trait::async_trait;
use common::PendingSignal;
use execution_context::ExecutionFrame;

/// Everything a validation may look at
#[derive(Debug, Clone)]
pub struct RiskCheck {
    pub signal: PendingSignal,
    pub current_price: f64,
    /// Entry price with the current-price default applied. `None` when no
    /// usable price exists (zero or non-finite), in which case price based
    /// gates skip.
    pub price_open: Option<f64>,
    /// Frame active when the evaluation started
    pub frame: ExecutionFrame,
}

impl RiskCheck {
    pub fn new(signal: PendingSignal, current_price: f64, frame: ExecutionFrame) -> Self {
        let price_open = Some(signal.resolved_price_open(current_price))
            .filter(|price| price.is_finite() && *price != 0.0);

        Self {
            signal,
            current_price,
            price_open,
            frame,
        }
    }
}

/// Result of a single validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Pass,
    Fail(String),
}

impl ValidationOutcome {
    pub fn fail(reason: impl Into<String>) -> Self {
        ValidationOutcome::Fail(reason.into())
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, ValidationOutcome::Pass)
    }
}

/// A single rule inside a risk schema
#[async_trait]
pub trait Validation: Send + Sync {
    /// Human readable description, reported alongside rejections
    fn note(&self) -> &str;

    async fn validate(&self, check: &RiskCheck) -> ValidationOutcome;
}

/// Validation backed by a plain closure
pub struct FnValidation<F> {
    note: String,
    check: F,
}

impl<F> FnValidation<F>
where
    F: Fn(&RiskCheck) -> ValidationOutcome + Send + Sync,
{
    pub fn new(note: impl Into<String>, check: F) -> Self {
        Self {
            note: note.into(),
            check,
        }
    }
}

#[async_trait]
impl<F> Validation for FnValidation<F>
where
    F: Fn(&RiskCheck) -> ValidationOutcome + Send + Sync,
{
    fn note(&self) -> &str {
        &self.note
    }

    async fn validate(&self, check: &RiskCheck) -> ValidationOutcome {
        (self.check)(check)
    }
}
