//! Ordered risk schema registry and admission decisions

use crate::config::RiskGateConfig;
use crate::gates::{RiskRewardGate, StopLossDistanceGate, TakeProfitDistanceGate};
use crate::validation::{RiskCheck, Validation, ValidationOutcome};
use common::PendingSignal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const RISK_REWARD_SCHEMA: &str = "risk-reward";
pub const STOP_LOSS_DISTANCE_SCHEMA: &str = "stop-loss-distance";
pub const TAKE_PROFIT_DISTANCE_SCHEMA: &str = "take-profit-distance";

/// Outcome of running a pending signal through every registered schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Admit,
    Reject {
        risk_name: String,
        reason: String,
        /// Note of the validation that failed
        note: String,
    },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admit)
    }

    pub fn risk_name(&self) -> Option<&str> {
        match self {
            Decision::Admit => None,
            Decision::Reject { risk_name, .. } => Some(risk_name),
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Decision::Admit => None,
            Decision::Reject { reason, .. } => Some(reason),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Admit => write!(f, "admit"),
            Decision::Reject {
                risk_name, reason, ..
            } => write!(f, "reject [{}]: {}", risk_name, reason),
        }
    }
}

/// Malformed schema registration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiskGateError {
    #[error("risk schema name must not be empty")]
    EmptyName,

    #[error("risk schema '{0}' has no validations")]
    NoValidations(String),

    #[error("risk schema '{0}' is already registered")]
    DuplicateSchema(String),
}

/// Named, ordered set of validations
pub struct RiskSchema {
    risk_name: String,
    note: Option<String>,
    validations: Vec<Box<dyn Validation>>,
}

impl RiskSchema {
    pub fn new(risk_name: impl Into<String>) -> Self {
        Self {
            risk_name: risk_name.into(),
            note: None,
            validations: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Append a validation; validations run in the order they were added
    pub fn with_validation(mut self, validation: Box<dyn Validation>) -> Self {
        self.validations.push(validation);
        self
    }

    pub fn risk_name(&self) -> &str {
        &self.risk_name
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn validation_count(&self) -> usize {
        self.validations.len()
    }
}

impl fmt::Debug for RiskSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let notes: Vec<&str> = self.validations.iter().map(|v| v.note()).collect();
        f.debug_struct("RiskSchema")
            .field("risk_name", &self.risk_name)
            .field("note", &self.note)
            .field("validations", &notes)
            .finish()
    }
}

/// Append-only registry of risk schemas.
///
/// Built once at setup time and shared read-only afterwards.
#[derive(Debug, Default)]
pub struct RiskGateRegistry {
    schemas: Vec<RiskSchema>,
}

impl RiskGateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the reference gates enabled in `config`, in the
    /// order risk-reward, stop-loss-distance, take-profit-distance
    pub fn from_config(config: &RiskGateConfig) -> Result<Self, RiskGateError> {
        let mut registry = Self::new();

        if config.risk_reward.enabled {
            registry.add_risk_schema(
                RiskSchema::new(RISK_REWARD_SCHEMA)
                    .with_validation(Box::new(RiskRewardGate::new(config.risk_reward.min_ratio))),
            )?;
        }

        if config.stop_loss_distance.enabled {
            let mut gate = StopLossDistanceGate::new(config.stop_loss_distance.min_distance_pct);
            if let Some(max) = config.stop_loss_distance.max_distance_pct {
                gate = gate.with_max_distance(max);
            }
            registry.add_risk_schema(
                RiskSchema::new(STOP_LOSS_DISTANCE_SCHEMA).with_validation(Box::new(gate)),
            )?;
        }

        if config.take_profit_distance.enabled {
            registry.add_risk_schema(
                RiskSchema::new(TAKE_PROFIT_DISTANCE_SCHEMA).with_validation(Box::new(
                    TakeProfitDistanceGate::new(config.take_profit_distance.min_distance_pct),
                )),
            )?;
        }

        Ok(registry)
    }

    /// Register a schema after every schema already present.
    ///
    /// Names are unique: registering a name twice is a configuration error.
    pub fn add_risk_schema(&mut self, schema: RiskSchema) -> Result<(), RiskGateError> {
        if schema.risk_name.trim().is_empty() {
            return Err(RiskGateError::EmptyName);
        }
        if schema.validations.is_empty() {
            return Err(RiskGateError::NoValidations(schema.risk_name));
        }
        if self.schemas.iter().any(|s| s.risk_name == schema.risk_name) {
            warn!(risk_name = %schema.risk_name, "Rejected duplicate risk schema");
            return Err(RiskGateError::DuplicateSchema(schema.risk_name));
        }

        info!(
            risk_name = %schema.risk_name,
            validations = schema.validations.len(),
            "Registered risk schema"
        );
        self.schemas.push(schema);
        Ok(())
    }

    /// Builder form of [`add_risk_schema`](Self::add_risk_schema)
    pub fn with_schema(mut self, schema: RiskSchema) -> Result<Self, RiskGateError> {
        self.add_risk_schema(schema)?;
        Ok(self)
    }

    /// Run `signal` through every validation in registration order and stop
    /// at the first failure.
    pub async fn evaluate(&self, signal: &PendingSignal, current_price: f64) -> Decision {
        let check = RiskCheck::new(
            signal.clone(),
            current_price,
            execution_context::current_frame(),
        );

        for schema in &self.schemas {
            for validation in &schema.validations {
                if let ValidationOutcome::Fail(reason) = validation.validate(&check).await {
                    info!(
                        signal_id = %signal.id,
                        symbol = %signal.symbol,
                        risk_name = %schema.risk_name,
                        reason = %reason,
                        frame = %check.frame,
                        "Signal rejected by risk gate"
                    );
                    return Decision::Reject {
                        risk_name: schema.risk_name.clone(),
                        reason,
                        note: validation.note().to_string(),
                    };
                }
            }
        }

        debug!(
            signal_id = %signal.id,
            symbol = %signal.symbol,
            schemas = self.schemas.len(),
            "Signal admitted"
        );
        Decision::Admit
    }

    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.schemas.iter().map(|s| s.risk_name.as_str())
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
