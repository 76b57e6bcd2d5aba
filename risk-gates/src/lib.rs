//! Risk gates for pending signals
//!
//! A [`RiskGateRegistry`] holds named [`RiskSchema`]s, each an ordered list
//! of [`Validation`]s. Every pending signal runs through all schemas in
//! registration order and is rejected by the first validation that fails.

mod config;
mod gates;
mod registry;
mod validation;

pub use config::{
    create_config_template, load_config, save_config, RiskGateConfig, RiskRewardConfig,
    StopLossDistanceConfig, TakeProfitDistanceConfig,
};
pub use gates::{RiskRewardGate, StopLossDistanceGate, TakeProfitDistanceGate};
pub use registry::{
    Decision, RiskGateError, RiskGateRegistry, RiskSchema, RISK_REWARD_SCHEMA,
    STOP_LOSS_DISTANCE_SCHEMA, TAKE_PROFIT_DISTANCE_SCHEMA,
};
pub use validation::{FnValidation, RiskCheck, Validation, ValidationOutcome};
