//! Risk gate configuration

use serde::{Deserialize, Serialize};

/// Configuration for the reference gates registered by
/// [`RiskGateRegistry::from_config`](crate::RiskGateRegistry::from_config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskGateConfig {
    #[serde(default)]
    pub risk_reward: RiskRewardConfig,

    #[serde(default)]
    pub stop_loss_distance: StopLossDistanceConfig,

    #[serde(default)]
    pub take_profit_distance: TakeProfitDistanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRewardConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minimum reward / risk ratio
    #[serde(default = "default_min_ratio")]
    pub min_ratio: f64,
}

impl Default for RiskRewardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_ratio: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopLossDistanceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Minimum stop-loss distance from entry, in percent
    #[serde(default = "default_min_sl_distance")]
    pub min_distance_pct: f64,

    /// Optional upper bound on the stop-loss distance, in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance_pct: Option<f64>,
}

impl Default for StopLossDistanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_distance_pct: 1.0,
            max_distance_pct: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeProfitDistanceConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Minimum take-profit distance from entry, in percent
    #[serde(default = "default_min_tp_distance")]
    pub min_distance_pct: f64,
}

impl Default for TakeProfitDistanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_distance_pct: 0.5,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_min_ratio() -> f64 {
    2.0
}

fn default_min_sl_distance() -> f64 {
    1.0
}

fn default_min_tp_distance() -> f64 {
    0.5
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> anyhow::Result<RiskGateConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: RiskGateConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to TOML file
pub fn save_config(config: &RiskGateConfig, path: &str) -> anyhow::Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Create a default configuration file template
pub fn create_config_template(path: &str) -> anyhow::Result<()> {
    let template = "# Risk Gate Configuration
# Gates run in this order; the first failing gate rejects the signal

[risk_reward]
enabled = true
# Minimum reward / risk ratio
min_ratio = 2.0

[stop_loss_distance]
enabled = true
# Minimum stop-loss distance from entry (percent)
min_distance_pct = 1.0
# Optional upper bound (percent)
# max_distance_pct = 20.0

[take_profit_distance]
enabled = false
# Minimum take-profit distance from entry (percent)
min_distance_pct = 0.5
";

    std::fs::write(path, template)?;
    Ok(())
}
