//! Admission pipeline configuration
//!
//! Loaded from a TOML file, with `ADMISSION__<SECTION>__<KEY>` environment
//! variables taking precedence (e.g. `ADMISSION__PIPELINE__ENABLED=false`).

use anyhow::Context;
use interval_cache::CacheConfig;
use risk_gates::RiskGateConfig;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "ADMISSION";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Enable/disable signal admission
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Indicator cache window and capacity
    #[serde(default)]
    pub indicator_cache: CacheConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            indicator_cache: CacheConfig::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdmissionConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub risk: RiskGateConfig,
}

/// Load configuration from a TOML file layered with environment overrides
pub fn load_config(path: &str) -> anyhow::Result<AdmissionConfig> {
    load_with_environment(path, environment())
}

fn environment() -> ::config::Environment {
    ::config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

fn load_with_environment(
    path: &str,
    environment: ::config::Environment,
) -> anyhow::Result<AdmissionConfig> {
    let settings = ::config::Config::builder()
        .add_source(::config::File::new(path, ::config::FileFormat::Toml))
        .add_source(environment)
        .build()
        .with_context(|| format!("failed to read admission config from {}", path))?;

    settings
        .try_deserialize()
        .with_context(|| format!("invalid admission config in {}", path))
}

/// Save configuration to TOML file
pub fn save_config(config: &AdmissionConfig, path: &str) -> anyhow::Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Create a default configuration file template
pub fn create_config_template(path: &str) -> anyhow::Result<()> {
    let template = "# Signal Admission Configuration
# Any key can be overridden with ADMISSION__<SECTION>__<KEY>,
# e.g. ADMISSION__PIPELINE__INDICATOR_CACHE__INTERVAL=1h

[pipeline]
enabled = true

[pipeline.indicator_cache]
# Indicator data is recomputed once per window (1m, 15m, 4h, 1d, ...)
interval = \"15m\"
# Maximum cached symbols, least recently used evicted first (0 = unbounded)
max_entries = 1024

[risk.risk_reward]
enabled = true
min_ratio = 2.0

[risk.stop_loss_distance]
enabled = true
min_distance_pct = 1.0

[risk.take_profit_distance]
enabled = false
min_distance_pct = 0.5
";

    std::fs::write(path, template)?;
    Ok(())
}
