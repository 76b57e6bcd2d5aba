// Signal Admission (Layer 2)
// Turns ticks into pending signals and gates them through the risk registry

pub mod config;
pub mod pipeline;
pub mod signals;

pub use self::config::{
    create_config_template, load_config, save_config, AdmissionConfig, PipelineConfig,
};
pub use pipeline::{Admission, SignalAdmissionPipeline};
pub use signals::{
    BracketSignalBuilder, IndicatorSnapshot, IndicatorSource, SignalBuilder, ATR_INDICATOR,
    TREND_INDICATOR,
};
