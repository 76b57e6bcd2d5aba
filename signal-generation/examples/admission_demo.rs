//! Signal admission demo
//!
//! Replays synthetic ticks for two symbols under a backtest frame and prints
//! every admission decision.
//!
//! Run with: cargo run -p signal-generation --example admission_demo [config.toml]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::{Tick, Timeframe};
use execution_context::ExecutionFrame;
use futures::{stream, StreamExt};
use signal_generation::{
    load_config, AdmissionConfig, BracketSignalBuilder, IndicatorSnapshot, IndicatorSource,
    SignalAdmissionPipeline, ATR_INDICATOR, TREND_INDICATOR,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Derives indicators from a fixed table instead of fetching candles
struct SyntheticIndicators;

#[async_trait]
impl IndicatorSource for SyntheticIndicators {
    async fn compute(&self, symbol: &str, timeframe: &Timeframe) -> anyhow::Result<IndicatorSnapshot> {
        tracing::info!(symbol, frame = %execution_context::current_frame(), "Computing indicators");

        let (trend, atr) = match symbol {
            "BTCUSDT" => (1.0, 600.0),
            "ETHUSDT" => (-1.0, 12.0),
            _ => anyhow::bail!("no candles for {}", symbol),
        };

        Ok(IndicatorSnapshot::new(symbol, timeframe.clone())
            .with_value(TREND_INDICATOR, trend)
            .with_value(ATR_INDICATOR, atr))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== Signal Admission Demo ===\n");

    let config = match std::env::args().nth(1) {
        Some(path) => load_config(&path)?,
        None => AdmissionConfig::default(),
    };

    let pipeline = Arc::new(SignalAdmissionPipeline::from_config(
        &config,
        Arc::new(SyntheticIndicators),
        Arc::new(BracketSignalBuilder::default()),
    )?);

    println!("Risk schemas: {:?}\n", pipeline.registry().schema_names().collect::<Vec<_>>());

    let start = Utc::now();
    let ticks = stream::iter(vec![
        Tick::new("BTCUSDT", 35_000.0, start),
        Tick::new("ETHUSDT", 1_900.0, start + Duration::seconds(1)),
        Tick::new("BTCUSDT", 35_050.0, start + Duration::seconds(2)),
        Tick::new("DOGEUSDT", 0.07, start + Duration::seconds(3)),
        Tick::new("ETHUSDT", 1_905.0, start + Duration::seconds(4)),
    ]);

    let frame = ExecutionFrame::new("atr-breakout", "binance", "demo");
    let admissions = pipeline.clone().run(ticks, frame);
    futures::pin_mut!(admissions);

    while let Some(item) = admissions.next().await {
        match item {
            Ok(admission) => {
                let mark = if admission.decision.is_admitted() { "✓" } else { "✗" };
                println!(
                    "  {} {} {} -> {}",
                    mark, admission.symbol, admission.signal.position, admission.decision
                );
                println!("    {}", serde_json::to_string(&admission)?);
            }
            Err(e) => println!("  ! {:#}", e),
        }
    }

    let stats = pipeline.indicator_cache_stats();
    println!(
        "\nIndicator cache: {} misses, {} hits, {} joins, {} failures",
        stats.misses, stats.hits, stats.joins, stats.failures
    );

    println!("\n=== Demo Complete ===");
    Ok(())
}
