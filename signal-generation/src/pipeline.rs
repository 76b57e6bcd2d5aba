//! Signal admission pipeline
//!
//! Wires an indicator source, a signal builder and the risk gate registry
//! together for a stream of ticks running under one execution frame.

use crate::config::{AdmissionConfig, PipelineConfig};
use crate::signals::{IndicatorSnapshot, IndicatorSource, SignalBuilder};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::{PendingSignal, Tick};
use execution_context::ExecutionFrame;
use futures::{future, Stream, StreamExt};
use interval_cache::{memoize_with_clock, CacheStats, Clock, IntervalCache, SystemClock};
use risk_gates::{Decision, RiskGateRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one tick that produced a candidate signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admission {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub frame: ExecutionFrame,
    pub signal: PendingSignal,
    pub decision: Decision,
}

/// Signal admission pipeline
pub struct SignalAdmissionPipeline {
    config: PipelineConfig,
    indicators: IntervalCache<String, IndicatorSnapshot>,
    builder: Arc<dyn SignalBuilder>,
    registry: Arc<RiskGateRegistry>,
}

impl SignalAdmissionPipeline {
    /// Create a new pipeline using wall-clock windows
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn IndicatorSource>,
        builder: Arc<dyn SignalBuilder>,
        registry: Arc<RiskGateRegistry>,
    ) -> Self {
        Self::with_clock(config, source, builder, registry, Arc::new(SystemClock))
    }

    /// Create a new pipeline with an explicit clock for cache windows
    pub fn with_clock(
        config: PipelineConfig,
        source: Arc<dyn IndicatorSource>,
        builder: Arc<dyn SignalBuilder>,
        registry: Arc<RiskGateRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let timeframe = config.indicator_cache.interval.clone();
        let indicators = memoize_with_clock(
            move |symbol: String| {
                let source = Arc::clone(&source);
                let timeframe = timeframe.clone();
                async move { source.compute(&symbol, &timeframe).await }
            },
            &config.indicator_cache,
            |symbol: &String| symbol.clone(),
            clock,
        );

        info!(
            interval = %config.indicator_cache.interval,
            risk_schemas = registry.len(),
            enabled = config.enabled,
            "Signal admission pipeline created"
        );

        Self {
            config,
            indicators,
            builder,
            registry,
        }
    }

    /// Create a pipeline and its risk registry from the top-level config
    pub fn from_config(
        config: &AdmissionConfig,
        source: Arc<dyn IndicatorSource>,
        builder: Arc<dyn SignalBuilder>,
    ) -> Result<Self> {
        let registry = RiskGateRegistry::from_config(&config.risk)
            .context("failed to build risk gate registry")?;

        Ok(Self::new(
            config.pipeline.clone(),
            source,
            builder,
            Arc::new(registry),
        ))
    }

    /// Process a single tick under the currently active frame.
    ///
    /// Returns `None` when the pipeline is disabled or the builder proposes
    /// no signal for this tick.
    pub async fn process_tick(&self, tick: &Tick) -> Result<Option<Admission>> {
        if !self.config.enabled {
            debug!("Pipeline is disabled, skipping tick");
            return Ok(None);
        }

        let indicators = self
            .indicators
            .call(tick.symbol.clone())
            .await
            .with_context(|| format!("indicator data unavailable for {}", tick.symbol))?;

        let Some(signal) = self.builder.build(tick, &indicators) else {
            debug!(symbol = %tick.symbol, price = tick.price, "No candidate signal");
            return Ok(None);
        };

        let decision = self.registry.evaluate(&signal, tick.price).await;
        let frame = execution_context::current_frame();

        debug!(
            symbol = %tick.symbol,
            signal_id = %signal.id,
            frame = %frame,
            decision = %decision,
            "Tick processed"
        );

        Ok(Some(Admission {
            symbol: tick.symbol.clone(),
            timestamp: tick.timestamp,
            frame,
            signal,
            decision,
        }))
    }

    /// Drain `ticks` under `frame`, yielding one item per tick that produced
    /// a candidate signal.
    ///
    /// A failing tick yields an `Err` item; processing continues with the
    /// next tick. Ticks are processed strictly in source order.
    pub fn run<S>(
        self: Arc<Self>,
        ticks: S,
        frame: ExecutionFrame,
    ) -> impl Stream<Item = Result<Admission>>
    where
        S: Stream<Item = Tick>,
    {
        let admissions = ticks
            .then(move |tick| {
                let pipeline = Arc::clone(&self);
                async move {
                    let result = pipeline.process_tick(&tick).await;
                    if let Err(e) = &result {
                        let error = format!("{:#}", e);
                        warn!(symbol = %tick.symbol, error = %error, "Tick processing failed");
                    }
                    result
                }
            })
            .filter_map(|result| future::ready(result.transpose()));

        execution_context::run_scoped(admissions, frame)
    }

    pub fn registry(&self) -> &RiskGateRegistry {
        &self.registry
    }

    pub fn indicator_cache_stats(&self) -> CacheStats {
        self.indicators.stats()
    }
}
