//! Example usage of the risk gate registry

use common::{PendingSignal, PositionSide};
use execution_context::ExecutionFrame;
use risk_gates::{
    FnValidation, RiskCheck, RiskGateConfig, RiskGateRegistry, RiskSchema, ValidationOutcome,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("=== Risk Gate Example ===\n");

    // Example 1: Reference gates from the default configuration
    println!("Example 1: Registry from Default Configuration");
    let mut registry = RiskGateRegistry::from_config(&RiskGateConfig::default())?;
    for name in registry.schema_names() {
        println!("  - {}", name);
    }
    println!();

    // Example 2: A custom schema appended after the reference gates
    println!("Example 2: Custom Schema");
    registry.add_risk_schema(
        RiskSchema::new("no-dust")
            .with_note("Ignore signals on near-zero prices")
            .with_validation(Box::new(FnValidation::new(
                "Current price must be at least 0.01",
                |check: &RiskCheck| {
                    if check.current_price >= 0.01 {
                        ValidationOutcome::Pass
                    } else {
                        ValidationOutcome::fail("Price below dust threshold")
                    }
                },
            ))),
    )?;
    println!("✓ {} schemas registered\n", registry.len());

    // Example 3: Evaluate signals inside an execution frame
    println!("Example 3: Evaluating Signals");
    let frame = ExecutionFrame::new("breakout", "binance", "live");
    let signals = vec![
        PendingSignal::new("BTCUSDT", PositionSide::Long, 106.0, 97.0).with_price_open(100.0),
        PendingSignal::new("BTCUSDT", PositionSide::Long, 105.0, 97.0).with_price_open(100.0),
        PendingSignal::new("ETHUSDT", PositionSide::Short, 90.0, 100.4).with_price_open(100.0),
    ];

    for signal in &signals {
        let decision = execution_context::scope(frame.clone(), registry.evaluate(signal, 100.0)).await;
        if decision.is_admitted() {
            println!("  ✓ {} {} admitted", signal.symbol, signal.position);
        } else {
            println!("  ✗ {} {} {}", signal.symbol, signal.position, decision);
        }
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
