//! Lock maintenance commands

use dialer_core::engine::ReleaseSummary;
use dialer_core::DialerEngine;

/// Release everything an evicted agent holds
pub async fn release_agent(engine: &DialerEngine, agent_id: &str) -> anyhow::Result<()> {
    let summary = engine.release_all_for_agent(agent_id).await?;
    print_summary(&summary);
    Ok(())
}

/// Resolve locks older than the configured stale age
pub async fn sweep(engine: &DialerEngine) -> anyhow::Result<()> {
    let summary = engine.sweep_stale_locks().await?;
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &ReleaseSummary) {
    println!("released: {}", summary.released.len());
    println!("auto-qualified: {}", summary.auto_qualified.len());
    for contact_id in &summary.auto_qualified {
        println!("  {}", contact_id);
    }
}
