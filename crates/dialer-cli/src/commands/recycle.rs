//! Recycle command - requeue contacts with a recyclable outcome

use dialer_core::DialerEngine;

/// Execute recycle command
pub async fn execute(engine: &DialerEngine, campaign_id: &str, qualification_id: &str) -> anyhow::Result<()> {
    let count = engine.recycle(campaign_id, qualification_id).await?;
    println!("recycled: {}", count);
    Ok(())
}
