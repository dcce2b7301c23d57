//! Snapshot command - show a campaign's quota state and contacts

use dialer_core::model::CampaignSnapshot;
use dialer_core::DialerEngine;

/// Execute snapshot command
pub async fn execute(engine: &DialerEngine, campaign_id: &str, json: bool) -> anyhow::Result<()> {
    let snapshot = engine.campaign_snapshot(campaign_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_human(&snapshot);
    }
    Ok(())
}

fn print_human(snapshot: &CampaignSnapshot) {
    println!("\n═══ Campaign {} ({}) ═══", snapshot.name, snapshot.campaign_id);
    println!("📋 Contacts: {}", snapshot.counts.total());
    println!("   pending:   {}", snapshot.counts.pending);
    println!("   called:    {}", snapshot.counts.called);
    println!("   qualified: {}", snapshot.counts.qualified);
    println!("   locked:    {}", snapshot.counts.locked);

    println!(
        "📊 Quotas: {}",
        if snapshot.quotas_enabled { "enabled" } else { "disabled" }
    );
    for rule in &snapshot.quota_rules {
        println!(
            "   {} {} '{}': {}/{}{}",
            rule.contact_field,
            rule.operator,
            rule.value,
            rule.current_count,
            rule.limit,
            if rule.exhausted { " (exhausted)" } else { "" }
        );
    }
    println!("🕐 Taken at {}", snapshot.taken_at.to_rfc3339());
}
