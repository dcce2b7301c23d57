//! Init command - create the schema and optionally a campaign

use std::path::PathBuf;

use dialer_core::model::{NewCampaign, NewQuotaRule};
use dialer_core::DialerEngine;
use tracing::info;

use super::read_json;

/// Execute init command
pub async fn execute(
    engine: &DialerEngine,
    campaign: Option<String>,
    group: Option<String>,
    rules: Option<PathBuf>,
    quotas_enabled: bool,
) -> anyhow::Result<()> {
    if !engine.health_check().await? {
        anyhow::bail!("database health check failed");
    }
    info!("✅ Database schema ready");

    let Some(name) = campaign else {
        return Ok(());
    };

    let quota_rules: Vec<NewQuotaRule> = match rules {
        Some(path) => read_json(&path)?,
        None => Vec::new(),
    };

    let created = engine
        .create_campaign(NewCampaign {
            name,
            quotas_enabled,
            qualification_group_id: group,
            quota_rules,
        })
        .await?;

    println!("{}", created.id);
    Ok(())
}
