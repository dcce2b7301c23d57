//! Campaign and quota rule database operations

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use super::rows::{CampaignRow, QuotaRuleRow};
use crate::error::Result;
use crate::model::{Campaign, QuotaRule};

pub async fn insert_campaign(conn: &mut SqliteConnection, campaign: &Campaign) -> Result<()> {
    sqlx::query(
        "INSERT INTO campaigns (id, name, quotas_enabled, qualification_group_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&campaign.id)
    .bind(&campaign.name)
    .bind(campaign.quotas_enabled)
    .bind(&campaign.qualification_group_id)
    .bind(campaign.created_at)
    .bind(campaign.updated_at)
    .execute(&mut *conn)
    .await?;

    insert_quota_rules(conn, &campaign.id, &campaign.quota_rules).await
}

/// Load a campaign with its quota rules in list order
pub async fn fetch_campaign(conn: &mut SqliteConnection, campaign_id: &str) -> Result<Option<Campaign>> {
    let row = sqlx::query_as::<_, CampaignRow>(
        "SELECT id, name, quotas_enabled, qualification_group_id, created_at, updated_at
         FROM campaigns WHERE id = ?1",
    )
    .bind(campaign_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let quota_rules = fetch_quota_rules(conn, campaign_id).await?;

    Ok(Some(Campaign {
        id: row.id,
        name: row.name,
        quotas_enabled: row.quotas_enabled,
        qualification_group_id: row.qualification_group_id,
        quota_rules,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

pub async fn fetch_quota_rules(conn: &mut SqliteConnection, campaign_id: &str) -> Result<Vec<QuotaRule>> {
    let rows = sqlx::query_as::<_, QuotaRuleRow>(
        "SELECT id, contact_field, operator, value, quota_limit, current_count
         FROM quota_rules WHERE campaign_id = ?1 ORDER BY position ASC",
    )
    .bind(campaign_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(QuotaRule::from).collect())
}

pub async fn list_campaign_ids(conn: &mut SqliteConnection) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>("SELECT id FROM campaigns ORDER BY created_at ASC, rowid ASC")
        .fetch_all(&mut *conn)
        .await?;
    Ok(ids)
}

/// Write to the campaign row so the enclosing transaction owns it until
/// commit. Returns false when the campaign does not exist.
pub async fn touch_campaign(conn: &mut SqliteConnection, campaign_id: &str, now: DateTime<Utc>) -> Result<bool> {
    let result = sqlx::query("UPDATE campaigns SET updated_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(campaign_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_quotas_enabled(
    conn: &mut SqliteConnection,
    campaign_id: &str,
    enabled: bool,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query("UPDATE campaigns SET quotas_enabled = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(enabled)
        .bind(now)
        .bind(campaign_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn insert_quota_rules(conn: &mut SqliteConnection, campaign_id: &str, rules: &[QuotaRule]) -> Result<()> {
    for (position, rule) in rules.iter().enumerate() {
        sqlx::query(
            "INSERT INTO quota_rules (id, campaign_id, position, contact_field, operator, value, quota_limit, current_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&rule.id)
        .bind(campaign_id)
        .bind(position as i64)
        .bind(rule.contact_field.as_str())
        .bind(rule.operator.as_str())
        .bind(&rule.value)
        .bind(rule.limit)
        .bind(rule.current_count)
        .execute(&mut *conn)
        .await?;
    }

    debug!("📋 Stored {} quota rules for campaign {}", rules.len(), campaign_id);
    Ok(())
}

pub async fn delete_quota_rules(conn: &mut SqliteConnection, campaign_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM quota_rules WHERE campaign_id = ?1")
        .bind(campaign_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Count one more positive qualification against a rule
pub async fn increment_quota(conn: &mut SqliteConnection, rule_id: &str) -> Result<()> {
    sqlx::query("UPDATE quota_rules SET current_count = current_count + 1 WHERE id = ?1")
        .bind(rule_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
