//! Campaign, quota rule and qualification catalog administration.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::info;

use super::{new_id, DialerEngine};
use crate::database::{campaigns, qualifications};
use crate::error::{DialerError, Result};
use crate::model::{
    Campaign, NewCampaign, NewQualification, NewQuotaRule, Qualification, QualificationGroup, QuotaRule,
};
use crate::notifier::ChangeKind;

fn build_rules(rules: Vec<NewQuotaRule>) -> Result<Vec<QuotaRule>> {
    rules
        .into_iter()
        .map(|rule| {
            rule.validate()?;
            Ok(QuotaRule {
                id: new_id(),
                contact_field: rule.contact_field,
                operator: rule.operator,
                value: rule.value,
                limit: rule.limit,
                current_count: rule.current_count,
            })
        })
        .collect()
}

impl DialerEngine {
    pub async fn create_qualification_group(&self, name: &str) -> Result<QualificationGroup> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DialerError::validation("qualification group name cannot be empty"));
        }

        let group = QualificationGroup {
            id: new_id(),
            name: name.to_string(),
            created_at: Utc::now(),
        };

        let mut tx = self.db.begin_immediate().await?;
        qualifications::insert_group(&mut *tx, &group).await?;
        tx.commit().await?;

        info!("📋 Created qualification group {} ({})", group.name, group.id);
        Ok(group)
    }

    pub async fn create_qualification(&self, new: NewQualification) -> Result<Qualification> {
        let label = new.label.trim();
        if label.is_empty() {
            return Err(DialerError::validation("qualification label cannot be empty"));
        }

        let qualification = Qualification {
            id: new_id(),
            group_id: new.group_id.clone(),
            label: label.to_string(),
            qualification_type: new.qualification_type,
            is_recyclable: new.is_recyclable,
            created_at: Utc::now(),
        };

        let mut tx = self.db.begin_immediate().await?;
        if qualifications::fetch_group(&mut *tx, &new.group_id).await?.is_none() {
            return Err(DialerError::not_found(format!("qualification group {}", new.group_id)));
        }
        qualifications::insert_qualification(&mut *tx, &qualification).await?;
        tx.commit().await?;

        info!(
            "📋 Created {} qualification '{}' in group {}",
            qualification.qualification_type, qualification.label, qualification.group_id
        );
        Ok(qualification)
    }

    pub async fn get_qualification(&self, qualification_id: &str) -> Result<Qualification> {
        let mut conn = self.db.acquire().await?;
        qualifications::fetch_qualification(&mut conn, qualification_id)
            .await?
            .ok_or_else(|| DialerError::not_found(format!("qualification {}", qualification_id)))
    }

    pub async fn list_qualifications(&self, group_id: &str) -> Result<Vec<Qualification>> {
        let mut conn = self.db.acquire().await?;
        if qualifications::fetch_group(&mut conn, group_id).await?.is_none() {
            return Err(DialerError::not_found(format!("qualification group {}", group_id)));
        }
        qualifications::list_group_qualifications(&mut conn, group_id).await
    }

    pub async fn create_campaign(&self, new: NewCampaign) -> Result<Campaign> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(DialerError::validation("campaign name cannot be empty"));
        }

        let now = Utc::now();
        let campaign = Campaign {
            id: new_id(),
            name: name.to_string(),
            quotas_enabled: new.quotas_enabled,
            qualification_group_id: new.qualification_group_id.clone(),
            quota_rules: build_rules(new.quota_rules)?,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin_immediate().await?;
        if let Some(group_id) = &campaign.qualification_group_id {
            if qualifications::fetch_group(&mut *tx, group_id).await?.is_none() {
                return Err(DialerError::not_found(format!("qualification group {}", group_id)));
            }
        }
        campaigns::insert_campaign(&mut *tx, &campaign).await?;
        tx.commit().await?;

        info!(
            "📋 Created campaign {} ({}) with {} quota rules",
            campaign.name,
            campaign.id,
            campaign.quota_rules.len()
        );
        self.flush(ChangeKind::CampaignCreated, &campaign.id).await;
        Ok(campaign)
    }

    /// Replace a campaign's quota rules, counters included
    pub async fn replace_quota_rules(&self, campaign_id: &str, rules: Vec<NewQuotaRule>) -> Result<Campaign> {
        let rules = build_rules(rules)?;

        let now = Utc::now();
        let mut tx = self.db.begin_immediate().await?;
        let campaign = replace_rules_in(&mut *tx, campaign_id, &rules, now).await?;
        tx.commit().await?;

        info!("📊 Campaign {} now has {} quota rules", campaign_id, campaign.quota_rules.len());
        self.flush(ChangeKind::QuotaRulesReplaced, campaign_id).await;
        Ok(campaign)
    }

    pub async fn set_quotas_enabled(&self, campaign_id: &str, enabled: bool) -> Result<Campaign> {
        let now = Utc::now();
        let mut tx = self.db.begin_immediate().await?;
        if !campaigns::set_quotas_enabled(&mut *tx, campaign_id, enabled, now).await? {
            return Err(DialerError::not_found(format!("campaign {}", campaign_id)));
        }
        let campaign = campaigns::fetch_campaign(&mut *tx, campaign_id)
            .await?
            .ok_or_else(|| DialerError::not_found(format!("campaign {}", campaign_id)))?;
        tx.commit().await?;

        info!("📊 Quotas {} for campaign {}", if enabled { "enabled" } else { "disabled" }, campaign_id);
        self.flush(ChangeKind::QuotaRulesReplaced, campaign_id).await;
        Ok(campaign)
    }

    pub async fn list_campaign_ids(&self) -> Result<Vec<String>> {
        let mut conn = self.db.acquire().await?;
        campaigns::list_campaign_ids(&mut conn).await
    }
}

async fn replace_rules_in(
    conn: &mut SqliteConnection,
    campaign_id: &str,
    rules: &[QuotaRule],
    now: DateTime<Utc>,
) -> Result<Campaign> {
    if !campaigns::touch_campaign(conn, campaign_id, now).await? {
        return Err(DialerError::not_found(format!("campaign {}", campaign_id)));
    }
    campaigns::delete_quota_rules(conn, campaign_id).await?;
    campaigns::insert_quota_rules(conn, campaign_id, rules).await?;

    campaigns::fetch_campaign(conn, campaign_id)
        .await?
        .ok_or_else(|| DialerError::not_found(format!("campaign {}", campaign_id)))
}
