//! Raw table rows and their conversion into model types.

use chrono::{DateTime, Utc};

use crate::error::{DialerError, Result};
use crate::model::{
    CallHistoryRecord, Callback, Contact, ContactField, ContactSummary, CustomFields,
    Qualification, QualificationGroup, QualificationType, QuotaOperator, QuotaRule,
};

/// Column list matching [`ContactRow`]
pub(crate) const CONTACT_COLUMNS: &str = "c.id, c.campaign_id, c.first_name, c.last_name, c.phone_number, \
     c.postal_code, c.custom_fields, c.status, c.locked_by, c.locked_at, c.created_at, c.updated_at";

#[derive(sqlx::FromRow, Debug)]
pub(crate) struct CampaignRow {
    pub id: String,
    pub name: String,
    pub quotas_enabled: bool,
    pub qualification_group_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug)]
pub(crate) struct QuotaRuleRow {
    pub id: String,
    pub contact_field: String,
    pub operator: String,
    pub value: String,
    pub quota_limit: i64,
    pub current_count: i64,
}

impl From<QuotaRuleRow> for QuotaRule {
    fn from(row: QuotaRuleRow) -> Self {
        QuotaRule {
            id: row.id,
            contact_field: ContactField::from(row.contact_field),
            operator: QuotaOperator::from(row.operator),
            value: row.value,
            limit: row.quota_limit,
            current_count: row.current_count,
        }
    }
}

#[derive(sqlx::FromRow, Debug)]
pub(crate) struct ContactRow {
    pub id: String,
    pub campaign_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: String,
    pub postal_code: Option<String>,
    pub custom_fields: String,
    pub status: String,
    pub locked_by: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ContactRow> for Contact {
    type Error = DialerError;

    fn try_from(row: ContactRow) -> Result<Self> {
        let custom_fields: CustomFields = serde_json::from_str(&row.custom_fields)?;
        Ok(Contact {
            id: row.id,
            campaign_id: row.campaign_id,
            first_name: row.first_name,
            last_name: row.last_name,
            phone_number: row.phone_number,
            postal_code: row.postal_code,
            custom_fields,
            status: row.status.parse()?,
            locked_by: row.locked_by,
            locked_at: row.locked_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow, Debug)]
pub(crate) struct ContactSummaryRow {
    pub id: String,
    pub phone_number: String,
    pub status: String,
    pub locked_by: Option<String>,
}

impl TryFrom<ContactSummaryRow> for ContactSummary {
    type Error = DialerError;

    fn try_from(row: ContactSummaryRow) -> Result<Self> {
        Ok(ContactSummary {
            id: row.id,
            phone_number: row.phone_number,
            status: row.status.parse()?,
            locked_by: row.locked_by,
        })
    }
}

#[derive(sqlx::FromRow, Debug)]
pub(crate) struct QualificationGroupRow {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<QualificationGroupRow> for QualificationGroup {
    fn from(row: QualificationGroupRow) -> Self {
        QualificationGroup {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow, Debug)]
pub(crate) struct QualificationRow {
    pub id: String,
    pub group_id: String,
    pub label: String,
    pub qualification_type: String,
    pub is_recyclable: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<QualificationRow> for Qualification {
    type Error = DialerError;

    fn try_from(row: QualificationRow) -> Result<Self> {
        let qualification_type = row
            .qualification_type
            .parse::<QualificationType>()
            .map_err(|e| DialerError::internal(e.to_string()))?;
        Ok(Qualification {
            id: row.id,
            group_id: row.group_id,
            label: row.label,
            qualification_type,
            is_recyclable: row.is_recyclable,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow, Debug)]
pub(crate) struct CallHistoryRow {
    pub id: String,
    pub contact_id: String,
    pub agent_id: String,
    pub campaign_id: String,
    pub qualification_id: Option<String>,
    pub start_time: DateTime<Utc>,
}

impl From<CallHistoryRow> for CallHistoryRecord {
    fn from(row: CallHistoryRow) -> Self {
        CallHistoryRecord {
            id: row.id,
            contact_id: row.contact_id,
            agent_id: row.agent_id,
            campaign_id: row.campaign_id,
            qualification_id: row.qualification_id,
            start_time: row.start_time,
        }
    }
}

#[derive(sqlx::FromRow, Debug)]
pub(crate) struct CallbackRow {
    pub id: String,
    pub contact_id: String,
    pub agent_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CallbackRow> for Callback {
    type Error = DialerError;

    fn try_from(row: CallbackRow) -> Result<Self> {
        Ok(Callback {
            id: row.id,
            contact_id: row.contact_id,
            agent_id: row.agent_id,
            scheduled_at: row.scheduled_at,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}
