//! Campaigns, quota rules and the snapshot broadcast after every mutation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::contact::{ContactField, ContactStatus};
use crate::error::{DialerError, Result};

/// Quota rule predicate operator.
///
/// Rules written by other systems may carry operators this engine does not
/// know; those are kept as `Unrecognized` and never match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuotaOperator {
    Equals,
    StartsWith,
    Unrecognized(String),
}

impl QuotaOperator {
    pub fn as_str(&self) -> &str {
        match self {
            QuotaOperator::Equals => "equals",
            QuotaOperator::StartsWith => "starts_with",
            QuotaOperator::Unrecognized(op) => op.as_str(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, QuotaOperator::Unrecognized(_))
    }
}

impl From<String> for QuotaOperator {
    fn from(s: String) -> Self {
        match s.as_str() {
            "equals" => QuotaOperator::Equals,
            "starts_with" | "startsWith" => QuotaOperator::StartsWith,
            _ => QuotaOperator::Unrecognized(s),
        }
    }
}

impl From<&str> for QuotaOperator {
    fn from(s: &str) -> Self {
        QuotaOperator::from(s.to_string())
    }
}

impl From<QuotaOperator> for String {
    fn from(op: QuotaOperator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for QuotaOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cap on how many positively-qualified contacts may match a predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaRule {
    pub id: String,
    pub contact_field: ContactField,
    pub operator: QuotaOperator,
    pub value: String,
    pub limit: i64,
    pub current_count: i64,
}

impl QuotaRule {
    pub fn has_capacity(&self) -> bool {
        self.current_count < self.limit
    }
}

/// Quota rule definition supplied when configuring a campaign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQuotaRule {
    pub contact_field: ContactField,
    pub operator: QuotaOperator,
    pub value: String,
    pub limit: i64,
    #[serde(default)]
    pub current_count: i64,
}

impl NewQuotaRule {
    pub fn new<F: Into<ContactField>, O: Into<QuotaOperator>, V: Into<String>>(
        contact_field: F,
        operator: O,
        value: V,
        limit: i64,
    ) -> Self {
        Self {
            contact_field: contact_field.into(),
            operator: operator.into(),
            value: value.into(),
            limit,
            current_count: 0,
        }
    }

    pub fn with_current_count(mut self, current_count: i64) -> Self {
        self.current_count = current_count;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.operator.is_recognized() {
            return Err(DialerError::validation(format!(
                "unknown quota operator '{}'",
                self.operator
            )));
        }
        if self.value.is_empty() {
            return Err(DialerError::validation("quota rule value cannot be empty"));
        }
        if self.limit < 0 || self.current_count < 0 {
            return Err(DialerError::validation("quota limit and count must not be negative"));
        }
        Ok(())
    }
}

/// Container of contacts with dialing and quota configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub quotas_enabled: bool,
    pub qualification_group_id: Option<String>,
    pub quota_rules: Vec<QuotaRule>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a campaign
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCampaign {
    pub name: String,
    #[serde(default)]
    pub quotas_enabled: bool,
    #[serde(default)]
    pub qualification_group_id: Option<String>,
    #[serde(default)]
    pub quota_rules: Vec<NewQuotaRule>,
}

impl NewCampaign {
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Quota state as published in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaRuleState {
    pub rule_id: String,
    pub contact_field: ContactField,
    pub operator: QuotaOperator,
    pub value: String,
    pub limit: i64,
    pub current_count: i64,
    pub exhausted: bool,
}

impl From<&QuotaRule> for QuotaRuleState {
    fn from(rule: &QuotaRule) -> Self {
        Self {
            rule_id: rule.id.clone(),
            contact_field: rule.contact_field.clone(),
            operator: rule.operator.clone(),
            value: rule.value.clone(),
            limit: rule.limit,
            current_count: rule.current_count,
            exhausted: !rule.has_capacity(),
        }
    }
}

/// One line of the snapshot's contact list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactSummary {
    pub id: String,
    pub phone_number: String,
    pub status: ContactStatus,
    pub locked_by: Option<String>,
}

/// Contact counts per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub called: usize,
    pub qualified: usize,
    pub locked: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.called + self.qualified
    }
}

/// Aggregated campaign view handed to the change notifier and to agents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSnapshot {
    pub campaign_id: String,
    pub name: String,
    pub quotas_enabled: bool,
    pub quota_rules: Vec<QuotaRuleState>,
    pub contacts: Vec<ContactSummary>,
    pub counts: StatusCounts,
    pub taken_at: DateTime<Utc>,
}

impl CampaignSnapshot {
    pub fn build(campaign: &Campaign, contacts: Vec<ContactSummary>) -> Self {
        let mut counts = StatusCounts::default();
        for contact in &contacts {
            match contact.status {
                ContactStatus::Pending => counts.pending += 1,
                ContactStatus::Called => counts.called += 1,
                ContactStatus::Qualified => counts.qualified += 1,
            }
            if contact.locked_by.is_some() {
                counts.locked += 1;
            }
        }

        Self {
            campaign_id: campaign.id.clone(),
            name: campaign.name.clone(),
            quotas_enabled: campaign.quotas_enabled,
            quota_rules: campaign.quota_rules.iter().map(QuotaRuleState::from).collect(),
            contacts,
            counts,
            taken_at: Utc::now(),
        }
    }

    pub fn rule(&self, rule_id: &str) -> Option<&QuotaRuleState> {
        self.quota_rules.iter().find(|r| r.rule_id == rule_id)
    }
}
