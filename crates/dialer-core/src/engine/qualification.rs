//! Qualification and recycling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use super::{new_id, DialerEngine};
use crate::database::{callbacks, campaigns, contacts, history, qualifications};
use crate::error::{DialerError, Result};
use crate::model::{CallHistoryRecord, Contact, ContactStatus};
use crate::notifier::ChangeKind;
use crate::quota;

/// Outcome an agent assigns to a contact at the end of a call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifyRequest {
    pub contact_id: String,
    pub qualification_id: String,
    pub campaign_id: String,
    pub agent_id: String,
    /// Put the contact back in the pool, not to be handed out before this
    /// instant
    #[serde(default)]
    pub relaunch_at: Option<DateTime<Utc>>,
}

impl QualifyRequest {
    pub fn new(
        contact_id: impl Into<String>,
        qualification_id: impl Into<String>,
        campaign_id: impl Into<String>,
        agent_id: impl Into<String>,
    ) -> Self {
        Self {
            contact_id: contact_id.into(),
            qualification_id: qualification_id.into(),
            campaign_id: campaign_id.into(),
            agent_id: agent_id.into(),
            relaunch_at: None,
        }
    }

    pub fn relaunch_at(mut self, at: DateTime<Utc>) -> Self {
        self.relaunch_at = Some(at);
        self
    }
}

/// What a committed qualification changed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualifyOutcome {
    pub contact: Contact,
    pub history: CallHistoryRecord,
    /// Quota rule whose counter was incremented, if any
    pub quota_rule_id: Option<String>,
}

impl DialerEngine {
    /// Record the outcome of a call.
    ///
    /// Runs with the campaign row held for the whole transaction, so quota
    /// counters move one qualification at a time. A positive outcome
    /// increments the first matching rule with remaining capacity. With a
    /// relaunch instant the contact returns to `pending` behind that gate,
    /// otherwise it becomes `qualified`; either way its lock is cleared and
    /// one call-history row carrying the outcome is appended.
    pub async fn qualify(&self, request: QualifyRequest) -> Result<QualifyOutcome> {
        let now = Utc::now();
        let mut tx = self.db.begin_immediate().await?;
        let outcome = qualify_in(&mut *tx, &request, now).await?;
        tx.commit().await?;

        info!(
            "✅ Contact {} qualified as {} by agent {}{}",
            request.contact_id,
            request.qualification_id,
            request.agent_id,
            if request.relaunch_at.is_some() { " (relaunch scheduled)" } else { "" }
        );
        if let Some(rule_id) = &outcome.quota_rule_id {
            debug!("📊 Quota rule {} incremented", rule_id);
        }

        self.flush(ChangeKind::ContactQualified, &request.campaign_id).await;
        Ok(outcome)
    }

    /// Put back to `pending` every qualified contact of the campaign whose
    /// latest qualification is the given recyclable one. Returns how many
    /// contacts moved; a non-recyclable qualification moves none. Pending
    /// callbacks on a recycled contact are cancelled.
    pub async fn recycle(&self, campaign_id: &str, qualification_id: &str) -> Result<usize> {
        let now = Utc::now();
        let mut tx = self.db.begin_immediate().await?;
        let count = recycle_in(&mut *tx, campaign_id, qualification_id, now).await?;
        tx.commit().await?;

        if count > 0 {
            info!("♻️ Recycled {} contacts of campaign {} ({})", count, campaign_id, qualification_id);
            self.flush(ChangeKind::ContactsRecycled, campaign_id).await;
        }
        Ok(count)
    }
}

async fn qualify_in(conn: &mut SqliteConnection, request: &QualifyRequest, now: DateTime<Utc>) -> Result<QualifyOutcome> {
    if !campaigns::touch_campaign(conn, &request.campaign_id, now).await? {
        return Err(DialerError::not_found(format!("campaign {}", request.campaign_id)));
    }
    let campaign = campaigns::fetch_campaign(conn, &request.campaign_id)
        .await?
        .ok_or_else(|| DialerError::not_found(format!("campaign {}", request.campaign_id)))?;

    let mut contact = contacts::fetch_contact(conn, &request.contact_id)
        .await?
        .ok_or_else(|| DialerError::not_found(format!("contact {}", request.contact_id)))?;
    if contact.campaign_id != campaign.id {
        return Err(DialerError::validation(format!(
            "contact {} does not belong to campaign {}",
            contact.id, campaign.id
        )));
    }

    let qualification = qualifications::fetch_qualification(conn, &request.qualification_id)
        .await?
        .ok_or_else(|| DialerError::not_found(format!("qualification {}", request.qualification_id)))?;
    if let Some(group_id) = &campaign.qualification_group_id {
        if &qualification.group_id != group_id && !qualification.is_system() {
            return Err(DialerError::validation(format!(
                "qualification {} is not part of campaign {}'s qualification group",
                qualification.id, campaign.id
            )));
        }
    }

    if let Some(holder) = contact.locked_by.as_deref() {
        if holder != request.agent_id {
            return Err(DialerError::conflict(&contact.id, holder));
        }
    }
    if contact.status == ContactStatus::Qualified {
        return Err(DialerError::validation(format!("contact {} is already qualified", contact.id)));
    }

    let mut quota_rule_id = None;
    if qualification.is_positive() {
        if let Some(rule) = quota::match_rule(&contact, &campaign.quota_rules) {
            campaigns::increment_quota(conn, &rule.id).await?;
            quota_rule_id = Some(rule.id.clone());
        }
    }

    let next = if request.relaunch_at.is_some() {
        ContactStatus::Pending
    } else {
        ContactStatus::Qualified
    };
    contact.status = contact.status.transition(next)?;
    if let Some(at) = request.relaunch_at {
        contact.custom_fields.set_relaunch_at(at);
    }
    contact.locked_by = None;
    contact.locked_at = None;
    contact.updated_at = now;
    contacts::save_contact_state(conn, &contact).await?;

    let record = CallHistoryRecord {
        id: new_id(),
        contact_id: contact.id.clone(),
        agent_id: request.agent_id.clone(),
        campaign_id: campaign.id.clone(),
        qualification_id: Some(qualification.id.clone()),
        start_time: now,
    };
    history::insert_history(conn, &record).await?;

    callbacks::complete_for_agent(conn, &contact.id, &request.agent_id).await?;

    Ok(QualifyOutcome {
        contact,
        history: record,
        quota_rule_id,
    })
}

async fn recycle_in(
    conn: &mut SqliteConnection,
    campaign_id: &str,
    qualification_id: &str,
    now: DateTime<Utc>,
) -> Result<usize> {
    if campaigns::fetch_campaign(conn, campaign_id).await?.is_none() {
        return Err(DialerError::not_found(format!("campaign {}", campaign_id)));
    }
    let qualification = qualifications::fetch_qualification(conn, qualification_id)
        .await?
        .ok_or_else(|| DialerError::not_found(format!("qualification {}", qualification_id)))?;

    if !qualification.is_recyclable {
        debug!("Qualification {} is not recyclable, nothing to do", qualification_id);
        return Ok(0);
    }

    let candidates = contacts::fetch_recycle_candidates(conn, campaign_id, qualification_id).await?;
    let count = candidates.len();

    for mut contact in candidates {
        contact.status = contact.status.transition(ContactStatus::Pending)?;
        contact.custom_fields.set_recycled_at(now);
        contact.updated_at = now;
        contacts::save_contact_state(conn, &contact).await?;
        callbacks::cancel_for_contact(conn, &contact.id).await?;
    }

    Ok(count)
}
