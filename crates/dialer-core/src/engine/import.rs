//! Batch import with duplicate rejection, and manual contact entry.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use super::{new_id, DialerEngine};
use crate::database::{campaigns, contacts};
use crate::error::{DialerError, Result};
use crate::model::{Contact, ContactField, ContactStatus, NewContact};
use crate::notifier::ChangeKind;
use crate::validation::{self, ValidatedContact};

/// Duplicate detection settings for one import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupConfig {
    pub enabled: bool,
    /// Fields forming the composite key; empty means the configured default
    #[serde(default)]
    pub fields: Vec<ContactField>,
}

impl DedupConfig {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn on(fields: Vec<ContactField>) -> Self {
        Self { enabled: true, fields }
    }
}

/// Why a row was not imported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum RejectReason {
    Invalid(String),
    Duplicate,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Invalid(message) => write!(f, "invalid: {}", message),
            RejectReason::Duplicate => f.write_str("duplicate"),
        }
    }
}

/// A rejected input row and its position in the batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRow {
    pub index: usize,
    pub row: NewContact,
    pub reason: RejectReason,
}

/// Result of an import: inserted contacts and rejected rows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub valids: Vec<Contact>,
    pub invalids: Vec<RejectedRow>,
}

impl DialerEngine {
    /// Import a batch of rows into a campaign.
    ///
    /// Rows without a digits-only phone number are rejected. With dedup
    /// enabled, a row whose key matches an existing contact of the campaign
    /// or an earlier accepted row of the same batch is rejected as a
    /// duplicate. Accepted rows are inserted as `pending` in one transaction.
    pub async fn import_batch(&self, campaign_id: &str, rows: Vec<NewContact>, dedup: &DedupConfig) -> Result<ImportReport> {
        let max = self.config.import.max_batch_size;
        if rows.len() > max {
            return Err(DialerError::validation(format!(
                "batch of {} rows exceeds the limit of {}",
                rows.len(),
                max
            )));
        }

        let fields = if dedup.fields.is_empty() {
            self.config.import.default_dedup_fields.clone()
        } else {
            dedup.fields.clone()
        };
        let dedup_fields = dedup.enabled.then_some(fields.as_slice());

        let now = Utc::now();
        let mut tx = self.db.begin_immediate().await?;
        let report = import_in(&mut *tx, campaign_id, rows, dedup_fields, now).await?;
        tx.commit().await?;

        info!(
            "📥 Imported {} contacts into campaign {} ({} rejected)",
            report.valids.len(),
            campaign_id,
            report.invalids.len()
        );

        if !report.valids.is_empty() {
            self.flush(ChangeKind::ContactsImported, campaign_id).await;
        }
        Ok(report)
    }

    /// Manually add one contact, with the same validation as import
    pub async fn add_contact(&self, campaign_id: &str, row: NewContact) -> Result<Contact> {
        let valid = validation::validate_contact(&row)?;

        let now = Utc::now();
        let mut tx = self.db.begin_immediate().await?;
        ensure_campaign(&mut *tx, campaign_id).await?;
        let contact = new_pending_contact(campaign_id, valid, now);
        contacts::insert_contact(&mut *tx, &contact).await?;
        tx.commit().await?;

        debug!("Contact {} added to campaign {}", contact.id, campaign_id);
        self.flush(ChangeKind::ContactAdded, campaign_id).await;
        Ok(contact)
    }
}

async fn ensure_campaign(conn: &mut SqliteConnection, campaign_id: &str) -> Result<()> {
    match campaigns::fetch_campaign(conn, campaign_id).await? {
        Some(_) => Ok(()),
        None => Err(DialerError::not_found(format!("campaign {}", campaign_id))),
    }
}

fn new_pending_contact(campaign_id: &str, valid: ValidatedContact, now: DateTime<Utc>) -> Contact {
    Contact {
        id: new_id(),
        campaign_id: campaign_id.to_string(),
        first_name: valid.first_name,
        last_name: valid.last_name,
        phone_number: valid.phone_number,
        postal_code: valid.postal_code,
        custom_fields: valid.custom_fields,
        status: ContactStatus::Pending,
        locked_by: None,
        locked_at: None,
        created_at: now,
        updated_at: now,
    }
}

async fn import_in(
    conn: &mut SqliteConnection,
    campaign_id: &str,
    rows: Vec<NewContact>,
    dedup_fields: Option<&[ContactField]>,
    now: DateTime<Utc>,
) -> Result<ImportReport> {
    ensure_campaign(conn, campaign_id).await?;

    let mut seen: HashSet<String> = HashSet::new();
    if let Some(fields) = dedup_fields {
        for existing in contacts::fetch_campaign_contacts(conn, campaign_id).await? {
            seen.insert(validation::contact_dedup_key(fields, &existing));
        }
    }

    let mut report = ImportReport::default();

    for (index, row) in rows.into_iter().enumerate() {
        let valid = match validation::validate_contact(&row) {
            Ok(valid) => valid,
            Err(e) => {
                let message = match e {
                    DialerError::Validation(message) => message,
                    other => other.to_string(),
                };
                report.invalids.push(RejectedRow {
                    index,
                    row,
                    reason: RejectReason::Invalid(message),
                });
                continue;
            }
        };

        if let Some(fields) = dedup_fields {
            if !seen.insert(validation::row_dedup_key(fields, &valid)) {
                report.invalids.push(RejectedRow {
                    index,
                    row,
                    reason: RejectReason::Duplicate,
                });
                continue;
            }
        }

        let contact = new_pending_contact(campaign_id, valid, now);
        contacts::insert_contact(conn, &contact).await?;
        report.valids.push(contact);
    }

    Ok(report)
}
