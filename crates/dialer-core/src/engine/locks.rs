//! Lock manager: per-contact exclusive work locks tied to an agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use super::{new_id, DialerEngine};
use crate::database::{contacts, history};
use crate::error::{DialerError, Result};
use crate::model::{CallHistoryRecord, Contact, ContactStatus, SYSTEM_UNQUALIFIED_ID};
use crate::notifier::ChangeKind;

/// Outcome of releasing every lock an agent (or a sweep) held
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseSummary {
    /// Contacts whose lock was cleared
    pub released: Vec<String>,
    /// Subset of `released` closed with the system "unqualified" outcome
    pub auto_qualified: Vec<String>,
}

impl ReleaseSummary {
    pub fn is_empty(&self) -> bool {
        self.released.is_empty()
    }
}

struct Released {
    summary: ReleaseSummary,
    campaign_ids: Vec<String>,
}

impl DialerEngine {
    /// Acquire or refresh the lock on a contact.
    ///
    /// Re-entrant for the current holder, which keeps its original lock
    /// time. Fails with `Conflict` naming the
    /// holder when another agent has it, and with `Validation` when the
    /// contact is already qualified.
    pub async fn lock(&self, contact_id: &str, agent_id: &str) -> Result<Contact> {
        if agent_id.trim().is_empty() {
            return Err(DialerError::validation("agent id is required"));
        }

        let now = Utc::now();
        let mut tx = self.db.begin_immediate().await?;
        let contact = lock_in(&mut *tx, contact_id, agent_id, now).await?;
        tx.commit().await?;

        debug!("🔒 Contact {} locked by agent {}", contact_id, agent_id);
        self.flush(ChangeKind::ContactLocked, &contact.campaign_id).await;
        Ok(contact)
    }

    /// Clear the lock on a contact, whoever holds it. Status is unchanged.
    pub async fn release(&self, contact_id: &str) -> Result<Contact> {
        let now = Utc::now();
        let mut tx = self.db.begin_immediate().await?;
        let (contact, was_locked) = release_in(&mut *tx, contact_id, now).await?;
        tx.commit().await?;

        if was_locked {
            debug!("🔓 Contact {} released", contact_id);
            self.flush(ChangeKind::ContactReleased, &contact.campaign_id).await;
        }
        Ok(contact)
    }

    /// Release everything an agent holds, typically when its session is
    /// evicted. The call must complete before the eviction is acknowledged.
    ///
    /// A contact with an unqualified call attempt by this agent since the
    /// lock was taken is closed with the system "unqualified" outcome;
    /// any other contact loses its lock and is left `pending`.
    pub async fn release_all_for_agent(&self, agent_id: &str) -> Result<ReleaseSummary> {
        let now = Utc::now();
        let mut tx = self.db.begin_immediate().await?;
        let held = contacts::fetch_locked_by_agent(&mut *tx, agent_id).await?;
        let released = resolve_locks(&mut *tx, held, now).await?;
        tx.commit().await?;

        if !released.summary.is_empty() {
            info!(
                "🔓 Released {} contacts held by agent {} ({} auto-qualified)",
                released.summary.released.len(),
                agent_id,
                released.summary.auto_qualified.len()
            );
            self.flush_many(ChangeKind::AgentReleased, released.campaign_ids.iter().map(String::as_str))
                .await;
        }

        Ok(released.summary)
    }

    /// Resolve every lock older than the configured stale age, exactly as
    /// `release_all_for_agent` would for its holder.
    pub async fn sweep_stale_locks(&self) -> Result<ReleaseSummary> {
        let now = Utc::now();
        let cutoff = now - self.config.locks.stale_after();

        let mut tx = self.db.begin_immediate().await?;
        let stale: Vec<Contact> = contacts::fetch_all_locked(&mut *tx)
            .await?
            .into_iter()
            .filter(|c| c.locked_at.map_or(true, |at| at <= cutoff))
            .collect();
        let released = resolve_locks(&mut *tx, stale, now).await?;
        tx.commit().await?;

        if !released.summary.is_empty() {
            warn!("🧹 Swept {} stale contact locks", released.summary.released.len());
            self.flush_many(ChangeKind::StaleLocksSwept, released.campaign_ids.iter().map(String::as_str))
                .await;
        }

        Ok(released.summary)
    }

    /// Record that the lock holder started dialing the contact: appends an
    /// open call-history row and moves the contact to `called`.
    pub async fn record_call_attempt(&self, contact_id: &str, agent_id: &str) -> Result<CallHistoryRecord> {
        let now = Utc::now();
        let mut tx = self.db.begin_immediate().await?;
        let record = record_attempt_in(&mut *tx, contact_id, agent_id, now).await?;
        tx.commit().await?;

        debug!("📞 Agent {} dialing contact {}", agent_id, contact_id);
        self.flush(ChangeKind::CallAttemptRecorded, &record.campaign_id).await;
        Ok(record)
    }
}

async fn lock_in(conn: &mut SqliteConnection, contact_id: &str, agent_id: &str, now: DateTime<Utc>) -> Result<Contact> {
    let mut contact = contacts::fetch_contact(conn, contact_id)
        .await?
        .ok_or_else(|| DialerError::not_found(format!("contact {}", contact_id)))?;

    if let Some(holder) = contact.locked_by.as_deref() {
        if holder != agent_id {
            return Err(DialerError::conflict(contact_id, holder));
        }
    }

    if contact.status == ContactStatus::Qualified {
        return Err(DialerError::validation(format!(
            "contact {} is qualified and cannot be locked",
            contact_id
        )));
    }

    if !contacts::lock_contact(conn, contact_id, agent_id, now).await? {
        return Err(DialerError::internal(format!("lock on contact {} was not applied", contact_id)));
    }

    if !contact.is_locked_by(agent_id) {
        contact.locked_at = Some(now);
    }
    contact.locked_by = Some(agent_id.to_string());
    contact.updated_at = now;
    Ok(contact)
}

async fn release_in(conn: &mut SqliteConnection, contact_id: &str, now: DateTime<Utc>) -> Result<(Contact, bool)> {
    let mut contact = contacts::fetch_contact(conn, contact_id)
        .await?
        .ok_or_else(|| DialerError::not_found(format!("contact {}", contact_id)))?;

    if !contact.is_locked() {
        return Ok((contact, false));
    }

    contact.locked_by = None;
    contact.locked_at = None;
    contact.updated_at = now;
    contacts::save_contact_state(conn, &contact).await?;
    Ok((contact, true))
}

async fn record_attempt_in(
    conn: &mut SqliteConnection,
    contact_id: &str,
    agent_id: &str,
    now: DateTime<Utc>,
) -> Result<CallHistoryRecord> {
    let mut contact = contacts::fetch_contact(conn, contact_id)
        .await?
        .ok_or_else(|| DialerError::not_found(format!("contact {}", contact_id)))?;

    match contact.locked_by.as_deref() {
        Some(holder) if holder == agent_id => {}
        Some(holder) => return Err(DialerError::conflict(contact_id, holder)),
        None => {
            return Err(DialerError::validation(format!(
                "contact {} must be locked by agent {} before dialing",
                contact_id, agent_id
            )))
        }
    }

    contact.status = contact.status.transition(ContactStatus::Called)?;
    contact.updated_at = now;
    contacts::save_contact_state(conn, &contact).await?;

    let record = CallHistoryRecord {
        id: new_id(),
        contact_id: contact.id.clone(),
        agent_id: agent_id.to_string(),
        campaign_id: contact.campaign_id.clone(),
        qualification_id: None,
        start_time: now,
    };
    history::insert_history(conn, &record).await?;
    Ok(record)
}

/// Clear each lock, closing contacts left with an open attempt by their
/// holder with the system "unqualified" outcome. Every other contact goes
/// back to `pending`.
async fn resolve_locks(conn: &mut SqliteConnection, held: Vec<Contact>, now: DateTime<Utc>) -> Result<Released> {
    let mut released = Released {
        summary: ReleaseSummary::default(),
        campaign_ids: Vec::new(),
    };

    for mut contact in held {
        let Some(holder) = contact.locked_by.clone() else {
            continue;
        };
        let since = contact.locked_at.unwrap_or(DateTime::<Utc>::MIN_UTC);

        if let Some(attempt) = history::find_open_attempt(conn, &contact.id, &holder, since).await? {
            history::set_qualification(conn, &attempt.id, SYSTEM_UNQUALIFIED_ID).await?;
            contact.status = contact.status.transition(ContactStatus::Qualified)?;
            released.summary.auto_qualified.push(contact.id.clone());
            debug!("Contact {} closed as unqualified after agent {} left", contact.id, holder);
        } else if contact.status == ContactStatus::Called {
            contact.status = contact.status.transition(ContactStatus::Pending)?;
        }

        contact.locked_by = None;
        contact.locked_at = None;
        contact.updated_at = now;
        contacts::save_contact_state(conn, &contact).await?;

        released.summary.released.push(contact.id.clone());
        released.campaign_ids.push(contact.campaign_id);
    }

    Ok(released)
}
