//! Personal callbacks: a contact reserved for one agent.
//!
//! While a callback is pending, `pick_next` hands the contact only to the
//! agent it was scheduled for. Qualifying the contact as that agent marks
//! the callback done.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::info;

use super::{new_id, DialerEngine};
use crate::database::{callbacks, contacts};
use crate::error::{DialerError, Result};
use crate::model::{Callback, CallbackStatus, Contact, ContactStatus};
use crate::notifier::ChangeKind;

impl DialerEngine {
    /// Reserve a contact for an agent. Replaces any pending callback on the
    /// same contact.
    pub async fn schedule_callback(&self, contact_id: &str, agent_id: &str, at: DateTime<Utc>) -> Result<Callback> {
        if agent_id.trim().is_empty() {
            return Err(DialerError::validation("agent id is required"));
        }

        let now = Utc::now();
        let mut tx = self.db.begin_immediate().await?;
        let (callback, contact) = schedule_in(&mut *tx, contact_id, agent_id, at, now).await?;
        tx.commit().await?;

        info!("📅 Callback for contact {} scheduled for agent {} at {}", contact_id, agent_id, at);
        self.flush(ChangeKind::CallbackScheduled, &contact.campaign_id).await;
        Ok(callback)
    }

    /// Cancel every pending callback on a contact. Returns how many were
    /// cancelled.
    pub async fn cancel_callbacks(&self, contact_id: &str) -> Result<usize> {
        let mut tx = self.db.begin_immediate().await?;
        let contact = contacts::fetch_contact(&mut *tx, contact_id)
            .await?
            .ok_or_else(|| DialerError::not_found(format!("contact {}", contact_id)))?;
        let cancelled = callbacks::cancel_for_contact(&mut *tx, contact_id).await?;
        tx.commit().await?;

        if cancelled > 0 {
            info!("📅 Cancelled {} callbacks on contact {}", cancelled, contact_id);
            self.flush(ChangeKind::CallbacksCancelled, &contact.campaign_id).await;
        }
        Ok(cancelled as usize)
    }

    pub async fn pending_callbacks(&self, contact_id: &str) -> Result<Vec<Callback>> {
        let mut conn = self.db.acquire().await?;
        callbacks::fetch_pending_callbacks(&mut conn, contact_id).await
    }
}

async fn schedule_in(
    conn: &mut SqliteConnection,
    contact_id: &str,
    agent_id: &str,
    at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<(Callback, Contact)> {
    let contact = contacts::fetch_contact(conn, contact_id)
        .await?
        .ok_or_else(|| DialerError::not_found(format!("contact {}", contact_id)))?;

    if contact.status == ContactStatus::Qualified {
        return Err(DialerError::validation(format!(
            "contact {} is qualified; recycle it before scheduling a callback",
            contact_id
        )));
    }

    callbacks::cancel_for_contact(conn, contact_id).await?;

    let callback = Callback {
        id: new_id(),
        contact_id: contact_id.to_string(),
        agent_id: agent_id.to_string(),
        scheduled_at: at,
        status: CallbackStatus::Pending,
        created_at: now,
    };
    callbacks::insert_callback(conn, &callback).await?;

    Ok((callback, contact))
}
