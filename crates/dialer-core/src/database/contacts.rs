//! Contact database operations (sqlx-based)

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::rows::{ContactRow, ContactSummaryRow, CONTACT_COLUMNS};
use crate::error::Result;
use crate::model::{Contact, ContactSummary};

fn into_contacts(rows: Vec<ContactRow>) -> Result<Vec<Contact>> {
    rows.into_iter().map(Contact::try_from).collect()
}

pub async fn insert_contact(conn: &mut SqliteConnection, contact: &Contact) -> Result<()> {
    let custom_fields = serde_json::to_string(&contact.custom_fields)?;

    sqlx::query(
        "INSERT INTO contacts (id, campaign_id, first_name, last_name, phone_number, postal_code,
                               custom_fields, status, locked_by, locked_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    )
    .bind(&contact.id)
    .bind(&contact.campaign_id)
    .bind(&contact.first_name)
    .bind(&contact.last_name)
    .bind(&contact.phone_number)
    .bind(&contact.postal_code)
    .bind(custom_fields)
    .bind(contact.status.as_str())
    .bind(&contact.locked_by)
    .bind(contact.locked_at)
    .bind(contact.created_at)
    .bind(contact.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn fetch_contact(conn: &mut SqliteConnection, contact_id: &str) -> Result<Option<Contact>> {
    let row = sqlx::query_as::<_, ContactRow>(&format!("SELECT {} FROM contacts c WHERE c.id = ?1", CONTACT_COLUMNS))
        .bind(contact_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(Contact::try_from).transpose()
}

/// One page of allocation candidates in FIFO order.
///
/// Covers the store-side conditions: pending, unlocked or already held by
/// this agent, and not reserved by a pending callback for another agent.
/// Relaunch gating and quota eligibility are checked by the caller.
pub async fn fetch_candidates(
    conn: &mut SqliteConnection,
    campaign_id: &str,
    agent_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Contact>> {
    let sql = format!(
        "SELECT {} FROM contacts c
         WHERE c.campaign_id = ?1
           AND c.status = 'pending'
           AND (c.locked_by IS NULL OR c.locked_by = ?2)
           AND NOT EXISTS (
               SELECT 1 FROM callbacks cb
               WHERE cb.contact_id = c.id AND cb.status = 'pending' AND cb.agent_id <> ?2
           )
         ORDER BY c.created_at ASC, c.rowid ASC
         LIMIT ?3 OFFSET ?4",
        CONTACT_COLUMNS
    );

    let rows = sqlx::query_as::<_, ContactRow>(&sql)
        .bind(campaign_id)
        .bind(agent_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;

    into_contacts(rows)
}

/// Guarded claim: only succeeds while the row is still pending and free
/// (or already held by the same agent). Returns false when the row was taken.
pub async fn claim_contact(
    conn: &mut SqliteConnection,
    contact_id: &str,
    agent_id: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE contacts
         SET locked_at = CASE WHEN locked_by = ?1 THEN locked_at ELSE ?2 END, locked_by = ?1, updated_at = ?2
         WHERE id = ?3 AND status = 'pending' AND (locked_by IS NULL OR locked_by = ?1)",
    )
    .bind(agent_id)
    .bind(now)
    .bind(contact_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Acquire or refresh a lock on any non-qualified contact. Returns false
/// when another agent holds it or the contact is qualified. A refresh by the
/// holder keeps the original `locked_at`.
pub async fn lock_contact(
    conn: &mut SqliteConnection,
    contact_id: &str,
    agent_id: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE contacts
         SET locked_at = CASE WHEN locked_by = ?1 THEN locked_at ELSE ?2 END, locked_by = ?1, updated_at = ?2
         WHERE id = ?3 AND status <> 'qualified' AND (locked_by IS NULL OR locked_by = ?1)",
    )
    .bind(agent_id)
    .bind(now)
    .bind(contact_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Persist the mutable part of a contact: status, custom fields and lock
pub async fn save_contact_state(conn: &mut SqliteConnection, contact: &Contact) -> Result<()> {
    let custom_fields = serde_json::to_string(&contact.custom_fields)?;

    sqlx::query(
        "UPDATE contacts
         SET status = ?1, custom_fields = ?2, locked_by = ?3, locked_at = ?4, updated_at = ?5
         WHERE id = ?6",
    )
    .bind(contact.status.as_str())
    .bind(custom_fields)
    .bind(&contact.locked_by)
    .bind(contact.locked_at)
    .bind(contact.updated_at)
    .bind(&contact.id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub async fn fetch_locked_by_agent(conn: &mut SqliteConnection, agent_id: &str) -> Result<Vec<Contact>> {
    let rows = sqlx::query_as::<_, ContactRow>(&format!(
        "SELECT {} FROM contacts c WHERE c.locked_by = ?1 ORDER BY c.created_at ASC, c.rowid ASC",
        CONTACT_COLUMNS
    ))
    .bind(agent_id)
    .fetch_all(&mut *conn)
    .await?;

    into_contacts(rows)
}

pub async fn fetch_all_locked(conn: &mut SqliteConnection) -> Result<Vec<Contact>> {
    let rows = sqlx::query_as::<_, ContactRow>(&format!(
        "SELECT {} FROM contacts c WHERE c.locked_by IS NOT NULL ORDER BY c.created_at ASC, c.rowid ASC",
        CONTACT_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;

    into_contacts(rows)
}

pub async fn fetch_campaign_contacts(conn: &mut SqliteConnection, campaign_id: &str) -> Result<Vec<Contact>> {
    let rows = sqlx::query_as::<_, ContactRow>(&format!(
        "SELECT {} FROM contacts c WHERE c.campaign_id = ?1 ORDER BY c.created_at ASC, c.rowid ASC",
        CONTACT_COLUMNS
    ))
    .bind(campaign_id)
    .fetch_all(&mut *conn)
    .await?;

    into_contacts(rows)
}

pub async fn fetch_contact_summaries(conn: &mut SqliteConnection, campaign_id: &str) -> Result<Vec<ContactSummary>> {
    let rows = sqlx::query_as::<_, ContactSummaryRow>(
        "SELECT id, phone_number, status, locked_by FROM contacts
         WHERE campaign_id = ?1 ORDER BY created_at ASC, rowid ASC",
    )
    .bind(campaign_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(ContactSummary::try_from).collect()
}

/// Qualified contacts whose most recent qualified call-history record
/// carries the given qualification
pub async fn fetch_recycle_candidates(
    conn: &mut SqliteConnection,
    campaign_id: &str,
    qualification_id: &str,
) -> Result<Vec<Contact>> {
    let sql = format!(
        "SELECT {} FROM contacts c
         WHERE c.campaign_id = ?1
           AND c.status = 'qualified'
           AND (
               SELECT h.qualification_id FROM call_history h
               WHERE h.contact_id = c.id AND h.qualification_id IS NOT NULL
               ORDER BY h.start_time DESC, h.rowid DESC
               LIMIT 1
           ) = ?2
         ORDER BY c.created_at ASC, c.rowid ASC",
        CONTACT_COLUMNS
    );

    let rows = sqlx::query_as::<_, ContactRow>(&sql)
        .bind(campaign_id)
        .bind(qualification_id)
        .fetch_all(&mut *conn)
        .await?;

    into_contacts(rows)
}
