//! Call history database operations

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::rows::CallHistoryRow;
use crate::error::Result;
use crate::model::CallHistoryRecord;

pub async fn insert_history(conn: &mut SqliteConnection, record: &CallHistoryRecord) -> Result<()> {
    sqlx::query(
        "INSERT INTO call_history (id, contact_id, agent_id, campaign_id, qualification_id, start_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&record.id)
    .bind(&record.contact_id)
    .bind(&record.agent_id)
    .bind(&record.campaign_id)
    .bind(&record.qualification_id)
    .bind(record.start_time)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Most recent attempt by this agent on this contact that started at or
/// after `since` and was never qualified
pub async fn find_open_attempt(
    conn: &mut SqliteConnection,
    contact_id: &str,
    agent_id: &str,
    since: DateTime<Utc>,
) -> Result<Option<CallHistoryRecord>> {
    let rows = sqlx::query_as::<_, CallHistoryRow>(
        "SELECT id, contact_id, agent_id, campaign_id, qualification_id, start_time
         FROM call_history
         WHERE contact_id = ?1 AND agent_id = ?2 AND qualification_id IS NULL
         ORDER BY rowid DESC",
    )
    .bind(contact_id)
    .bind(agent_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(CallHistoryRecord::from)
        .filter(|record| record.start_time >= since)
        .max_by_key(|record| record.start_time))
}

pub async fn set_qualification(conn: &mut SqliteConnection, history_id: &str, qualification_id: &str) -> Result<()> {
    sqlx::query("UPDATE call_history SET qualification_id = ?1 WHERE id = ?2")
        .bind(qualification_id)
        .bind(history_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Full history of a contact, oldest first
pub async fn fetch_contact_history(conn: &mut SqliteConnection, contact_id: &str) -> Result<Vec<CallHistoryRecord>> {
    let rows = sqlx::query_as::<_, CallHistoryRow>(
        "SELECT id, contact_id, agent_id, campaign_id, qualification_id, start_time
         FROM call_history WHERE contact_id = ?1
         ORDER BY start_time ASC, rowid ASC",
    )
    .bind(contact_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(CallHistoryRecord::from).collect())
}
