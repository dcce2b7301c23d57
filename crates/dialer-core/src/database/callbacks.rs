//! Personal callback database operations

use sqlx::SqliteConnection;

use super::rows::CallbackRow;
use crate::error::Result;
use crate::model::Callback;

pub async fn insert_callback(conn: &mut SqliteConnection, callback: &Callback) -> Result<()> {
    sqlx::query(
        "INSERT INTO callbacks (id, contact_id, agent_id, scheduled_at, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&callback.id)
    .bind(&callback.contact_id)
    .bind(&callback.agent_id)
    .bind(callback.scheduled_at)
    .bind(callback.status.as_str())
    .bind(callback.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn fetch_pending_callbacks(conn: &mut SqliteConnection, contact_id: &str) -> Result<Vec<Callback>> {
    let rows = sqlx::query_as::<_, CallbackRow>(
        "SELECT id, contact_id, agent_id, scheduled_at, status, created_at
         FROM callbacks WHERE contact_id = ?1 AND status = 'pending'
         ORDER BY scheduled_at ASC, rowid ASC",
    )
    .bind(contact_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(Callback::try_from).collect()
}

/// Mark the agent's pending callbacks on a contact as done
pub async fn complete_for_agent(conn: &mut SqliteConnection, contact_id: &str, agent_id: &str) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE callbacks SET status = 'done'
         WHERE contact_id = ?1 AND agent_id = ?2 AND status = 'pending'",
    )
    .bind(contact_id)
    .bind(agent_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn cancel_for_contact(conn: &mut SqliteConnection, contact_id: &str) -> Result<u64> {
    let result = sqlx::query("UPDATE callbacks SET status = 'cancelled' WHERE contact_id = ?1 AND status = 'pending'")
        .bind(contact_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
