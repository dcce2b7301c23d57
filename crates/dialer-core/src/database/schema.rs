//! Database schema definitions for the dialer
//!
//! Tables for qualification groups, qualifications, campaigns, quota rules,
//! contacts, call history and personal callbacks. Every statement is
//! idempotent so the schema can be applied on each startup.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::Result;
use crate::model::{SYSTEM_QUALIFICATION_GROUP_ID, SYSTEM_UNQUALIFIED_ID};

/// Create the qualification groups table
pub async fn create_qualification_groups_table(conn: &mut SqliteConnection) -> Result<()> {
    debug!("📋 Creating qualification_groups table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS qualification_groups (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Create the qualifications table
pub async fn create_qualifications_table(conn: &mut SqliteConnection) -> Result<()> {
    debug!("📋 Creating qualifications table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS qualifications (
            id TEXT PRIMARY KEY,
            group_id TEXT NOT NULL REFERENCES qualification_groups(id),
            label TEXT NOT NULL,
            qualification_type TEXT NOT NULL
                CHECK (qualification_type IN ('positive', 'negative', 'neutral')),
            is_recyclable INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Create the campaigns table
pub async fn create_campaigns_table(conn: &mut SqliteConnection) -> Result<()> {
    debug!("📋 Creating campaigns table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS campaigns (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            quotas_enabled INTEGER NOT NULL DEFAULT 0,
            qualification_group_id TEXT REFERENCES qualification_groups(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Create the quota rules table.
///
/// Counters live in their own rows so a positive qualification only has to
/// touch the one rule it matched.
pub async fn create_quota_rules_table(conn: &mut SqliteConnection) -> Result<()> {
    debug!("📋 Creating quota_rules table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS quota_rules (
            id TEXT PRIMARY KEY,
            campaign_id TEXT NOT NULL REFERENCES campaigns(id),
            position INTEGER NOT NULL,
            contact_field TEXT NOT NULL,
            operator TEXT NOT NULL,
            value TEXT NOT NULL,
            quota_limit INTEGER NOT NULL,
            current_count INTEGER NOT NULL DEFAULT 0,
            UNIQUE (campaign_id, position)
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Create the contacts table
pub async fn create_contacts_table(conn: &mut SqliteConnection) -> Result<()> {
    debug!("📋 Creating contacts table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            id TEXT PRIMARY KEY,
            campaign_id TEXT NOT NULL REFERENCES campaigns(id),
            first_name TEXT,
            last_name TEXT,
            phone_number TEXT NOT NULL,
            postal_code TEXT,
            custom_fields TEXT NOT NULL DEFAULT '{}',
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'called', 'qualified')),
            locked_by TEXT,
            locked_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (locked_by IS NULL OR status <> 'qualified')
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Create the call history table
pub async fn create_call_history_table(conn: &mut SqliteConnection) -> Result<()> {
    debug!("📋 Creating call_history table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS call_history (
            id TEXT PRIMARY KEY,
            contact_id TEXT NOT NULL REFERENCES contacts(id),
            agent_id TEXT NOT NULL,
            campaign_id TEXT NOT NULL REFERENCES campaigns(id),
            qualification_id TEXT REFERENCES qualifications(id),
            start_time TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Create the personal callbacks table
pub async fn create_callbacks_table(conn: &mut SqliteConnection) -> Result<()> {
    debug!("📋 Creating callbacks table");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS callbacks (
            id TEXT PRIMARY KEY,
            contact_id TEXT NOT NULL REFERENCES contacts(id),
            agent_id TEXT NOT NULL,
            scheduled_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'done', 'cancelled')),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Create indexes for performance
pub async fn create_indexes(conn: &mut SqliteConnection) -> Result<()> {
    debug!("📋 Creating database indexes");

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_contacts_allocation ON contacts(campaign_id, status, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_contacts_locked_by ON contacts(locked_by)",
        "CREATE INDEX IF NOT EXISTS idx_quota_rules_campaign ON quota_rules(campaign_id, position)",
        "CREATE INDEX IF NOT EXISTS idx_call_history_contact ON call_history(contact_id, start_time)",
        "CREATE INDEX IF NOT EXISTS idx_callbacks_contact ON callbacks(contact_id, status)",
    ];

    for index in indexes {
        sqlx::query(index).execute(&mut *conn).await?;
    }

    Ok(())
}

/// Insert the system group and its sentinel "unqualified" outcome
pub async fn seed_system_qualifications(conn: &mut SqliteConnection) -> Result<()> {
    let now = Utc::now();

    sqlx::query("INSERT OR IGNORE INTO qualification_groups (id, name, created_at) VALUES (?1, 'System', ?2)")
        .bind(SYSTEM_QUALIFICATION_GROUP_ID)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT OR IGNORE INTO qualifications (id, group_id, label, qualification_type, is_recyclable, created_at)
         VALUES (?1, ?2, 'Unqualified (system)', 'neutral', 0, ?3)",
    )
    .bind(SYSTEM_UNQUALIFIED_ID)
    .bind(SYSTEM_QUALIFICATION_GROUP_ID)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
