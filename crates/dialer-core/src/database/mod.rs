//! SQLite-backed store for campaigns, contacts, call history and callbacks.
//!
//! Reads go through the pool. Every mutation runs inside a transaction from
//! [`DialerDatabase::begin_immediate`], opened with `BEGIN IMMEDIATE` so
//! concurrent writers queue on the database write lock at the start of the
//! transaction rather than failing on a read-to-write upgrade halfway through.
//! A transaction dropped before commit is rolled back by sqlx and its
//! connection goes back to the pool.

pub mod callbacks;
pub mod campaigns;
pub mod contacts;
pub mod history;
pub mod qualifications;
pub mod schema;

mod rows;

use std::str::FromStr;

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, error, info};

use crate::config::DatabaseConfig;
use crate::error::Result;

/// Dialer database manager
#[derive(Clone)]
pub struct DialerDatabase {
    pool: SqlitePool,
}

impl DialerDatabase {
    /// Open (creating if needed) the database named by the configuration
    /// and bring the schema up to date.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        if config.is_in_memory() {
            return Self::new_in_memory().await;
        }

        info!("🗄️ Initializing dialer database at: {}", config.url);

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout())
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let database = Self { pool };
        database.initialize_schema().await?;

        info!("✅ Dialer database initialized successfully");
        Ok(database)
    }

    /// Create in-memory database for testing.
    ///
    /// An in-memory SQLite database lives and dies with its connection, so
    /// the pool is pinned to a single connection that is never recycled.
    /// Writers therefore take turns on that connection.
    pub async fn new_in_memory() -> Result<Self> {
        info!("🗄️ Creating in-memory dialer database");

        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let database = Self { pool };
        database.initialize_schema().await?;

        info!("✅ In-memory database created successfully");
        Ok(database)
    }

    async fn initialize_schema(&self) -> Result<()> {
        debug!("📋 Creating dialer database schema");

        let mut conn = self.pool.acquire().await?;

        schema::create_qualification_groups_table(&mut conn).await?;
        schema::create_qualifications_table(&mut conn).await?;
        schema::create_campaigns_table(&mut conn).await?;
        schema::create_quota_rules_table(&mut conn).await?;
        schema::create_contacts_table(&mut conn).await?;
        schema::create_call_history_table(&mut conn).await?;
        schema::create_callbacks_table(&mut conn).await?;
        schema::create_indexes(&mut conn).await?;
        schema::seed_system_qualifications(&mut conn).await?;

        debug!("✅ Database schema created successfully");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Pooled connection for reads outside a write transaction
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    /// Start a write transaction holding the database write lock
    pub async fn begin_immediate(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    /// Execute a health check query
    pub async fn health_check(&self) -> Result<bool> {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => {
                debug!("💚 Database health check passed");
                Ok(true)
            }
            Err(e) => {
                error!("❌ Database health check failed: {}", e);
                Ok(false)
            }
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
