//! # Dialer Engine
//!
//! [`DialerEngine`] is the entry point for every operation agents and
//! administrators perform against the contact pool. Each operation runs in
//! its own write transaction; once the transaction commits, the engine reads
//! a fresh [`CampaignSnapshot`] and hands it to the configured
//! [`ChangeNotifier`]. A failure while building or delivering the snapshot
//! is logged and never surfaces to the caller, whose mutation has already
//! committed.
//!
//! Operations are grouped by concern:
//!
//! - [`allocator`]: `pick_next`
//! - [`locks`]: `lock`, `release`, `release_all_for_agent`,
//!   `sweep_stale_locks`, `record_call_attempt`
//! - [`qualification`]: `qualify`, `recycle`
//! - [`import`]: `import_batch`, `add_contact`
//! - [`admin`]: campaigns, quota rules and qualification catalogs
//! - [`callbacks`]: personal callbacks

pub mod admin;
pub mod allocator;
pub mod callbacks;
pub mod import;
pub mod locks;
pub mod qualification;

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::config::DialerConfig;
use crate::database::{campaigns, contacts, history, DialerDatabase};
use crate::error::{DialerError, Result};
use crate::model::{CallHistoryRecord, Campaign, CampaignSnapshot, Contact};
use crate::notifier::{ChangeEvent, ChangeKind, ChangeNotifier, NoopNotifier};

pub use allocator::Allocation;
pub use import::{DedupConfig, ImportReport, RejectReason, RejectedRow};
pub use locks::ReleaseSummary;
pub use qualification::{QualifyOutcome, QualifyRequest};

/// Contact distribution and locking engine
#[derive(Clone)]
pub struct DialerEngine {
    db: DialerDatabase,
    config: Arc<DialerConfig>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl DialerEngine {
    /// Open the configured database and build an engine around it
    pub async fn new(config: DialerConfig, notifier: Arc<dyn ChangeNotifier>) -> Result<Self> {
        config.validate()?;
        let db = DialerDatabase::new(&config.database).await?;
        Ok(Self::with_database(db, config, notifier))
    }

    pub fn with_database(db: DialerDatabase, config: DialerConfig, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            notifier,
        }
    }

    /// In-memory engine with default configuration and no notifier
    pub async fn in_memory() -> Result<Self> {
        let db = DialerDatabase::new_in_memory().await?;
        Ok(Self::with_database(db, DialerConfig::default(), Arc::new(NoopNotifier)))
    }

    pub fn database(&self) -> &DialerDatabase {
        &self.db
    }

    pub fn config(&self) -> &DialerConfig {
        &self.config
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.db.health_check().await
    }

    pub async fn get_campaign(&self, campaign_id: &str) -> Result<Campaign> {
        let mut conn = self.db.acquire().await?;
        campaigns::fetch_campaign(&mut conn, campaign_id)
            .await?
            .ok_or_else(|| DialerError::not_found(format!("campaign {}", campaign_id)))
    }

    pub async fn get_contact(&self, contact_id: &str) -> Result<Contact> {
        let mut conn = self.db.acquire().await?;
        contacts::fetch_contact(&mut conn, contact_id)
            .await?
            .ok_or_else(|| DialerError::not_found(format!("contact {}", contact_id)))
    }

    /// Call history of a contact, oldest first
    pub async fn contact_history(&self, contact_id: &str) -> Result<Vec<CallHistoryRecord>> {
        let mut conn = self.db.acquire().await?;
        if contacts::fetch_contact(&mut conn, contact_id).await?.is_none() {
            return Err(DialerError::not_found(format!("contact {}", contact_id)));
        }
        history::fetch_contact_history(&mut conn, contact_id).await
    }

    /// Current state of a campaign: quota counters and every contact
    pub async fn campaign_snapshot(&self, campaign_id: &str) -> Result<CampaignSnapshot> {
        self.load_snapshot(campaign_id)
            .await?
            .ok_or_else(|| DialerError::not_found(format!("campaign {}", campaign_id)))
    }

    async fn load_snapshot(&self, campaign_id: &str) -> Result<Option<CampaignSnapshot>> {
        let mut conn = self.db.acquire().await?;
        let Some(campaign) = campaigns::fetch_campaign(&mut conn, campaign_id).await? else {
            return Ok(None);
        };
        let summaries = contacts::fetch_contact_summaries(&mut conn, campaign_id).await?;
        Ok(Some(CampaignSnapshot::build(&campaign, summaries)))
    }

    /// Publish a committed change. Must only be called after the write
    /// transaction has committed and released its connection.
    pub(crate) async fn flush(&self, kind: ChangeKind, campaign_id: &str) -> Option<CampaignSnapshot> {
        let snapshot = match self.load_snapshot(campaign_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("⚠️ Could not read snapshot of campaign {} after {:?}: {}", campaign_id, kind, e);
                None
            }
        };

        self.notifier.publish(ChangeEvent {
            kind,
            campaign_id: campaign_id.to_string(),
            snapshot: snapshot.clone(),
            at: Utc::now(),
        });

        snapshot
    }

    /// Publish one change per distinct campaign, in first-seen order
    pub(crate) async fn flush_many<'a, I>(&self, kind: ChangeKind, campaign_ids: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen: Vec<&str> = Vec::new();
        for campaign_id in campaign_ids {
            if !seen.contains(&campaign_id) {
                seen.push(campaign_id);
                self.flush(kind, campaign_id).await;
            }
        }
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
