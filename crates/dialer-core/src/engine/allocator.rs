//! Distribution allocator: hand the next eligible contact to an agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use super::DialerEngine;
use crate::database::{campaigns, contacts};
use crate::error::{DialerError, Result};
use crate::model::{CampaignSnapshot, Contact};
use crate::notifier::ChangeKind;
use crate::quota;

/// A contact claimed for an agent, with the campaign state right after the
/// claim committed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub contact: Contact,
    pub snapshot: Option<CampaignSnapshot>,
}

impl DialerEngine {
    /// Claim the oldest eligible contact of the campaign for the agent.
    ///
    /// Candidates are read in FIFO pages; each one is checked for an elapsed
    /// relaunch gate and quota eligibility, then claimed with a guarded
    /// update. A claim that affects no row means another writer got there
    /// first and the next candidate is tried. `Ok(None)` means nothing is
    /// currently eligible.
    pub async fn pick_next(&self, campaign_id: &str, agent_id: &str) -> Result<Option<Allocation>> {
        if agent_id.trim().is_empty() {
            return Err(DialerError::validation("agent id is required"));
        }

        let now = Utc::now();
        let mut tx = self.db.begin_immediate().await?;
        let claimed = self.claim_next(&mut *tx, campaign_id, agent_id, now).await?;
        tx.commit().await?;
        let Some(contact) = claimed else {
            debug!("📋 No eligible contact in campaign {} for agent {}", campaign_id, agent_id);
            return Ok(None);
        };

        info!("🎯 Allocated contact {} of campaign {} to agent {}", contact.id, campaign_id, agent_id);

        let snapshot = self.flush(ChangeKind::ContactAllocated, campaign_id).await;
        Ok(Some(Allocation { contact, snapshot }))
    }

    async fn claim_next(
        &self,
        conn: &mut SqliteConnection,
        campaign_id: &str,
        agent_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Contact>> {
        let campaign = campaigns::fetch_campaign(conn, campaign_id)
            .await?
            .ok_or_else(|| DialerError::not_found(format!("campaign {}", campaign_id)))?;

        let page_size = i64::from(self.config.allocation.candidate_batch_size);
        let mut offset = 0i64;

        loop {
            let page = contacts::fetch_candidates(conn, campaign_id, agent_id, page_size, offset).await?;
            if page.is_empty() {
                return Ok(None);
            }
            offset += page.len() as i64;

            for mut candidate in page {
                match candidate.custom_fields.relaunch_elapsed(now) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        warn!("Skipping contact {} with unreadable relaunch gate: {}", candidate.id, e);
                        continue;
                    }
                }

                if !quota::is_eligible(&campaign, &candidate) {
                    continue;
                }

                if contacts::claim_contact(conn, &candidate.id, agent_id, now).await? {
                    if !candidate.is_locked_by(agent_id) {
                        candidate.locked_at = Some(now);
                    }
                    candidate.locked_by = Some(agent_id.to_string());
                    candidate.updated_at = now;
                    return Ok(Some(candidate));
                }

                debug!("Contact {} was claimed concurrently, trying next candidate", candidate.id);
            }
        }
    }
}
