//! Post-commit change notification.
//!
//! The engine publishes one [`ChangeEvent`] after each committed mutation.
//! Publishing is synchronous and infallible from the engine's point of view:
//! a notifier that cannot deliver drops the event, and nothing it does can
//! undo the mutation that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::model::CampaignSnapshot;

/// Which operation produced the change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    CampaignCreated,
    QuotaRulesReplaced,
    ContactAllocated,
    ContactLocked,
    ContactReleased,
    AgentReleased,
    StaleLocksSwept,
    CallAttemptRecorded,
    ContactQualified,
    ContactsRecycled,
    ContactsImported,
    ContactAdded,
    CallbackScheduled,
    CallbacksCancelled,
}

/// A committed change and the campaign state right after it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub campaign_id: String,
    /// `None` when the snapshot could not be read after commit
    pub snapshot: Option<CampaignSnapshot>,
    pub at: DateTime<Utc>,
}

/// Receiver of post-commit change events
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, event: ChangeEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn publish(&self, _event: ChangeEvent) {}
}

/// Fans events out to any number of in-process subscribers
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ChangeEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl ChangeNotifier for BroadcastNotifier {
    fn publish(&self, event: ChangeEvent) {
        // No receivers is not an error
        if self.sender.send(event).is_err() {
            trace!("change event dropped, no subscribers");
        }
    }
}
