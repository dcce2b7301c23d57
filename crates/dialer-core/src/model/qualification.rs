//! Qualifications (call outcome codes), call history and personal callbacks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DialerError, Result};

/// Group holding the engine's own qualifications
pub const SYSTEM_QUALIFICATION_GROUP_ID: &str = "system";

/// Sentinel applied to completed calls left unqualified by a vanished agent
pub const SYSTEM_UNQUALIFIED_ID: &str = "system-unqualified";

/// Outcome category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationType {
    Positive,
    Negative,
    Neutral,
}

impl QualificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualificationType::Positive => "positive",
            QualificationType::Negative => "negative",
            QualificationType::Neutral => "neutral",
        }
    }
}

impl fmt::Display for QualificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualificationType {
    type Err = DialerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "positive" => Ok(QualificationType::Positive),
            "negative" => Ok(QualificationType::Negative),
            "neutral" => Ok(QualificationType::Neutral),
            other => Err(DialerError::validation(format!(
                "unknown qualification type '{}'",
                other
            ))),
        }
    }
}

/// Named set of qualifications a campaign draws from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualificationGroup {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Categorized outcome code assigned to a completed call attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Qualification {
    pub id: String,
    pub group_id: String,
    pub label: String,
    pub qualification_type: QualificationType,
    pub is_recyclable: bool,
    pub created_at: DateTime<Utc>,
}

impl Qualification {
    pub fn is_positive(&self) -> bool {
        self.qualification_type == QualificationType::Positive
    }

    pub fn is_system(&self) -> bool {
        self.group_id == SYSTEM_QUALIFICATION_GROUP_ID
    }
}

/// Request to create a qualification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewQualification {
    pub group_id: String,
    pub label: String,
    pub qualification_type: QualificationType,
    #[serde(default)]
    pub is_recyclable: bool,
}

/// One call attempt, optionally carrying its outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallHistoryRecord {
    pub id: String,
    pub contact_id: String,
    pub agent_id: String,
    pub campaign_id: String,
    pub qualification_id: Option<String>,
    pub start_time: DateTime<Utc>,
}

impl CallHistoryRecord {
    pub fn is_qualified(&self) -> bool {
        self.qualification_id.is_some()
    }
}

/// Personal callback lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStatus {
    Pending,
    Done,
    Cancelled,
}

impl CallbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackStatus::Pending => "pending",
            CallbackStatus::Done => "done",
            CallbackStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for CallbackStatus {
    type Err = DialerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(CallbackStatus::Pending),
            "done" => Ok(CallbackStatus::Done),
            "cancelled" => Ok(CallbackStatus::Cancelled),
            other => Err(DialerError::internal(format!("unknown callback status '{}'", other))),
        }
    }
}

/// A contact reserved for one agent to call back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Callback {
    pub id: String,
    pub contact_id: String,
    pub agent_id: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: CallbackStatus,
    pub created_at: DateTime<Utc>,
}
