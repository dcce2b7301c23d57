//! Plain data types exchanged with callers of the engine.

pub mod campaign;
pub mod contact;
pub mod qualification;

pub use campaign::{
    Campaign, CampaignSnapshot, ContactSummary, NewCampaign, NewQuotaRule, QuotaOperator,
    QuotaRule, QuotaRuleState, StatusCounts,
};
pub use contact::{
    Contact, ContactField, ContactStatus, CustomFields, NewContact, RECYCLED_AT_KEY,
    RELAUNCH_AT_KEY, RESERVED_KEYS,
};
pub use qualification::{
    CallHistoryRecord, Callback, CallbackStatus, NewQualification, Qualification,
    QualificationGroup, QualificationType, SYSTEM_QUALIFICATION_GROUP_ID, SYSTEM_UNQUALIFIED_ID,
};
