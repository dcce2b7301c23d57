//! Contacts, their lifecycle status and the free-form attribute map.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DialerError, Result};

/// Reserved custom field gating allocation until the given instant
pub const RELAUNCH_AT_KEY: &str = "relaunch_at";

/// Reserved custom field stamped when a contact is recycled
pub const RECYCLED_AT_KEY: &str = "recycled_at";

/// Keys owned by the engine; callers may not set them directly
pub const RESERVED_KEYS: &[&str] = &[RELAUNCH_AT_KEY, RECYCLED_AT_KEY];

/// Contact lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    Pending,
    Called,
    Qualified,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::Pending => "pending",
            ContactStatus::Called => "called",
            ContactStatus::Qualified => "qualified",
        }
    }

    /// Transition table.
    ///
    /// ```text
    /// pending   -> called | qualified | pending (relaunch)
    /// called    -> called (re-attempt) | qualified | pending (relaunch)
    /// qualified -> pending (recycle)
    /// ```
    pub fn can_transition_to(self, next: ContactStatus) -> bool {
        use ContactStatus::*;
        matches!(
            (self, next),
            (Pending, Called)
                | (Pending, Qualified)
                | (Pending, Pending)
                | (Called, Called)
                | (Called, Qualified)
                | (Called, Pending)
                | (Qualified, Pending)
        )
    }

    /// Checked transition, failing with a validation error when the table
    /// forbids the move.
    pub fn transition(self, next: ContactStatus) -> Result<ContactStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DialerError::validation(format!(
                "contact cannot move from {} to {}",
                self, next
            )))
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactStatus {
    type Err = DialerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ContactStatus::Pending),
            "called" => Ok(ContactStatus::Called),
            "qualified" => Ok(ContactStatus::Qualified),
            other => Err(DialerError::internal(format!("unknown contact status '{}'", other))),
        }
    }
}

/// Ordered string-keyed attribute map attached to every contact.
///
/// `relaunch_at` and `recycled_at` are reserved: they are written only by the
/// engine and hold RFC 3339 timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomFields(BTreeMap<String, String>);

impl CustomFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from caller-supplied attributes, rejecting reserved and blank keys
    pub fn from_user_input(fields: BTreeMap<String, String>) -> Result<Self> {
        for key in fields.keys() {
            if key.trim().is_empty() {
                return Err(DialerError::validation("custom field keys cannot be blank"));
            }
            if RESERVED_KEYS.contains(&key.as_str()) {
                return Err(DialerError::validation(format!(
                    "custom field '{}' is reserved",
                    key
                )));
            }
        }
        Ok(Self(fields))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Instant before which the contact must not be allocated
    pub fn relaunch_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.timestamp(RELAUNCH_AT_KEY)
    }

    pub fn recycled_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.timestamp(RECYCLED_AT_KEY)
    }

    pub(crate) fn set_relaunch_at(&mut self, at: DateTime<Utc>) {
        self.0.insert(RELAUNCH_AT_KEY.to_string(), at.to_rfc3339());
    }

    pub(crate) fn set_recycled_at(&mut self, at: DateTime<Utc>) {
        self.0.insert(RECYCLED_AT_KEY.to_string(), at.to_rfc3339());
    }

    /// True when no relaunch gate is set or the gate has elapsed
    pub fn relaunch_elapsed(&self, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.relaunch_at()?.map_or(true, |at| at <= now))
    }

    fn timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|e| {
                    DialerError::validation(format!("custom field '{}' is not a timestamp: {}", key, e))
                }),
        }
    }
}

/// A dialable call-list record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub campaign_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: String,
    pub postal_code: Option<String>,
    pub custom_fields: CustomFields,
    pub status: ContactStatus,
    pub locked_by: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    pub fn is_locked(&self) -> bool {
        self.locked_by.is_some()
    }

    pub fn is_locked_by(&self, agent_id: &str) -> bool {
        self.locked_by.as_deref() == Some(agent_id)
    }

    /// Value of a named attribute, used by quota rules and dedup keys
    pub fn field_value(&self, field: &ContactField) -> Option<&str> {
        match field {
            ContactField::PhoneNumber => Some(self.phone_number.as_str()),
            ContactField::FirstName => self.first_name.as_deref(),
            ContactField::LastName => self.last_name.as_deref(),
            ContactField::PostalCode => self.postal_code.as_deref(),
            ContactField::Custom(key) => self.custom_fields.get(key),
        }
    }
}

/// A contact row as supplied by import or manual entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: String,
    pub postal_code: Option<String>,
    pub custom_fields: BTreeMap<String, String>,
}

impl NewContact {
    pub fn with_phone<S: Into<String>>(phone_number: S) -> Self {
        Self {
            phone_number: phone_number.into(),
            ..Default::default()
        }
    }

    pub fn field_value(&self, field: &ContactField) -> Option<&str> {
        match field {
            ContactField::PhoneNumber => Some(self.phone_number.as_str()),
            ContactField::FirstName => self.first_name.as_deref(),
            ContactField::LastName => self.last_name.as_deref(),
            ContactField::PostalCode => self.postal_code.as_deref(),
            ContactField::Custom(key) => self.custom_fields.get(key).map(String::as_str),
        }
    }
}

/// Named contact attribute, either a built-in column or a custom field key.
///
/// Serialized as a plain string: `phone_number`, `first_name`, `last_name`,
/// `postal_code`, or any other string for a custom field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContactField {
    PhoneNumber,
    FirstName,
    LastName,
    PostalCode,
    Custom(String),
}

impl ContactField {
    pub fn as_str(&self) -> &str {
        match self {
            ContactField::PhoneNumber => "phone_number",
            ContactField::FirstName => "first_name",
            ContactField::LastName => "last_name",
            ContactField::PostalCode => "postal_code",
            ContactField::Custom(key) => key.as_str(),
        }
    }
}

impl From<String> for ContactField {
    fn from(s: String) -> Self {
        match s.as_str() {
            "phone_number" | "phoneNumber" => ContactField::PhoneNumber,
            "first_name" | "firstName" => ContactField::FirstName,
            "last_name" | "lastName" => ContactField::LastName,
            "postal_code" | "postalCode" => ContactField::PostalCode,
            _ => ContactField::Custom(s),
        }
    }
}

impl From<&str> for ContactField {
    fn from(s: &str) -> Self {
        ContactField::from(s.to_string())
    }
}

impl From<ContactField> for String {
    fn from(field: ContactField) -> Self {
        field.as_str().to_string()
    }
}

impl fmt::Display for ContactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_transition_table() {
        use ContactStatus::*;
        assert!(Pending.can_transition_to(Called));
        assert!(Called.can_transition_to(Qualified));
        assert!(Qualified.can_transition_to(Pending));
        assert!(!Qualified.can_transition_to(Called));
        assert!(!Qualified.can_transition_to(Qualified));
        assert!(Qualified.transition(Called).is_err());
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [ContactStatus::Pending, ContactStatus::Called, ContactStatus::Qualified] {
            assert_eq!(status.as_str().parse::<ContactStatus>().unwrap(), status);
        }
        assert!("done".parse::<ContactStatus>().is_err());
    }

    #[test]
    fn test_reserved_keys_rejected_at_boundary() {
        let mut fields = BTreeMap::new();
        fields.insert("segment".to_string(), "gold".to_string());
        assert!(CustomFields::from_user_input(fields.clone()).is_ok());

        fields.insert(RELAUNCH_AT_KEY.to_string(), "2030-01-01T00:00:00Z".to_string());
        let err = CustomFields::from_user_input(fields).unwrap_err();
        assert!(matches!(err, DialerError::Validation(_)));
    }

    #[test]
    fn test_relaunch_gate() {
        let now = Utc::now();
        let mut fields = CustomFields::new();
        assert!(fields.relaunch_elapsed(now).unwrap());

        fields.set_relaunch_at(now + Duration::hours(1));
        assert!(!fields.relaunch_elapsed(now).unwrap());
        assert!(fields.relaunch_elapsed(now + Duration::hours(2)).unwrap());
    }

    #[test]
    fn test_contact_field_parsing() {
        assert_eq!(ContactField::from("postal_code"), ContactField::PostalCode);
        assert_eq!(ContactField::from("postalCode"), ContactField::PostalCode);
        assert_eq!(ContactField::from("segment"), ContactField::Custom("segment".to_string()));
        assert_eq!(String::from(ContactField::LastName), "last_name");
    }
}
