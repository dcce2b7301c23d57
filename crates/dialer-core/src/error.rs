use thiserror::Error;

/// Dialer engine errors
#[derive(Error, Debug)]
pub enum DialerError {
    /// Malformed input (non-numeric phone, reserved custom field, bad transition)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing contact, campaign, qualification or callback
    #[error("Not found: {0}")]
    NotFound(String),

    /// Contact is locked by another agent
    #[error("Contact {contact_id} is locked by agent {holder}")]
    Conflict { contact_id: String, holder: String },

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored JSON could not be read or written
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error category surfaced to callers of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Internal,
}

impl DialerError {
    /// Create a new Validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new NotFound error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Conflict error naming the current lock holder
    pub fn conflict<S: Into<String>, H: Into<String>>(contact_id: S, holder: H) -> Self {
        Self::Conflict {
            contact_id: contact_id.into(),
            holder: holder.into(),
        }
    }

    /// Create a new Config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new Internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Category of this error. Store, config and serialization failures are
    /// all internal: the transaction was rolled back and nothing persisted.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Database(_) | Self::Serialization(_) | Self::Config(_) | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Agent currently holding the lock, for conflict messaging
    pub fn lock_holder(&self) -> Option<&str> {
        match self {
            Self::Conflict { holder, .. } => Some(holder.as_str()),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for DialerError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for dialer operations
pub type Result<T> = std::result::Result<T, DialerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(DialerError::validation("bad phone").kind(), ErrorKind::Validation);
        assert_eq!(DialerError::not_found("contact c1").kind(), ErrorKind::NotFound);
        assert_eq!(DialerError::internal("boom").kind(), ErrorKind::Internal);
        assert_eq!(DialerError::config("bad").kind(), ErrorKind::Internal);
        assert_eq!(DialerError::Database(sqlx::Error::RowNotFound).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_conflict_names_holder() {
        let err = DialerError::conflict("c1", "agent-007");
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.lock_holder(), Some("agent-007"));
        assert_eq!(err.to_string(), "Contact c1 is locked by agent agent-007");
    }
}
