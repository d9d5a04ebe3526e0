//! Error types for the incident guard
//!
//! Two layers:
//! - [`Rejection`]: the caller-facing (code, message) pair. Terminal and
//!   never retryable; it carries no backend detail.
//! - [`GuardError`]: infrastructure failures (store, corrupt records) raised
//!   while guarding. These are logged internally and surfaced to callers as
//!   a generic internal rejection.

use incident_model::{IncidentId, LifecycleEvent, ModelError};
use incident_store::StoreError;
use serde::Serialize;

/// Message for a failed or unsafe customer lookup
pub const INVALID_CUSTOMER: &str = "Invalid customer identifier";

/// Message for closing a high-urgency incident without privileges
pub const HIGH_URGENCY_CLOSE: &str = "Only administrators can close high-urgency incidents";

/// Rejection category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RejectionKind {
    /// Target record does not exist
    NotFound,
    /// Role or state policy violation
    Forbidden,
    /// Malformed or unsafe input
    InvalidInput,
    /// Identifier already taken
    Conflict,
    /// Backend failure; detail withheld
    Internal,
}

impl RejectionKind {
    /// Numeric status code
    #[inline]
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Forbidden => 403,
            Self::InvalidInput => 400,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }
}

/// Caller-facing rejection: numeric code plus human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{code} {message}")]
pub struct Rejection {
    /// Category
    pub kind: RejectionKind,
    /// Numeric status code
    pub code: u16,
    /// Message shown to the caller
    pub message: String,
}

impl Rejection {
    /// Create rejection of a kind
    #[must_use]
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code(),
            message: message.into(),
        }
    }

    /// 404 for a missing incident
    #[must_use]
    pub fn not_found(id: IncidentId) -> Self {
        Self::new(RejectionKind::NotFound, format!("Incident {id} not found"))
    }

    /// 403 for touching a closed incident without privileges
    #[must_use]
    pub fn closed_incident(event: LifecycleEvent) -> Self {
        Self::new(
            RejectionKind::Forbidden,
            format!("Cannot {} a closed incident", event.verb()),
        )
    }

    /// 403 for closing a high-urgency incident without privileges
    #[must_use]
    pub fn high_urgency_close() -> Self {
        Self::new(RejectionKind::Forbidden, HIGH_URGENCY_CLOSE)
    }

    /// 403 for an admin-only operation
    #[must_use]
    pub fn admin_required() -> Self {
        Self::new(RejectionKind::Forbidden, "Administrator role required")
    }

    /// 400 for a lookup that failed or was unsafe
    #[must_use]
    pub fn invalid_customer() -> Self {
        Self::new(RejectionKind::InvalidInput, INVALID_CUSTOMER)
    }

    /// 400 for an update/delete that names no incident
    #[must_use]
    pub fn missing_target() -> Self {
        Self::new(RejectionKind::InvalidInput, "Missing incident identifier")
    }

    /// 400 for a create payload that cannot form an incident
    #[must_use]
    pub fn invalid_payload() -> Self {
        Self::new(RejectionKind::InvalidInput, "Invalid incident payload")
    }

    /// 409 for a create reusing an existing incident identifier
    #[must_use]
    pub fn duplicate_incident(id: IncidentId) -> Self {
        Self::new(RejectionKind::Conflict, format!("Incident {id} already exists"))
    }

    /// 500 with no detail
    #[must_use]
    pub fn internal() -> Self {
        Self::new(RejectionKind::Internal, "Internal error")
    }

    /// Rejections are logical request problems, never transient
    #[inline]
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }
}

/// Infrastructure failures while guarding or persisting
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// Record store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Persisted record could not be read
    #[error("corrupt record: {0}")]
    Model(#[from] ModelError),
}

impl GuardError {
    /// Stable category without backend or input detail
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Store(e) => e.kind(),
            Self::Model(_) => "corrupt_record",
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Could not read the config file
    #[error("io error reading {path}: {source}")]
    Io {
        /// File path
        path: std::path::PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Not valid TOML for the config shape
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Parsed but semantically invalid
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
