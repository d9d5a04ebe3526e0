//! Error types for the incident model
//!
//! Covers conversion failures between wire codes, stored records and the
//! typed model.

/// Model conversion errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Unknown status code on the wire or in a record
    #[error("unknown status code: '{0}'")]
    UnknownStatus(String),

    /// Unknown urgency code on the wire or in a record
    #[error("unknown urgency code: '{0}'")]
    UnknownUrgency(String),

    /// Required field missing when materializing a record
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Field present but of the wrong shape
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// Column or field name
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },
}

impl ModelError {
    /// Create an invalid-field error
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_display() {
        let err = ModelError::UnknownStatus("X".to_string());
        assert_eq!(err.to_string(), "unknown status code: 'X'");

        let err = ModelError::invalid_field("ID", "not a uuid");
        assert!(err.to_string().contains("invalid field ID"));
    }
}
