//! Error types for the record store

/// Record store errors
///
/// Messages can contain backend detail; callers facing untrusted input
/// should surface [`StoreError::kind`] instead of the display text.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Entity or column name is not a plain identifier
    #[error("invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    /// Entity is not known to the store
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// Update or delete without a predicate
    #[error("refusing unbounded {0} on {1}")]
    UnboundedWrite(&'static str, String),

    /// Structurally invalid query
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// SQLite backend failure
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Stable category without backend or input detail
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier(_) => "invalid_identifier",
            Self::UnknownEntity(_) => "unknown_entity",
            Self::UnboundedWrite(..) => "unbounded_write",
            Self::InvalidQuery(_) => "invalid_query",
            Self::Sqlite(_) => "backend",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_hides_detail() {
        let err = StoreError::UnknownEntity("Customers' --".to_string());
        assert!(err.to_string().contains("Customers' --"));
        assert_eq!(err.kind(), "unknown_entity");
    }
}
