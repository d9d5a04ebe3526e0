//! Guard configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! admin_role = "admin"
//! escalation_keyword = "urgent"
//! incident_entity = "Incidents"
//! customer_entity = "Customers"
//! customer_id_column = "ID"
//! max_customer_id_len = 128
//! require_admin_for_lookup = true
//! ```

use crate::error::ConfigError;
use incident_model::ADMIN_ROLE;
use incident_store::validate_identifier;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Guard and gateway configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Role tag with override rights
    pub admin_role: String,
    /// Title keyword that escalates urgency on create
    pub escalation_keyword: String,
    /// Entity holding incidents
    pub incident_entity: String,
    /// Entity holding customers
    pub customer_entity: String,
    /// Key column of the customer entity
    pub customer_id_column: String,
    /// Longest accepted customer identifier, in characters
    pub max_customer_id_len: usize,
    /// Restrict customer lookup to the admin role
    pub require_admin_for_lookup: bool,
}

impl GuardConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With admin role
    #[inline]
    #[must_use]
    pub fn with_admin_role(mut self, role: impl Into<String>) -> Self {
        self.admin_role = role.into();
        self
    }

    /// With escalation keyword
    #[inline]
    #[must_use]
    pub fn with_escalation_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.escalation_keyword = keyword.into();
        self
    }

    /// With customer entity
    #[inline]
    #[must_use]
    pub fn with_customer_entity(mut self, entity: impl Into<String>) -> Self {
        self.customer_entity = entity.into();
        self
    }

    /// With max customer identifier length
    #[inline]
    #[must_use]
    pub fn with_max_customer_id_len(mut self, len: usize) -> Self {
        self.max_customer_id_len = len;
        self
    }

    /// With or without the admin gate on lookups
    #[inline]
    #[must_use]
    pub fn with_lookup_admin_gate(mut self, enabled: bool) -> Self {
        self.require_admin_for_lookup = enabled;
        self
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// `ConfigError::Parse` for malformed TOML, `ConfigError::Invalid` when
    /// [`GuardConfig::validate`] fails.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, otherwise as
    /// [`GuardConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check semantic constraints
    ///
    /// # Errors
    /// `ConfigError::Invalid` for empty role/keyword, non-identifier entity
    /// names, or a zero length limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin_role.trim().is_empty() {
            return Err(ConfigError::Invalid("admin_role must not be empty".to_string()));
        }
        if self.escalation_keyword.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "escalation_keyword must not be empty".to_string(),
            ));
        }
        for (field, name) in [
            ("incident_entity", &self.incident_entity),
            ("customer_entity", &self.customer_entity),
            ("customer_id_column", &self.customer_id_column),
        ] {
            validate_identifier(name)
                .map_err(|_| ConfigError::Invalid(format!("{field} is not an identifier")))?;
        }
        if self.max_customer_id_len == 0 {
            return Err(ConfigError::Invalid(
                "max_customer_id_len must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            admin_role: ADMIN_ROLE.to_string(),
            escalation_keyword: "urgent".to_string(),
            incident_entity: "Incidents".to_string(),
            customer_entity: "Customers".to_string(),
            customer_id_column: "ID".to_string(),
            max_customer_id_len: 128,
            require_admin_for_lookup: true,
        }
    }
}
