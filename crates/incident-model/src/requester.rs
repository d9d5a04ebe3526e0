//! Requester identity
//!
//! Identity and roles are resolved upstream; this crate only carries them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role tag granting override rights on closed and high-urgency incidents
pub const ADMIN_ROLE: &str = "admin";

/// Authenticated caller of a request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// User identifier
    pub id: String,
    /// Role tags
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl Requester {
    /// Create requester without roles
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: BTreeSet::new(),
        }
    }

    /// Create requester holding the admin role
    #[must_use]
    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id).with_role(ADMIN_ROLE)
    }

    /// Add role
    #[inline]
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Role-set membership test
    #[inline]
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Membership test that treats an absent requester as holding no roles
#[inline]
#[must_use]
pub fn holds_role(requester: Option<&Requester>, role: &str) -> bool {
    requester.is_some_and(|r| r.has_role(role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_membership() {
        let user = Requester::new("alice");
        assert!(!user.has_role(ADMIN_ROLE));

        let admin = Requester::admin("root");
        assert!(admin.has_role(ADMIN_ROLE));
        assert!(!admin.has_role("support"));
    }

    #[test]
    fn absent_requester_holds_nothing() {
        assert!(!holds_role(None, ADMIN_ROLE));
        assert!(holds_role(Some(&Requester::admin("root")), ADMIN_ROLE));
    }

    #[test]
    fn roles_default_to_empty_on_the_wire() {
        let requester: Requester = serde_json::from_str(r#"{"id":"bob"}"#).unwrap();
        assert!(requester.roles.is_empty());
    }
}
