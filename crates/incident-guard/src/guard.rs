//! Mutation guard
//!
//! Pre-commit interception point for incident lifecycle events. Reads the
//! target's persisted status and urgency through a point lookup, then
//! delegates the decision to [`Policy`].
//!
//! The lookup and the eventual write are two sequential store calls; no
//! atomicity between them is provided.

use crate::config::GuardConfig;
use crate::error::GuardError;
use crate::policy::{Decision, Policy};
use incident_model::{columns, IncidentId, IncidentSnapshot, MutationRequest};
use incident_store::{RecordStore, Select};
use std::sync::Arc;

/// Guard for create/update/delete on the incident entity
pub struct MutationGuard {
    store: Arc<dyn RecordStore>,
    policy: Policy,
    entity: String,
}

impl MutationGuard {
    /// Create guard over a record store
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, config: &GuardConfig) -> Self {
        Self {
            store,
            policy: Policy::from_config(config),
            entity: config.incident_entity.clone(),
        }
    }

    /// Policy in force
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Persisted status and urgency of an incident, if it exists
    ///
    /// # Errors
    /// `GuardError::Store` if the lookup fails, `GuardError::Model` if the
    /// stored codes are unreadable.
    pub async fn current_state(&self, id: IncidentId) -> Result<Option<IncidentSnapshot>, GuardError> {
        let select = Select::one(&self.entity)
            .columns(IncidentSnapshot::COLUMNS)
            .where_eq(columns::ID, id.to_string());
        let row = self.store.find_one(&select).await?;
        Ok(row.map(|r| IncidentSnapshot::from_record(&r)).transpose()?)
    }

    /// Decide whether a mutation may reach the store
    ///
    /// Update and Delete read the target first; Create is enriched without
    /// any store access.
    ///
    /// # Errors
    /// Propagates failures of the point lookup. Policy violations are not
    /// errors; they come back as [`Decision::Reject`].
    pub async fn authorize(&self, request: &MutationRequest) -> Result<Decision, GuardError> {
        let current = match request.target() {
            Some(id) if request.event.targets_existing() => self.current_state(id).await?,
            _ => None,
        };

        let decision = self.policy.authorize_mutation(request, current);
        match &decision {
            Decision::Reject(rejection) => tracing::warn!(
                event = %request.event,
                code = rejection.code,
                reason = %rejection.message,
                "mutation rejected"
            ),
            Decision::Mutate(_) => tracing::debug!(event = %request.event, "mutation rewritten"),
            Decision::Allow => tracing::debug!(event = %request.event, "mutation allowed"),
        }
        Ok(decision)
    }
}

impl std::fmt::Debug for MutationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationGuard")
            .field("policy", &self.policy)
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}
