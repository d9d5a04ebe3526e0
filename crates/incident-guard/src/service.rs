//! Incident service
//!
//! Runs a mutation through the [`MutationGuard`] and, when allowed, commits
//! it to the record store. A rejected request never reaches the store.

use crate::config::GuardConfig;
use crate::diagnostics::{DiagnosticSink, SecurityEvent, SecurityEventKind};
use crate::error::{GuardError, Rejection, RejectionKind};
use crate::guard::MutationGuard;
use crate::policy::Decision;
use incident_model::{
    columns, Incident, IncidentDraft, IncidentId, LifecycleEvent, MutationPayload,
    MutationRequest,
};
use incident_store::{Delete, Insert, RecordStore, Select, Update};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Result of a committed mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum MutationOutcome {
    /// Incidents inserted, after enrichment
    Created {
        /// Inserted incidents
        incidents: Vec<Incident>,
    },
    /// Incident updated
    Updated {
        /// Target
        id: IncidentId,
        /// Rows touched
        affected: usize,
    },
    /// Incident deleted
    Deleted {
        /// Target
        id: IncidentId,
        /// Rows removed
        affected: usize,
    },
}

/// Guarded create/update/delete over the incident entity
pub struct IncidentService {
    guard: MutationGuard,
    store: Arc<dyn RecordStore>,
    sink: Arc<dyn DiagnosticSink>,
    entity: String,
}

impl IncidentService {
    /// Create service
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        sink: Arc<dyn DiagnosticSink>,
        config: &GuardConfig,
    ) -> Self {
        Self {
            guard: MutationGuard::new(Arc::clone(&store), config),
            store,
            sink,
            entity: config.incident_entity.clone(),
        }
    }

    /// Guard in front of the store
    #[inline]
    #[must_use]
    pub fn guard(&self) -> &MutationGuard {
        &self.guard
    }

    /// Authorize and commit a mutation
    ///
    /// # Errors
    /// The policy's [`Rejection`], 400 for a payload that cannot be
    /// persisted, or 500 "Internal error" when the store fails.
    pub async fn handle(&self, request: MutationRequest) -> Result<MutationOutcome, Rejection> {
        let operation = operation_name(request.event);

        let decision = match self.guard.authorize(&request).await {
            Ok(decision) => decision,
            Err(e) => return Err(self.internal(operation, &e)),
        };

        let payload = match decision {
            Decision::Reject(rejection) => {
                self.sink.record(SecurityEvent::new(
                    SecurityEventKind::MutationRejected,
                    operation,
                    kind_label(&rejection),
                ));
                return Err(rejection);
            }
            Decision::Mutate(payload) => Some(payload),
            Decision::Allow => request.payload.clone(),
        };

        let outcome = match request.event {
            LifecycleEvent::Create => self.create(payload).await,
            LifecycleEvent::Update => {
                let id = request.target().ok_or_else(Rejection::missing_target)?;
                self.update(id, payload).await
            }
            LifecycleEvent::Delete => {
                let id = request.target().ok_or_else(Rejection::missing_target)?;
                self.delete(id).await
            }
        };

        outcome.map_err(|e| match e {
            Commit::Rejected(rejection) => rejection,
            Commit::Failed(e) => self.internal(operation, &e),
        })
    }

    async fn create(&self, payload: Option<MutationPayload>) -> Result<MutationOutcome, Commit> {
        let drafts = payload.map(MutationPayload::into_drafts).unwrap_or_default();
        if drafts.is_empty() {
            return Err(Commit::Rejected(Rejection::invalid_payload()));
        }

        let incidents = drafts
            .into_iter()
            .map(IncidentDraft::into_incident)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| Commit::Rejected(Rejection::invalid_payload()))?;
        self.ensure_unused(&incidents).await?;

        let insert = Insert::entity(&self.entity).rows(incidents.iter().map(Incident::to_record));
        self.store
            .run(&insert.into())
            .await
            .map_err(GuardError::from)?;

        tracing::info!(count = incidents.len(), "incidents created");
        Ok(MutationOutcome::Created { incidents })
    }

    /// Identifiers must be unique within the batch and absent from the store
    async fn ensure_unused(&self, incidents: &[Incident]) -> Result<(), Commit> {
        let mut seen = HashSet::with_capacity(incidents.len());
        for incident in incidents {
            if !seen.insert(incident.id) {
                return Err(Commit::Rejected(Rejection::duplicate_incident(incident.id)));
            }
            let select = Select::one(&self.entity)
                .columns([columns::ID])
                .where_eq(columns::ID, incident.id.to_string());
            if self
                .store
                .find_one(&select)
                .await
                .map_err(GuardError::from)?
                .is_some()
            {
                tracing::warn!(id = %incident.id, "create reuses an existing identifier");
                return Err(Commit::Rejected(Rejection::duplicate_incident(incident.id)));
            }
        }
        Ok(())
    }

    async fn update(
        &self,
        id: IncidentId,
        payload: Option<MutationPayload>,
    ) -> Result<MutationOutcome, Commit> {
        let changes = match payload {
            None => IncidentDraft::new(),
            Some(MutationPayload::Single(draft)) => draft,
            Some(MutationPayload::Batch(_)) => {
                return Err(Commit::Rejected(Rejection::invalid_payload()))
            }
        };

        let mut set = changes.to_record();
        set.remove(columns::ID);
        if set.is_empty() {
            return Ok(MutationOutcome::Updated { id, affected: 0 });
        }

        let update = Update::entity(&self.entity)
            .set(set)
            .where_eq(columns::ID, id.to_string());
        let affected = self
            .store
            .run(&update.into())
            .await
            .map_err(GuardError::from)?
            .count();

        tracing::info!(%id, affected, "incident updated");
        Ok(MutationOutcome::Updated { id, affected })
    }

    async fn delete(&self, id: IncidentId) -> Result<MutationOutcome, Commit> {
        let delete = Delete::entity(&self.entity).where_eq(columns::ID, id.to_string());
        let affected = self
            .store
            .run(&delete.into())
            .await
            .map_err(GuardError::from)?
            .count();

        tracing::info!(%id, affected, "incident deleted");
        Ok(MutationOutcome::Deleted { id, affected })
    }

    fn internal(&self, operation: &'static str, error: &GuardError) -> Rejection {
        tracing::error!(operation, kind = error.kind(), "mutation failed");
        self.sink.record(SecurityEvent::new(
            SecurityEventKind::MutationFailed,
            operation,
            error.kind(),
        ));
        Rejection::internal()
    }
}

impl std::fmt::Debug for IncidentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncidentService")
            .field("guard", &self.guard)
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}

enum Commit {
    Rejected(Rejection),
    Failed(GuardError),
}

impl From<GuardError> for Commit {
    fn from(e: GuardError) -> Self {
        Self::Failed(e)
    }
}

const fn operation_name(event: LifecycleEvent) -> &'static str {
    match event {
        LifecycleEvent::Create => "CREATE",
        LifecycleEvent::Update => "UPDATE",
        LifecycleEvent::Delete => "DELETE",
    }
}

const fn kind_label(rejection: &Rejection) -> &'static str {
    match rejection.kind {
        RejectionKind::NotFound => "not_found",
        RejectionKind::Forbidden => "forbidden",
        RejectionKind::InvalidInput => "invalid_input",
        RejectionKind::Conflict => "conflict",
        RejectionKind::Internal => "internal",
    }
}
