//! Inbound requests
//!
//! A [`MutationRequest`] carries one lifecycle event on the `Incidents`
//! entity; a [`LookupRequest`] carries one customer lookup on the admin
//! resource. Both hold at most one requester, applied to every record.

use crate::incident::{IncidentDraft, IncidentId};
use crate::requester::Requester;
use serde::de::value::{MapAccessDeserializer, SeqAccessDeserializer};
use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Lifecycle event being intercepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LifecycleEvent {
    /// Insert new record(s)
    Create,
    /// Modify an existing record
    Update,
    /// Remove an existing record
    Delete,
}

impl LifecycleEvent {
    /// Verb used in rejection messages
    #[inline]
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "modify",
            Self::Delete => "delete",
        }
    }

    /// Whether the event targets an existing record
    #[inline]
    #[must_use]
    pub const fn targets_existing(self) -> bool {
        matches!(self, Self::Update | Self::Delete)
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Payload of a mutation: one record, or a batch for Create
///
/// Decodes an object as [`MutationPayload::Single`] and any sequence as
/// [`MutationPayload::Batch`]; a sequence is never read as a positional
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MutationPayload {
    /// Batch of records
    Batch(Vec<IncidentDraft>),
    /// Single record
    Single(IncidentDraft),
}

impl<'de> Deserialize<'de> for MutationPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PayloadVisitor;

        impl<'de> Visitor<'de> for PayloadVisitor {
            type Value = MutationPayload;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an incident record or an array of incident records")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, seq: A) -> Result<Self::Value, A::Error> {
                Vec::<IncidentDraft>::deserialize(SeqAccessDeserializer::new(seq))
                    .map(MutationPayload::Batch)
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
                IncidentDraft::deserialize(MapAccessDeserializer::new(map))
                    .map(MutationPayload::Single)
            }
        }

        deserializer.deserialize_any(PayloadVisitor)
    }
}

impl MutationPayload {
    /// All records in the payload
    #[must_use]
    pub fn drafts(&self) -> &[IncidentDraft] {
        match self {
            Self::Single(draft) => std::slice::from_ref(draft),
            Self::Batch(drafts) => drafts,
        }
    }

    /// All records in the payload, mutably
    pub fn drafts_mut(&mut self) -> &mut [IncidentDraft] {
        match self {
            Self::Single(draft) => std::slice::from_mut(draft),
            Self::Batch(drafts) => drafts,
        }
    }

    /// The record, when the payload is not a batch
    #[must_use]
    pub fn single(&self) -> Option<&IncidentDraft> {
        match self {
            Self::Single(draft) => Some(draft),
            Self::Batch(_) => None,
        }
    }

    /// Owned records
    #[must_use]
    pub fn into_drafts(self) -> Vec<IncidentDraft> {
        match self {
            Self::Single(draft) => vec![draft],
            Self::Batch(drafts) => drafts,
        }
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.drafts().len()
    }

    /// Whether there are no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drafts().is_empty()
    }
}

impl From<IncidentDraft> for MutationPayload {
    fn from(draft: IncidentDraft) -> Self {
        Self::Single(draft)
    }
}

impl From<Vec<IncidentDraft>> for MutationPayload {
    fn from(drafts: Vec<IncidentDraft>) -> Self {
        Self::Batch(drafts)
    }
}

/// Create/update/delete request on the `Incidents` entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRequest {
    /// Intercepted event
    pub event: LifecycleEvent,
    /// Record targeted by Update/Delete
    #[serde(rename = "targetId", default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<IncidentId>,
    /// Incoming data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<MutationPayload>,
    /// Caller, absent for anonymous requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<Requester>,
}

impl MutationRequest {
    /// Create request
    #[must_use]
    pub fn create(payload: impl Into<MutationPayload>) -> Self {
        Self {
            event: LifecycleEvent::Create,
            target_id: None,
            payload: Some(payload.into()),
            requester: None,
        }
    }

    /// Update request
    #[must_use]
    pub fn update(target: IncidentId, changes: IncidentDraft) -> Self {
        Self {
            event: LifecycleEvent::Update,
            target_id: Some(target),
            payload: Some(MutationPayload::Single(changes)),
            requester: None,
        }
    }

    /// Delete request
    #[must_use]
    pub fn delete(target: IncidentId) -> Self {
        Self {
            event: LifecycleEvent::Delete,
            target_id: Some(target),
            payload: None,
            requester: None,
        }
    }

    /// With requester
    #[inline]
    #[must_use]
    pub fn with_requester(mut self, requester: Requester) -> Self {
        self.requester = Some(requester);
        self
    }

    /// Targeted record: explicit target, else the ID of a single-record payload
    #[must_use]
    pub fn target(&self) -> Option<IncidentId> {
        self.target_id.or_else(|| {
            self.payload
                .as_ref()
                .and_then(MutationPayload::single)
                .and_then(|d| d.id)
        })
    }

    /// Whether the payload asks to close the incident
    #[must_use]
    pub fn closes(&self) -> bool {
        self.payload
            .as_ref()
            .is_some_and(|p| p.drafts().iter().any(IncidentDraft::closes))
    }
}

/// Customer lookup on the admin resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRequest {
    /// Customer identifier, untrusted
    #[serde(rename = "customerID")]
    pub customer_id: String,
    /// Caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester: Option<Requester>,
}

impl LookupRequest {
    /// Create lookup request
    #[must_use]
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            requester: None,
        }
    }

    /// With requester
    #[inline]
    #[must_use]
    pub fn with_requester(mut self, requester: Requester) -> Self {
        self.requester = Some(requester);
        self
    }
}
