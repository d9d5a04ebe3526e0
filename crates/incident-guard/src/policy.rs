//! Mutation policy
//!
//! Pure decision logic for incident lifecycle events. No I/O happens here:
//! the caller supplies the persisted snapshot of the target (if any) and
//! receives a [`Decision`].
//!
//! # Rules
//!
//! Update and Delete:
//! 1. Missing target record → 404.
//! 2. Closed target: non-admins get 403 naming the action; admins are
//!    allowed without further checks.
//! 3. Closing a high-urgency target requires the admin role.
//!
//! Create (enrichment, never rejects):
//! 1. Records in status Assigned are assigned to the requester, if any.
//! 2. Records whose title contains the escalation keyword (any case) get
//!    urgency High.
//!
//! An absent requester holds no roles.

use crate::config::GuardConfig;
use crate::error::Rejection;
use incident_model::{
    holds_role, IncidentSnapshot, LifecycleEvent, MutationPayload, MutationRequest, Requester,
    StatusCode, UrgencyCode, UrgencyRef,
};

/// Outcome of authorizing a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Proceed with the request as received
    Allow,
    /// Proceed with this rewritten payload
    Mutate(MutationPayload),
    /// Stop; nothing reaches the store
    Reject(Rejection),
}

impl Decision {
    /// Whether the request may proceed
    #[inline]
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Reject(_))
    }

    /// The rejection, if any
    #[inline]
    #[must_use]
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Reject(r) => Some(r),
            _ => None,
        }
    }
}

/// What create-time enrichment changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Enrichment {
    /// Records auto-assigned to the requester
    pub assigned: usize,
    /// Records escalated to high urgency
    pub escalated: usize,
}

impl Enrichment {
    /// Whether nothing changed
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.assigned == 0 && self.escalated == 0
    }
}

/// Role and keyword settings the rules are evaluated with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    admin_role: String,
    escalation_keyword: String,
}

impl Policy {
    /// Create policy
    #[must_use]
    pub fn new(admin_role: impl Into<String>, escalation_keyword: impl Into<String>) -> Self {
        Self {
            admin_role: admin_role.into(),
            escalation_keyword: escalation_keyword.into(),
        }
    }

    /// Policy from configuration
    #[must_use]
    pub fn from_config(config: &GuardConfig) -> Self {
        Self::new(&config.admin_role, &config.escalation_keyword)
    }

    /// Role granting overrides
    #[inline]
    #[must_use]
    pub fn admin_role(&self) -> &str {
        &self.admin_role
    }

    /// Whether the requester holds the admin role; fails closed
    #[inline]
    #[must_use]
    pub fn is_admin(&self, requester: Option<&Requester>) -> bool {
        holds_role(requester, &self.admin_role)
    }

    /// Authorize a mutation against the persisted state of its target
    ///
    /// `current` is the snapshot of the target for Update/Delete (`None` if
    /// it does not exist) and is ignored for Create.
    #[must_use]
    pub fn authorize_mutation(
        &self,
        request: &MutationRequest,
        current: Option<IncidentSnapshot>,
    ) -> Decision {
        match request.event {
            LifecycleEvent::Create => {
                let Some(payload) = &request.payload else {
                    return Decision::Allow;
                };
                let mut payload = payload.clone();
                let enrichment = self.enrich(&mut payload, request.requester.as_ref());
                if enrichment.is_noop() {
                    Decision::Allow
                } else {
                    Decision::Mutate(payload)
                }
            }
            LifecycleEvent::Update | LifecycleEvent::Delete => match request.target() {
                Some(target) => match current {
                    Some(snapshot) => self.check_modification(request, snapshot),
                    None => Decision::Reject(Rejection::not_found(target)),
                },
                None => Decision::Reject(Rejection::missing_target()),
            },
        }
    }

    /// Rules 2 and 3 for an existing target
    #[must_use]
    pub fn check_modification(
        &self,
        request: &MutationRequest,
        current: IncidentSnapshot,
    ) -> Decision {
        let admin = self.is_admin(request.requester.as_ref());

        if current.status == StatusCode::Closed {
            if !admin {
                return Decision::Reject(Rejection::closed_incident(request.event));
            }
            tracing::info!(event = %request.event, "admin override on closed incident");
            return Decision::Allow;
        }

        if request.closes() && current.urgency == UrgencyCode::High && !admin {
            return Decision::Reject(Rejection::high_urgency_close());
        }

        Decision::Allow
    }

    /// Create-time enrichment, in place
    ///
    /// Idempotent: a second pass over the result changes nothing.
    pub fn enrich(
        &self,
        payload: &mut MutationPayload,
        requester: Option<&Requester>,
    ) -> Enrichment {
        let mut enrichment = Enrichment::default();

        for draft in payload.drafts_mut() {
            if let Some(requester) = requester {
                if draft.status == Some(StatusCode::Assigned)
                    && draft.assigned_to.as_deref() != Some(requester.id.as_str())
                {
                    draft.assigned_to = Some(requester.id.clone());
                    enrichment.assigned += 1;
                    tracing::info!(assignee = %requester.id, "auto-assigned incident");
                }
            }

            if draft.title_mentions(&self.escalation_keyword) {
                let high = UrgencyRef::high();
                if draft.urgency.as_ref() != Some(&high) {
                    draft.urgency = Some(high);
                    enrichment.escalated += 1;
                }
            }
        }

        if !enrichment.is_noop() {
            tracing::debug!(
                assigned = enrichment.assigned,
                escalated = enrichment.escalated,
                "enriched create payload"
            );
        }
        enrichment
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::from_config(&GuardConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RejectionKind;
    use incident_model::{IncidentDraft, IncidentId};
    use pretty_assertions::assert_eq;

    fn closed_low() -> IncidentSnapshot {
        IncidentSnapshot::new(StatusCode::Closed, UrgencyCode::Low)
    }

    fn open(urgency: UrgencyCode) -> IncidentSnapshot {
        IncidentSnapshot::new(StatusCode::New, urgency)
    }

    fn close_request(id: IncidentId) -> MutationRequest {
        MutationRequest::update(id, IncidentDraft::new().with_status(StatusCode::Closed))
    }

    #[test]
    fn closed_incident_rejects_non_admin_update() {
        let policy = Policy::default();
        let request = MutationRequest::update(IncidentId::new(), IncidentDraft::new().with_title("x"))
            .with_requester(Requester::new("alice"));

        let decision = policy.authorize_mutation(&request, Some(closed_low()));

        let rejection = decision.rejection().unwrap();
        assert_eq!(rejection.kind, RejectionKind::Forbidden);
        assert_eq!(rejection.code, 403);
        assert_eq!(rejection.message, "Cannot modify a closed incident");
    }

    #[test]
    fn closed_incident_rejects_non_admin_delete() {
        let policy = Policy::default();
        let request = MutationRequest::delete(IncidentId::new()).with_requester(Requester::new("alice"));

        let decision = policy.authorize_mutation(&request, Some(closed_low()));
        assert_eq!(
            decision.rejection().unwrap().message,
            "Cannot delete a closed incident"
        );
    }

    #[test]
    fn admin_may_modify_closed_incident() {
        let policy = Policy::default();
        let id = IncidentId::new();
        let reopen = MutationRequest::update(id, IncidentDraft::new().with_status(StatusCode::New))
            .with_requester(Requester::admin("root"));

        assert_eq!(policy.authorize_mutation(&reopen, Some(closed_low())), Decision::Allow);

        let delete = MutationRequest::delete(id).with_requester(Requester::admin("root"));
        assert_eq!(policy.authorize_mutation(&delete, Some(closed_low())), Decision::Allow);
    }

    #[test]
    fn anonymous_requester_is_not_admin() {
        let policy = Policy::default();
        let request = MutationRequest::delete(IncidentId::new());
        assert!(!policy.authorize_mutation(&request, Some(closed_low())).is_allowed());
    }

    #[test]
    fn missing_target_record_is_not_found() {
        let policy = Policy::default();
        let id = IncidentId::new();
        let decision = policy.authorize_mutation(&MutationRequest::delete(id), None);

        let rejection = decision.rejection().unwrap();
        assert_eq!(rejection.code, 404);
        assert_eq!(rejection.message, format!("Incident {id} not found"));
    }

    #[test]
    fn update_without_target_is_invalid() {
        let policy = Policy::default();
        let request = MutationRequest {
            event: LifecycleEvent::Update,
            target_id: None,
            payload: None,
            requester: None,
        };
        assert_eq!(
            policy.authorize_mutation(&request, None).rejection().unwrap().kind,
            RejectionKind::InvalidInput
        );
    }

    #[test]
    fn closing_high_urgency_requires_admin() {
        let policy = Policy::default();
        let id = IncidentId::new();

        let as_user = close_request(id).with_requester(Requester::new("alice"));
        let decision = policy.authorize_mutation(&as_user, Some(open(UrgencyCode::High)));
        assert_eq!(
            decision.rejection().unwrap().message,
            "Only administrators can close high-urgency incidents"
        );

        let as_admin = close_request(id).with_requester(Requester::admin("root"));
        assert_eq!(
            policy.authorize_mutation(&as_admin, Some(open(UrgencyCode::High))),
            Decision::Allow
        );
    }

    #[test]
    fn closing_lower_urgency_is_unrestricted() {
        let policy = Policy::default();
        let request = close_request(IncidentId::new()).with_requester(Requester::new("alice"));
        assert_eq!(
            policy.authorize_mutation(&request, Some(open(UrgencyCode::Medium))),
            Decision::Allow
        );
    }

    #[test]
    fn non_closing_update_on_high_urgency_is_allowed() {
        let policy = Policy::default();
        let request = MutationRequest::update(
            IncidentId::new(),
            IncidentDraft::new().with_status(StatusCode::Assigned),
        )
        .with_requester(Requester::new("alice"));
        assert_eq!(
            policy.authorize_mutation(&request, Some(open(UrgencyCode::High))),
            Decision::Allow
        );
    }

    #[test]
    fn create_auto_assigns_to_requester() {
        let policy = Policy::default();
        let request = MutationRequest::create(
            IncidentDraft::new()
                .with_title("Printer jam")
                .with_status(StatusCode::Assigned),
        )
        .with_requester(Requester::new("alice"));

        let Decision::Mutate(payload) = policy.authorize_mutation(&request, None) else {
            panic!("expected mutation");
        };
        assert_eq!(payload.drafts()[0].assigned_to.as_deref(), Some("alice"));
    }

    #[test]
    fn create_without_requester_is_not_assigned() {
        let policy = Policy::default();
        let request = MutationRequest::create(
            IncidentDraft::new()
                .with_title("Printer jam")
                .with_status(StatusCode::Assigned),
        );
        assert_eq!(policy.authorize_mutation(&request, None), Decision::Allow);
    }

    #[test]
    fn create_escalates_urgent_titles_in_batch() {
        let policy = Policy::default();
        let mut payload = MutationPayload::Batch(vec![
            IncidentDraft::new().with_title("URGENT outage").with_urgency(UrgencyCode::Low),
            IncidentDraft::new().with_title("routine check"),
            IncidentDraft::new().with_title("Non-urgent but annoying"),
        ]);

        let enrichment = policy.enrich(&mut payload, None);

        assert_eq!(enrichment.escalated, 2);
        let drafts = payload.drafts();
        assert_eq!(drafts[0].urgency, Some(UrgencyRef::high()));
        assert_eq!(drafts[0].urgency.as_ref().unwrap().descr, "High");
        assert_eq!(drafts[1].urgency, None);
        assert_eq!(drafts[2].urgency_code(), Some(UrgencyCode::High));
    }

    #[test]
    fn enrichment_tolerates_missing_title_and_payload() {
        let policy = Policy::default();
        let mut payload = MutationPayload::Single(IncidentDraft::new());
        assert!(policy.enrich(&mut payload, None).is_noop());

        let request = MutationRequest {
            event: LifecycleEvent::Create,
            target_id: None,
            payload: None,
            requester: Some(Requester::new("alice")),
        };
        assert_eq!(policy.authorize_mutation(&request, None), Decision::Allow);
    }

    #[test]
    fn enrichment_is_idempotent() {
        let policy = Policy::default();
        let requester = Requester::new("alice");
        let mut payload = MutationPayload::Single(
            IncidentDraft::new()
                .with_title("Urgent: VPN down")
                .with_status(StatusCode::Assigned),
        );

        let first = policy.enrich(&mut payload, Some(&requester));
        let after_first = payload.clone();
        let second = policy.enrich(&mut payload, Some(&requester));

        assert_eq!(first, Enrichment { assigned: 1, escalated: 1 });
        assert!(second.is_noop());
        assert_eq!(payload, after_first);
    }

    #[test]
    fn custom_admin_role() {
        let policy = Policy::new("supervisor", "urgent");
        let request = MutationRequest::delete(IncidentId::new())
            .with_requester(Requester::admin("root"));
        assert!(!policy.authorize_mutation(&request, Some(closed_low())).is_allowed());

        let request = MutationRequest::delete(IncidentId::new())
            .with_requester(Requester::new("sue").with_role("supervisor"));
        assert!(policy.authorize_mutation(&request, Some(closed_low())).is_allowed());
    }
}
