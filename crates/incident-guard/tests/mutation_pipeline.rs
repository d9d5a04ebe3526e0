//! End-to-end mutation scenarios through `IncidentService`

use incident_guard::{MutationOutcome, Rejection, RejectionKind, SecurityEventKind};
use incident_model::{
    Incident, IncidentDraft, IncidentId, MutationPayload, MutationRequest, StatusCode, UrgencyCode,
};
use incident_test_utils::{admin, closed_low, open_high, open_medium, services, user, INCIDENTS};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn stored(store: &incident_store::MemoryStore) -> Vec<Incident> {
    store
        .rows(INCIDENTS)
        .iter()
        .map(|r| Incident::from_record(r).unwrap())
        .collect()
}

#[tokio::test]
async fn user_cannot_modify_closed_incident() {
    let incident = closed_low();
    let (services, store, sink) = services(&[incident.clone()]);
    let before = store.rows(INCIDENTS);

    let request = MutationRequest::update(incident.id, IncidentDraft::new().with_title("reopen"))
        .with_requester(user());
    let rejection = services.incidents.handle(request).await.unwrap_err();

    assert_eq!(rejection.code, 403);
    assert_eq!(rejection.message, "Cannot modify a closed incident");
    assert_eq!(store.rows(INCIDENTS), before);
    assert_eq!(sink.events()[0].kind, SecurityEventKind::MutationRejected);
}

#[tokio::test]
async fn user_cannot_delete_closed_incident() {
    let incident = closed_low();
    let (services, store, _) = services(&[incident.clone()]);

    let rejection = services
        .incidents
        .handle(MutationRequest::delete(incident.id).with_requester(user()))
        .await
        .unwrap_err();

    assert_eq!(rejection.message, "Cannot delete a closed incident");
    assert_eq!(stored(&store), vec![incident]);
}

#[tokio::test]
async fn admin_may_modify_closed_incident() {
    let incident = closed_low();
    let (services, store, sink) = services(&[incident.clone()]);

    let request = MutationRequest::update(incident.id, IncidentDraft::new().with_title("reopened"))
        .with_requester(admin());
    services.incidents.handle(request).await.unwrap();

    assert_eq!(stored(&store)[0].title, "reopened");
    assert!(sink.is_empty());
}

#[tokio::test]
async fn only_admin_closes_high_urgency() {
    let incident = open_high();
    let (services, store, _) = services(&[incident.clone()]);
    let close = IncidentDraft::new().with_status(StatusCode::Closed);

    let rejection = services
        .incidents
        .handle(MutationRequest::update(incident.id, close.clone()).with_requester(user()))
        .await
        .unwrap_err();
    assert_eq!(rejection, Rejection::high_urgency_close());
    assert_eq!(stored(&store)[0].status, StatusCode::Assigned);

    services
        .incidents
        .handle(MutationRequest::update(incident.id, close).with_requester(admin()))
        .await
        .unwrap();
    assert_eq!(stored(&store)[0].status, StatusCode::Closed);
}

#[tokio::test]
async fn user_closes_medium_urgency() {
    let incident = open_medium();
    let (services, store, _) = services(&[incident.clone()]);

    let request = MutationRequest::update(
        incident.id,
        IncidentDraft::new().with_status(StatusCode::Closed),
    )
    .with_requester(user());
    services.incidents.handle(request).await.unwrap();

    assert_eq!(stored(&store)[0].status, StatusCode::Closed);
}

#[tokio::test]
async fn update_of_missing_incident_is_not_found() {
    let (services, _, _) = services(&[]);
    let id = IncidentId::new();

    let rejection = services
        .incidents
        .handle(MutationRequest::update(id, IncidentDraft::new().with_title("x")))
        .await
        .unwrap_err();

    assert_eq!(rejection.kind, RejectionKind::NotFound);
    assert_eq!(rejection.message, format!("Incident {id} not found"));
}

#[tokio::test]
async fn anonymous_update_of_closed_incident_is_rejected() {
    let incident = closed_low();
    let (services, _, _) = services(&[incident.clone()]);

    let rejection = services
        .incidents
        .handle(MutationRequest::update(incident.id, IncidentDraft::new().with_title("x")))
        .await
        .unwrap_err();
    assert_eq!(rejection.code, 403);
}

#[tokio::test]
async fn batch_create_is_enriched_per_record() {
    let (services, store, _) = services(&[]);
    let batch = vec![
        IncidentDraft::new()
            .with_title("Urgent: payroll down")
            .with_status(StatusCode::Assigned),
        IncidentDraft::new()
            .with_title("Coffee machine")
            .with_status(StatusCode::New)
            .with_urgency(UrgencyCode::Low),
    ];

    let outcome = services
        .incidents
        .handle(MutationRequest::create(batch).with_requester(user()))
        .await
        .unwrap();
    let MutationOutcome::Created { incidents } = outcome else {
        panic!("expected created outcome");
    };

    assert_eq!(incidents[0].urgency, UrgencyCode::High);
    assert_eq!(incidents[0].assigned_to.as_deref(), Some("alice"));
    assert_eq!(incidents[1].urgency, UrgencyCode::Low);
    assert_eq!(incidents[1].assigned_to, None);
    assert_eq!(stored(&store), incidents);
}

#[tokio::test]
async fn create_cannot_reuse_existing_identifier() {
    let incident = closed_low();
    let (services, store, sink) = services(&[incident.clone()]);

    let request = MutationRequest::create(
        IncidentDraft::new()
            .with_id(incident.id)
            .with_title("reopened under the same key")
            .with_status(StatusCode::New),
    )
    .with_requester(user());
    let rejection = services.incidents.handle(request).await.unwrap_err();

    assert_eq!(rejection, Rejection::duplicate_incident(incident.id));
    assert_eq!(rejection.code, 409);
    assert_eq!(stored(&store), vec![incident.clone()]);
    assert_eq!(sink.len(), 0);

    let rejection = services
        .incidents
        .handle(MutationRequest::delete(incident.id).with_requester(user()))
        .await
        .unwrap_err();
    assert_eq!(rejection.message, "Cannot delete a closed incident");
}

#[tokio::test]
async fn batch_with_repeated_identifier_is_rejected() {
    let (services, store, _) = services(&[]);
    let id = IncidentId::new();
    let batch = vec![
        IncidentDraft::new().with_id(id).with_title("first"),
        IncidentDraft::new().with_id(id).with_title("second"),
    ];

    let rejection = services
        .incidents
        .handle(MutationRequest::create(batch))
        .await
        .unwrap_err();

    assert_eq!(rejection.kind, RejectionKind::Conflict);
    assert!(store.rows(INCIDENTS).is_empty());
}

#[tokio::test]
async fn request_parsed_from_wire_json() {
    let incident = open_high();
    let (services, _, _) = services(&[incident.clone()]);

    let request: MutationRequest = serde_json::from_value(serde_json::json!({
        "event": "UPDATE",
        "targetId": incident.id.to_string(),
        "payload": { "status_code": "C" },
        "requester": { "id": "alice", "roles": [] }
    }))
    .unwrap();

    let rejection = services.incidents.handle(request).await.unwrap_err();
    assert_eq!(rejection, Rejection::high_urgency_close());
}

#[tokio::test]
async fn store_failure_is_internal_and_redacted() {
    let sink = incident_test_utils::RecordingSink::new();
    let services = incident_guard::compose(
        &incident_guard::GuardConfig::default(),
        std::sync::Arc::new(incident_test_utils::FailingStore),
        sink.clone(),
    );

    let rejection = services
        .incidents
        .handle(MutationRequest::delete(IncidentId::new()))
        .await
        .unwrap_err();

    assert_eq!(rejection, Rejection::internal());
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, SecurityEventKind::MutationFailed);
    assert_eq!(events[0].detail, "invalid_query");
}

fn any_case(word: &'static str) -> impl Strategy<Value = String> {
    proptest::collection::vec(any::<bool>(), word.len()).prop_map(move |upper| {
        word.chars()
            .zip(upper)
            .map(|(c, u)| if u { c.to_ascii_uppercase() } else { c })
            .collect()
    })
}

proptest! {
    #[test]
    fn urgent_title_in_any_case_escalates(
        prefix in "[a-z ]{0,12}",
        keyword in any_case("urgent"),
        suffix in "[a-z ]{0,12}",
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let title = format!("{prefix}{keyword}{suffix}");
        let (services, _, _) = services(&[]);

        let outcome = runtime
            .block_on(services.incidents.handle(MutationRequest::create(
                IncidentDraft::new().with_title(title).with_urgency(UrgencyCode::Low),
            )))
            .unwrap();
        let MutationOutcome::Created { incidents } = outcome else {
            panic!("expected created outcome");
        };
        prop_assert_eq!(incidents[0].urgency, UrgencyCode::High);
    }

    #[test]
    fn closed_incident_rejects_any_non_admin_change(
        title in "[A-Za-z ]{1,20}",
        close in any::<bool>(),
        delete in any::<bool>(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let incident = closed_low();
        let (services, store, _) = services(&[incident.clone()]);
        let before = store.rows(INCIDENTS);

        let request = if delete {
            MutationRequest::delete(incident.id)
        } else {
            let mut draft = IncidentDraft::new().with_title(title);
            if close {
                draft = draft.with_status(StatusCode::Closed);
            }
            MutationRequest::update(incident.id, draft)
        }
        .with_requester(user());

        let rejection = runtime.block_on(services.incidents.handle(request)).unwrap_err();
        prop_assert_eq!(rejection.code, 403);
        prop_assert_eq!(store.rows(INCIDENTS), before);
    }

    #[test]
    fn enrichment_is_idempotent(
        titles in proptest::collection::vec("[A-Za-z ]{0,10}(urgent)?[A-Za-z ]{0,10}", 1..5),
        assigned in any::<bool>(),
    ) {
        let policy = incident_guard::Policy::default();
        let status = if assigned { StatusCode::Assigned } else { StatusCode::New };
        let drafts: Vec<_> = titles
            .into_iter()
            .map(|t| IncidentDraft::new().with_title(t).with_status(status))
            .collect();
        let mut payload = MutationPayload::from(drafts);
        let requester = user();

        policy.enrich(&mut payload, Some(&requester));
        let once = payload.clone();
        let second = policy.enrich(&mut payload, Some(&requester));

        prop_assert!(second.is_noop());
        prop_assert_eq!(payload, once);
    }
}
