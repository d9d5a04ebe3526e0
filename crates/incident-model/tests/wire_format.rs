//! Wire-format compatibility of requests and records

use incident_model::{
    Incident, IncidentDraft, LifecycleEvent, MutationPayload, MutationRequest, StatusCode,
    UrgencyCode, UrgencyRef,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

#[test]
fn urgency_accepts_code_or_object() {
    let bare: IncidentDraft = serde_json::from_value(json!({ "urgency_code": "H" })).unwrap();
    let full: IncidentDraft =
        serde_json::from_value(json!({ "urgency": { "code": "H", "descr": "High" } })).unwrap();

    assert_eq!(bare.urgency_code(), Some(UrgencyCode::High));
    assert_eq!(full.urgency, Some(UrgencyRef::high()));
}

#[test]
fn batch_create_request() {
    let request: MutationRequest = serde_json::from_value(json!({
        "event": "CREATE",
        "payload": [
            { "title": "urgent: outage", "status_code": "A" },
            { "title": "slow laptop" }
        ],
        "requester": { "id": "alice" }
    }))
    .unwrap();

    assert_eq!(request.event, LifecycleEvent::Create);
    let Some(MutationPayload::Batch(drafts)) = &request.payload else {
        panic!("expected batch payload");
    };
    assert_eq!(drafts.len(), 2);
    assert_eq!(drafts[0].status, Some(StatusCode::Assigned));
    assert!(request.requester.unwrap().roles.is_empty());
}

#[test]
fn stored_record_uses_column_names() {
    let incident = Incident::new("Printer jam")
        .with_status(StatusCode::Closed)
        .with_urgency(UrgencyCode::Low);
    let record = incident.to_record();

    assert_eq!(record["ID"], json!(incident.id.to_string()));
    assert_eq!(record["status_code"], "C");
    assert_eq!(record["urgency_code"], "L");
    assert_eq!(record["assignedTo"], serde_json::Value::Null);
}

fn status() -> impl Strategy<Value = StatusCode> {
    prop_oneof![
        Just(StatusCode::New),
        Just(StatusCode::Assigned),
        Just(StatusCode::Closed)
    ]
}

fn urgency() -> impl Strategy<Value = UrgencyCode> {
    prop_oneof![
        Just(UrgencyCode::Low),
        Just(UrgencyCode::Medium),
        Just(UrgencyCode::High)
    ]
}

proptest! {
    #[test]
    fn only_closing_drafts_close(status in status(), urgency in urgency()) {
        let draft = IncidentDraft::new().with_status(status).with_urgency(urgency);
        prop_assert_eq!(draft.closes(), status == StatusCode::Closed);
        prop_assert_eq!(MutationRequest::create(draft).closes(), status.is_closed());
    }

    #[test]
    fn keyword_match_ignores_case(title in "[a-zA-Z ]{0,30}") {
        let draft = IncidentDraft::new().with_title(title.clone());
        prop_assert_eq!(
            draft.title_mentions("urgent"),
            title.to_lowercase().contains("urgent")
        );
    }
}
