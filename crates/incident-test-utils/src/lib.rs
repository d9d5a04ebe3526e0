//! Testing utilities for the incident guard workspace
//!
//! Shared fixtures, a recording diagnostic sink and a store that always
//! fails.

#![allow(missing_docs)]

use async_trait::async_trait;
use incident_guard::{compose, DiagnosticSink, GuardConfig, SecurityEvent, Services};
use incident_model::{Incident, Requester, StatusCode, UrgencyCode};
use incident_store::{MemoryStore, Query, QueryResult, Record, RecordStore, StoreError};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

pub const INCIDENTS: &str = "Incidents";
pub const CUSTOMERS: &str = "Customers";

/// Sink keeping every event for later assertions
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SecurityEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SecurityEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl DiagnosticSink for RecordingSink {
    fn record(&self, event: SecurityEvent) {
        self.events.lock().push(event);
    }
}

/// Store whose every query fails with a backend-looking message that echoes
/// part of the query, as a careless driver would
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn run(&self, query: &Query) -> Result<QueryResult, StoreError> {
        Err(StoreError::InvalidQuery(format!(
            "syntax error near {:?}",
            query.to_sql().map(|s| s.params).unwrap_or_default()
        )))
    }
}

pub fn customer(id: &str, name: &str) -> Record {
    json!({ "ID": id, "name": name, "email": format!("{id}@example.com") })
        .as_object()
        .cloned()
        .unwrap()
}

pub fn customers() -> Vec<Record> {
    vec![
        customer("1004100", "Sunny Sunshine"),
        customer("1004101", "Stormy Weathers"),
        customer("1004102", "Daniel Watts"),
    ]
}

pub fn closed_low() -> Incident {
    Incident::new("Printer out of toner")
        .with_status(StatusCode::Closed)
        .with_urgency(UrgencyCode::Low)
}

pub fn open_high() -> Incident {
    Incident::new("Data center flooding")
        .with_status(StatusCode::Assigned)
        .with_urgency(UrgencyCode::High)
        .with_assignee("bob")
}

pub fn open_medium() -> Incident {
    Incident::new("VPN drops every hour")
}

/// Memory store with the given incidents and the standard customers
pub fn seeded_store(incidents: &[Incident]) -> Arc<MemoryStore> {
    let store = MemoryStore::with_entities([INCIDENTS, CUSTOMERS]);
    store.seed(INCIDENTS, incidents.iter().map(Incident::to_record));
    store.seed(CUSTOMERS, customers());
    Arc::new(store)
}

/// Services over a seeded store with a recording sink
pub fn services(incidents: &[Incident]) -> (Services, Arc<MemoryStore>, Arc<RecordingSink>) {
    let store = seeded_store(incidents);
    let sink = RecordingSink::new();
    let services = compose(
        &GuardConfig::default(),
        Arc::clone(&store) as Arc<dyn RecordStore>,
        Arc::clone(&sink) as Arc<dyn DiagnosticSink>,
    );
    (services, store, sink)
}

pub fn user() -> Requester {
    Requester::new("alice")
}

pub fn admin() -> Requester {
    Requester::admin("root")
}
