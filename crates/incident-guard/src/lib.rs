//! Incident Guard
//!
//! Access-control and data-validation layer in front of an incident record
//! store:
//! - [`MutationGuard`] / [`IncidentService`]: pre-commit checks on
//!   create/update/delete, including create-time enrichment
//! - [`LookupGateway`]: admin customer lookup with parameterized queries
//!   and redacted failure diagnostics
//!
//! # Example
//!
//! ```rust,ignore
//! use incident_guard::prelude::*;
//!
//! let services = compose(&GuardConfig::default(), store, Arc::new(TracingSink));
//! let outcome = services.incidents.handle(request).await?;
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod policy;
pub mod service;
pub mod telemetry;

pub use config::GuardConfig;
pub use diagnostics::{redact, DiagnosticSink, SecurityEvent, SecurityEventKind, TracingSink};
pub use error::{ConfigError, GuardError, Rejection, RejectionKind};
pub use gateway::{InputIssue, LookupGateway};
pub use guard::MutationGuard;
pub use policy::{Decision, Enrichment, Policy};
pub use service::{IncidentService, MutationOutcome};

use incident_store::RecordStore;
use std::sync::Arc;

/// Common imports
pub mod prelude {
    pub use crate::{
        compose, DiagnosticSink, GuardConfig, IncidentService, LookupGateway, MutationOutcome,
        Rejection, Services, TracingSink,
    };
    pub use incident_model::{
        IncidentDraft, IncidentId, LookupRequest, MutationRequest, Requester,
    };
    pub use incident_store::{MemoryStore, RecordStore, SqliteStore};
    pub use std::sync::Arc;
}

/// Services sharing one store and one diagnostic sink
#[derive(Debug)]
pub struct Services {
    /// Guarded incident mutations
    pub incidents: IncidentService,
    /// Admin customer lookup
    pub admin: LookupGateway,
}

/// Wire the incident service and the lookup gateway
#[must_use]
pub fn compose(
    config: &GuardConfig,
    store: Arc<dyn RecordStore>,
    sink: Arc<dyn DiagnosticSink>,
) -> Services {
    Services {
        incidents: IncidentService::new(Arc::clone(&store), Arc::clone(&sink), config),
        admin: LookupGateway::new(store, sink, config),
    }
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
