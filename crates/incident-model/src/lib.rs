//! Incident Model
//!
//! Typed records shared by the guard and the record store:
//! - Incidents, drafts and status/urgency snapshots
//! - Requesters and their role sets
//! - Mutation and lookup requests
//!
//! Conversions to and from stored records use the column names of the
//! `Incidents` entity (see [`incident::columns`]).

#![warn(unreachable_pub)]

pub mod error;
pub mod incident;
pub mod request;
pub mod requester;

pub use error::ModelError;
pub use incident::{
    columns, Incident, IncidentDraft, IncidentId, IncidentSnapshot, StatusCode, UrgencyCode,
    UrgencyRef,
};
pub use request::{LifecycleEvent, LookupRequest, MutationPayload, MutationRequest};
pub use requester::{holds_role, Requester, ADMIN_ROLE};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
