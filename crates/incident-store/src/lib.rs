//! Incident Store - record store abstraction
//!
//! Provides:
//! - [`RecordStore`]: the persistence capability handed to the guard
//! - Typed queries ([`Select`], [`Insert`], [`Update`], [`Delete`]) whose
//!   values are always bound parameters
//! - [`MemoryStore`] and [`SqliteStore`] backends
//!
//! # Example
//!
//! ```rust,ignore
//! use incident_store::{MemoryStore, RecordStore, Select};
//!
//! let store = MemoryStore::with_entities(["Customers"]);
//! let rows = store
//!     .run(&Select::all("Customers").where_eq("ID", customer_id).into())
//!     .await?
//!     .into_rows();
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod memory;
pub mod query;
pub mod sqlite;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use query::{
    validate_identifier, Condition, Delete, Insert, Query, QueryResult, Record, Select,
    SqlStatement, Update,
};
pub use sqlite::SqliteStore;
pub use store::RecordStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
