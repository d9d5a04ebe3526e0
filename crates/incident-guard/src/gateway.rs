//! Customer lookup gateway
//!
//! Answers `fetchCustomer` on the admin resource. The customer identifier is
//! only ever a bound parameter of a [`Select`]; it is never part of query
//! text. Any store failure is recorded to the diagnostic sink in redacted
//! form and surfaced as a generic 400.

use crate::config::GuardConfig;
use crate::diagnostics::{DiagnosticSink, SecurityEvent, SecurityEventKind};
use crate::error::Rejection;
use incident_model::{holds_role, LookupRequest};
use incident_store::{Record, RecordStore, Select};
use std::sync::Arc;

const OPERATION: &str = "fetchCustomer";

/// Why a customer identifier was refused before reaching the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputIssue {
    /// Empty or whitespace only
    Empty,
    /// Longer than the configured maximum
    TooLong,
    /// Contains control characters
    ControlCharacter,
}

impl InputIssue {
    /// Static category for diagnostics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooLong => "too_long",
            Self::ControlCharacter => "control_character",
        }
    }
}

/// Gateway for the admin customer lookup
pub struct LookupGateway {
    store: Arc<dyn RecordStore>,
    sink: Arc<dyn DiagnosticSink>,
    entity: String,
    id_column: String,
    max_id_len: usize,
    admin_role: String,
    require_admin: bool,
}

impl LookupGateway {
    /// Create gateway
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        sink: Arc<dyn DiagnosticSink>,
        config: &GuardConfig,
    ) -> Self {
        Self {
            store,
            sink,
            entity: config.customer_entity.clone(),
            id_column: config.customer_id_column.clone(),
            max_id_len: config.max_customer_id_len,
            admin_role: config.admin_role.clone(),
            require_admin: config.require_admin_for_lookup,
        }
    }

    /// Handle an inbound lookup, enforcing the admin gate when configured
    ///
    /// # Errors
    /// 403 without the admin role, otherwise as [`LookupGateway::fetch_customer`].
    pub async fn handle(&self, request: &LookupRequest) -> Result<Vec<Record>, Rejection> {
        if self.require_admin && !holds_role(request.requester.as_ref(), &self.admin_role) {
            self.sink.record(SecurityEvent::new(
                SecurityEventKind::LookupDenied,
                OPERATION,
                "missing_role",
            ));
            return Err(Rejection::admin_required());
        }
        self.fetch_customer(&request.customer_id).await
    }

    /// Look up customers whose key equals `customer_id` literally
    ///
    /// Metacharacters carry no meaning: `' OR '1'='1` matches only a
    /// customer with exactly that key.
    ///
    /// # Errors
    /// 400 "Invalid customer identifier" when the input fails validation or
    /// the store fails. Neither the input nor the store's error text is
    /// echoed.
    pub async fn fetch_customer(&self, customer_id: &str) -> Result<Vec<Record>, Rejection> {
        if let Err(issue) = self.validate(customer_id) {
            self.sink.record(
                SecurityEvent::new(SecurityEventKind::InputRejected, OPERATION, issue.as_str())
                    .with_input(customer_id),
            );
            return Err(Rejection::invalid_customer());
        }

        let query = Select::all(&self.entity).where_eq(&self.id_column, customer_id);
        match self.store.run(&query.into()).await {
            Ok(result) => {
                let rows = result.into_rows();
                tracing::debug!(rows = rows.len(), "customer lookup completed");
                Ok(rows)
            }
            Err(e) => {
                self.sink.record(
                    SecurityEvent::new(SecurityEventKind::LookupFailed, OPERATION, e.kind())
                        .with_input(customer_id),
                );
                Err(Rejection::invalid_customer())
            }
        }
    }

    /// Shape checks applied before the store is touched
    ///
    /// # Errors
    /// The first [`InputIssue`] found.
    pub fn validate(&self, customer_id: &str) -> Result<(), InputIssue> {
        if customer_id.trim().is_empty() {
            return Err(InputIssue::Empty);
        }
        if customer_id.chars().count() > self.max_id_len {
            return Err(InputIssue::TooLong);
        }
        if customer_id.chars().any(char::is_control) {
            return Err(InputIssue::ControlCharacter);
        }
        Ok(())
    }
}

impl std::fmt::Debug for LookupGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupGateway")
            .field("entity", &self.entity)
            .field("id_column", &self.id_column)
            .field("max_id_len", &self.max_id_len)
            .field("require_admin", &self.require_admin)
            .finish_non_exhaustive()
    }
}
