//! Security diagnostics
//!
//! Security-relevant events go to a [`DiagnosticSink`] handed to each
//! component at composition time. Events only carry static categories and a
//! digest of the offending input, so raw user input and raw backend error
//! text cannot reach the sink.

use serde::Serialize;

/// Kind of security-relevant event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SecurityEventKind {
    /// Lookup input failed validation before reaching the store
    InputRejected,
    /// Store failed while answering a lookup
    LookupFailed,
    /// Caller without the admin role attempted an admin lookup
    LookupDenied,
    /// Mutation rejected by policy
    MutationRejected,
    /// Store or record failure while guarding or persisting a mutation
    MutationFailed,
}

/// Redacted security event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityEvent {
    /// Event kind
    pub kind: SecurityEventKind,
    /// Operation that raised it (`fetchCustomer`, `UPDATE`, ...)
    pub operation: &'static str,
    /// Static detail category, e.g. a store error kind
    pub detail: &'static str,
    /// Truncated digest of the untrusted input, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_digest: Option<String>,
}

impl SecurityEvent {
    /// Create event
    #[must_use]
    pub fn new(kind: SecurityEventKind, operation: &'static str, detail: &'static str) -> Self {
        Self {
            kind,
            operation,
            detail,
            input_digest: None,
        }
    }

    /// Attach a digest of the untrusted input
    #[must_use]
    pub fn with_input(mut self, input: &str) -> Self {
        self.input_digest = Some(redact(input));
        self
    }
}

/// Correlatable, non-reversible fingerprint of untrusted input
#[must_use]
pub fn redact(input: &str) -> String {
    let hash = blake3::hash(input.as_bytes());
    hash.to_hex().as_str()[..16].to_string()
}

/// Internal diagnostic channel for security events
pub trait DiagnosticSink: Send + Sync {
    /// Record an event
    fn record(&self, event: SecurityEvent);
}

/// Sink emitting events through `tracing` under the `security` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: SecurityEvent) {
        tracing::warn!(
            target: "security",
            kind = ?event.kind,
            operation = event.operation,
            detail = event.detail,
            input_digest = event.input_digest.as_deref().unwrap_or("-"),
            "security event"
        );
    }
}
