//! Incident records
//!
//! Defines the persisted incident, the partial draft carried by mutation
//! payloads, and the status/urgency snapshot the guard reads before a write.
//! Wire codes follow the stored data set: status `N`/`A`/`C`, urgency
//! `L`/`M`/`H`.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use uuid::Uuid;

/// Column names of the `Incidents` entity
pub mod columns {
    /// Primary key
    pub const ID: &str = "ID";
    /// Free-text title
    pub const TITLE: &str = "title";
    /// Status code (`N`, `A`, `C`)
    pub const STATUS: &str = "status_code";
    /// Urgency code (`L`, `M`, `H`)
    pub const URGENCY: &str = "urgency_code";
    /// Assignee identifier
    pub const ASSIGNED_TO: &str = "assignedTo";
}

/// Unique incident identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(pub Uuid);

impl IncidentId {
    /// Generate new incident ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for IncidentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IncidentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IncidentId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| ModelError::invalid_field(columns::ID, e.to_string()))
    }
}

/// Incident lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    /// Newly reported
    #[serde(rename = "N")]
    New,
    /// Picked up by a processor
    #[serde(rename = "A")]
    Assigned,
    /// Resolved and frozen
    #[serde(rename = "C")]
    Closed,
}

impl StatusCode {
    /// Stored code
    #[inline]
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::New => "N",
            Self::Assigned => "A",
            Self::Closed => "C",
        }
    }

    /// Display label
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Assigned => "Assigned",
            Self::Closed => "Closed",
        }
    }

    /// Whether the incident is closed
    #[inline]
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        Self::New
    }
}

impl FromStr for StatusCode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "N" => Ok(Self::New),
            "A" => Ok(Self::Assigned),
            "C" => Ok(Self::Closed),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Incident urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UrgencyCode {
    /// Low urgency
    #[serde(rename = "L")]
    Low,
    /// Medium urgency
    #[serde(rename = "M")]
    Medium,
    /// High urgency
    #[serde(rename = "H")]
    High,
}

impl UrgencyCode {
    /// Stored code
    #[inline]
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Low => "L",
            Self::Medium => "M",
            Self::High => "H",
        }
    }

    /// Display label
    #[inline]
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

impl Default for UrgencyCode {
    fn default() -> Self {
        Self::Medium
    }
}

impl FromStr for UrgencyCode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L" => Ok(Self::Low),
            "M" => Ok(Self::Medium),
            "H" => Ok(Self::High),
            other => Err(ModelError::UnknownUrgency(other.to_string())),
        }
    }
}

impl std::fmt::Display for UrgencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Urgency reference as carried in payloads: code plus display label
///
/// Deserializes from either a bare code (`"H"`) or `{ "code": "H", "descr": "High" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UrgencyRepr")]
pub struct UrgencyRef {
    /// Urgency code
    pub code: UrgencyCode,
    /// Display label
    pub descr: String,
}

impl UrgencyRef {
    /// High urgency with its display label
    #[inline]
    #[must_use]
    pub fn high() -> Self {
        Self::from(UrgencyCode::High)
    }
}

impl From<UrgencyCode> for UrgencyRef {
    fn from(code: UrgencyCode) -> Self {
        Self {
            code,
            descr: code.label().to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UrgencyRepr {
    Code(UrgencyCode),
    Full {
        code: UrgencyCode,
        #[serde(default)]
        descr: Option<String>,
    },
}

impl From<UrgencyRepr> for UrgencyRef {
    fn from(repr: UrgencyRepr) -> Self {
        match repr {
            UrgencyRepr::Code(code) => Self::from(code),
            UrgencyRepr::Full { code, descr } => Self {
                code,
                descr: descr.unwrap_or_else(|| code.label().to_string()),
            },
        }
    }
}

/// Partial incident carried by a mutation payload
///
/// Every field is optional; absent fields are left untouched by the write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentDraft {
    /// Target or new identifier
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<IncidentId>,
    /// Title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Requested status
    #[serde(rename = "status_code", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusCode>,
    /// Requested urgency
    #[serde(alias = "urgency_code", default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<UrgencyRef>,
    /// Assignee
    #[serde(rename = "assignedTo", default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

impl IncidentDraft {
    /// Create empty draft
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With identifier
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: IncidentId) -> Self {
        self.id = Some(id);
        self
    }

    /// With title
    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// With urgency
    #[inline]
    #[must_use]
    pub fn with_urgency(mut self, urgency: UrgencyCode) -> Self {
        self.urgency = Some(UrgencyRef::from(urgency));
        self
    }

    /// Urgency code, if set
    #[inline]
    #[must_use]
    pub fn urgency_code(&self) -> Option<UrgencyCode> {
        self.urgency.as_ref().map(|u| u.code)
    }

    /// Whether this draft requests the incident be closed
    #[inline]
    #[must_use]
    pub fn closes(&self) -> bool {
        self.status.is_some_and(StatusCode::is_closed)
    }

    /// Case-insensitive keyword match on the title; false when untitled
    #[must_use]
    pub fn title_mentions(&self, keyword: &str) -> bool {
        self.title
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains(&keyword.to_lowercase()))
    }

    /// Stored columns set by this draft
    #[must_use]
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        if let Some(id) = self.id {
            record.insert(columns::ID.to_string(), Value::String(id.to_string()));
        }
        if let Some(title) = &self.title {
            record.insert(columns::TITLE.to_string(), Value::String(title.clone()));
        }
        if let Some(status) = self.status {
            record.insert(columns::STATUS.to_string(), Value::from(status.code()));
        }
        if let Some(urgency) = &self.urgency {
            record.insert(columns::URGENCY.to_string(), Value::from(urgency.code.code()));
        }
        if let Some(assignee) = &self.assigned_to {
            record.insert(columns::ASSIGNED_TO.to_string(), Value::String(assignee.clone()));
        }
        record
    }

    /// Materialize a full incident, generating an ID when absent
    ///
    /// # Errors
    /// `ModelError::MissingField` when the title is absent.
    pub fn into_incident(self) -> Result<Incident, ModelError> {
        let title = self.title.ok_or(ModelError::MissingField(columns::TITLE))?;
        Ok(Incident {
            id: self.id.unwrap_or_default(),
            title,
            status: self.status.unwrap_or_default(),
            urgency: self.urgency.map(|u| u.code).unwrap_or_default(),
            assigned_to: self.assigned_to,
        })
    }
}

/// Persisted incident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    /// Identifier
    #[serde(rename = "ID")]
    pub id: IncidentId,
    /// Title
    pub title: String,
    /// Status
    #[serde(rename = "status_code")]
    pub status: StatusCode,
    /// Urgency
    #[serde(rename = "urgency_code")]
    pub urgency: UrgencyCode,
    /// Assignee
    #[serde(rename = "assignedTo", default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

impl Incident {
    /// Create new incident with default status and urgency
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: IncidentId::new(),
            title: title.into(),
            status: StatusCode::default(),
            urgency: UrgencyCode::default(),
            assigned_to: None,
        }
    }

    /// With identifier
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: IncidentId) -> Self {
        self.id = id;
        self
    }

    /// With status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// With urgency
    #[inline]
    #[must_use]
    pub fn with_urgency(mut self, urgency: UrgencyCode) -> Self {
        self.urgency = urgency;
        self
    }

    /// With assignee
    #[inline]
    #[must_use]
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assigned_to = Some(assignee.into());
        self
    }

    /// Status/urgency pair read by the guard
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> IncidentSnapshot {
        IncidentSnapshot {
            status: self.status,
            urgency: self.urgency,
        }
    }

    /// Stored representation
    #[must_use]
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert(columns::ID.to_string(), Value::String(self.id.to_string()));
        record.insert(columns::TITLE.to_string(), Value::String(self.title.clone()));
        record.insert(columns::STATUS.to_string(), Value::from(self.status.code()));
        record.insert(columns::URGENCY.to_string(), Value::from(self.urgency.code()));
        record.insert(
            columns::ASSIGNED_TO.to_string(),
            self.assigned_to.clone().map_or(Value::Null, Value::String),
        );
        record
    }

    /// Parse a stored record
    ///
    /// # Errors
    /// Fails when a required column is missing or holds an unknown code.
    pub fn from_record(record: &Map<String, Value>) -> Result<Self, ModelError> {
        let id: IncidentId = required_str(record, columns::ID)?.parse()?;
        let title = required_str(record, columns::TITLE)?.to_string();
        let assigned_to = optional_str(record, columns::ASSIGNED_TO)?.map(str::to_string);
        let IncidentSnapshot { status, urgency } = IncidentSnapshot::from_record(record)?;
        Ok(Self {
            id,
            title,
            status,
            urgency,
            assigned_to,
        })
    }
}

/// Persisted status and urgency of an incident
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IncidentSnapshot {
    /// Current status
    pub status: StatusCode,
    /// Current urgency
    pub urgency: UrgencyCode,
}

impl IncidentSnapshot {
    /// Columns the guard projects in its point lookup
    pub const COLUMNS: [&'static str; 2] = [columns::STATUS, columns::URGENCY];

    /// Create snapshot
    #[inline]
    #[must_use]
    pub const fn new(status: StatusCode, urgency: UrgencyCode) -> Self {
        Self { status, urgency }
    }

    /// Parse from a record projected on [`Self::COLUMNS`]
    ///
    /// A missing urgency column falls back to the default urgency.
    ///
    /// # Errors
    /// Fails when the status is missing or a code is unknown.
    pub fn from_record(record: &Map<String, Value>) -> Result<Self, ModelError> {
        let status: StatusCode = required_str(record, columns::STATUS)?.parse()?;
        let urgency = optional_str(record, columns::URGENCY)?
            .map(str::parse::<UrgencyCode>)
            .transpose()?
            .unwrap_or_default();
        Ok(Self { status, urgency })
    }
}

fn optional_str<'a>(
    record: &'a Map<String, Value>,
    column: &'static str,
) -> Result<Option<&'a str>, ModelError> {
    match record.get(column) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(ModelError::invalid_field(
            column,
            format!("expected string, got {other}"),
        )),
    }
}

fn required_str<'a>(
    record: &'a Map<String, Value>,
    column: &'static str,
) -> Result<&'a str, ModelError> {
    optional_str(record, column)?.ok_or(ModelError::MissingField(column))
}
