//! Typed, parameterized queries
//!
//! Values never become part of query text. Entity and column names are
//! checked to be plain identifiers; values are only ever carried as bound
//! parameters and rendered as `?N` placeholders by [`Query::to_sql`].

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored row: column name to value
pub type Record = Map<String, Value>;

const MAX_IDENTIFIER_LEN: usize = 64;

/// Check that a name is `[A-Za-z_][A-Za-z0-9_]*`
///
/// # Errors
/// `StoreError::InvalidIdentifier` otherwise.
pub fn validate_identifier(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if head_ok && tail_ok && name.len() <= MAX_IDENTIFIER_LEN {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Equality predicate on one column; the value is bound, never inlined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Column name
    pub column: String,
    /// Literal value to match
    pub value: Value,
}

impl Condition {
    /// Create condition
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Literal match against a record
    #[inline]
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        record.get(&self.column).unwrap_or(&Value::Null) == &self.value
    }
}

fn matches_all(conditions: &[Condition], record: &Record) -> bool {
    conditions.iter().all(|c| c.matches(record))
}

/// Read query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Select {
    /// Entity name
    pub entity: String,
    /// Projected columns; empty selects all
    pub columns: Vec<String>,
    /// Conjunction of equality conditions
    pub conditions: Vec<Condition>,
    /// Return at most one row
    pub one: bool,
}

impl Select {
    /// Select all rows of an entity
    #[must_use]
    pub fn all(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            columns: Vec::new(),
            conditions: Vec::new(),
            one: false,
        }
    }

    /// Select at most one row of an entity
    #[must_use]
    pub fn one(entity: impl Into<String>) -> Self {
        Self {
            one: true,
            ..Self::all(entity)
        }
    }

    /// Project columns
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add equality condition
    #[must_use]
    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::eq(column, value));
        self
    }

    /// Whether a record satisfies every condition
    #[inline]
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        matches_all(&self.conditions, record)
    }

    /// Restrict a record to the projected columns
    #[must_use]
    pub fn project(&self, record: &Record) -> Record {
        if self.columns.is_empty() {
            return record.clone();
        }
        self.columns
            .iter()
            .map(|c| (c.clone(), record.get(c).cloned().unwrap_or(Value::Null)))
            .collect()
    }
}

/// Insert query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insert {
    /// Entity name
    pub entity: String,
    /// Rows to insert; all rows must share the same columns
    pub rows: Vec<Record>,
}

impl Insert {
    /// Insert into an entity
    #[must_use]
    pub fn entity(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            rows: Vec::new(),
        }
    }

    /// Add row
    #[must_use]
    pub fn row(mut self, row: Record) -> Self {
        self.rows.push(row);
        self
    }

    /// Add rows
    #[must_use]
    pub fn rows(mut self, rows: impl IntoIterator<Item = Record>) -> Self {
        self.rows.extend(rows);
        self
    }
}

/// Update query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Entity name
    pub entity: String,
    /// Columns to overwrite
    pub set: Record,
    /// Conjunction of equality conditions; must not be empty
    pub conditions: Vec<Condition>,
}

impl Update {
    /// Update an entity
    #[must_use]
    pub fn entity(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            set: Record::new(),
            conditions: Vec::new(),
        }
    }

    /// Columns to overwrite
    #[must_use]
    pub fn set(mut self, set: Record) -> Self {
        self.set = set;
        self
    }

    /// Add equality condition
    #[must_use]
    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::eq(column, value));
        self
    }
}

/// Delete query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delete {
    /// Entity name
    pub entity: String,
    /// Conjunction of equality conditions; must not be empty
    pub conditions: Vec<Condition>,
}

impl Delete {
    /// Delete from an entity
    #[must_use]
    pub fn entity(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            conditions: Vec::new(),
        }
    }

    /// Add equality condition
    #[must_use]
    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::eq(column, value));
        self
    }
}

/// Any query the store can run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    /// Read
    Select(Select),
    /// Insert
    Insert(Insert),
    /// Update
    Update(Update),
    /// Delete
    Delete(Delete),
}

impl From<Select> for Query {
    fn from(q: Select) -> Self {
        Self::Select(q)
    }
}

impl From<Insert> for Query {
    fn from(q: Insert) -> Self {
        Self::Insert(q)
    }
}

impl From<Update> for Query {
    fn from(q: Update) -> Self {
        Self::Update(q)
    }
}

impl From<Delete> for Query {
    fn from(q: Delete) -> Self {
        Self::Delete(q)
    }
}

/// Rendered SQL text with its bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    /// Query text with `?N` placeholders
    pub sql: String,
    /// Parameters in placeholder order
    pub params: Vec<Value>,
}

impl SqlStatement {
    fn new() -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn bind(&mut self, value: &Value) -> String {
        self.params.push(value.clone());
        format!("?{}", self.params.len())
    }

    fn push_where(&mut self, conditions: &[Condition]) {
        if conditions.is_empty() {
            return;
        }
        let clauses: Vec<String> = conditions
            .iter()
            .map(|c| {
                let op = if c.value.is_null() { "IS" } else { "=" };
                let placeholder = self.bind(&c.value);
                format!("{} {op} {placeholder}", c.column)
            })
            .collect();
        self.sql.push_str(" WHERE ");
        self.sql.push_str(&clauses.join(" AND "));
    }
}

impl Query {
    /// Target entity
    #[must_use]
    pub fn entity(&self) -> &str {
        match self {
            Self::Select(q) => &q.entity,
            Self::Insert(q) => &q.entity,
            Self::Update(q) => &q.entity,
            Self::Delete(q) => &q.entity,
        }
    }

    /// Structural checks shared by every backend
    ///
    /// # Errors
    /// - `InvalidIdentifier` for a non-identifier entity or column
    /// - `UnboundedWrite` for an update/delete without conditions
    /// - `InvalidQuery` for empty inserts/updates or ragged insert rows
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_identifier(self.entity())?;
        match self {
            Self::Select(q) => {
                q.columns.iter().try_for_each(|c| validate_identifier(c))?;
                validate_conditions(&q.conditions)
            }
            Self::Insert(q) => {
                let first = q
                    .rows
                    .first()
                    .ok_or_else(|| StoreError::InvalidQuery("insert without rows".to_string()))?;
                if first.is_empty() {
                    return Err(StoreError::InvalidQuery("insert of empty row".to_string()));
                }
                first.keys().try_for_each(|c| validate_identifier(c))?;
                if q.rows.iter().any(|r| !r.keys().eq(first.keys())) {
                    return Err(StoreError::InvalidQuery(
                        "insert rows with differing columns".to_string(),
                    ));
                }
                Ok(())
            }
            Self::Update(q) => {
                if q.conditions.is_empty() {
                    return Err(StoreError::UnboundedWrite("update", q.entity.clone()));
                }
                if q.set.is_empty() {
                    return Err(StoreError::InvalidQuery("update without columns".to_string()));
                }
                q.set.keys().try_for_each(|c| validate_identifier(c))?;
                validate_conditions(&q.conditions)
            }
            Self::Delete(q) => {
                if q.conditions.is_empty() {
                    return Err(StoreError::UnboundedWrite("delete", q.entity.clone()));
                }
                validate_conditions(&q.conditions)
            }
        }
    }

    /// Render SQL with `?N` placeholders
    ///
    /// # Errors
    /// Any error from [`Query::validate`].
    pub fn to_sql(&self) -> Result<SqlStatement, StoreError> {
        self.validate()?;
        let mut stmt = SqlStatement::new();
        match self {
            Self::Select(q) => {
                let columns = if q.columns.is_empty() {
                    "*".to_string()
                } else {
                    q.columns.join(", ")
                };
                stmt.sql = format!("SELECT {columns} FROM {}", q.entity);
                stmt.push_where(&q.conditions);
                if q.one {
                    stmt.sql.push_str(" LIMIT 1");
                }
            }
            Self::Insert(q) => {
                let columns: Vec<&str> = q.rows[0].keys().map(String::as_str).collect();
                let tuples: Vec<String> = q
                    .rows
                    .iter()
                    .map(|row| {
                        let placeholders: Vec<String> =
                            row.values().map(|v| stmt.bind(v)).collect();
                        format!("({})", placeholders.join(", "))
                    })
                    .collect();
                stmt.sql = format!(
                    "INSERT INTO {} ({}) VALUES {}",
                    q.entity,
                    columns.join(", "),
                    tuples.join(", ")
                );
            }
            Self::Update(q) => {
                let assignments: Vec<String> = q
                    .set
                    .iter()
                    .map(|(column, value)| format!("{column} = {}", stmt.bind(value)))
                    .collect();
                stmt.sql = format!("UPDATE {} SET {}", q.entity, assignments.join(", "));
                stmt.push_where(&q.conditions);
            }
            Self::Delete(q) => {
                stmt.sql = format!("DELETE FROM {}", q.entity);
                stmt.push_where(&q.conditions);
            }
        }
        Ok(stmt)
    }
}

fn validate_conditions(conditions: &[Condition]) -> Result<(), StoreError> {
    conditions
        .iter()
        .try_for_each(|c| validate_identifier(&c.column))
}

/// Result of running a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// Rows returned by a select
    Rows(Vec<Record>),
    /// Rows affected by a write
    Affected(usize),
}

impl QueryResult {
    /// Returned rows; empty for writes
    #[must_use]
    pub fn into_rows(self) -> Vec<Record> {
        match self {
            Self::Rows(rows) => rows,
            Self::Affected(_) => Vec::new(),
        }
    }

    /// Affected or returned row count
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Rows(rows) => rows.len(),
            Self::Affected(n) => *n,
        }
    }
}

pub(crate) fn select_rows<'a>(
    select: &Select,
    rows: impl Iterator<Item = &'a Record>,
) -> Vec<Record> {
    let matched = rows.filter(|r| select.matches(r)).map(|r| select.project(r));
    if select.one {
        matched.take(1).collect()
    } else {
        matched.collect()
    }
}

pub(crate) fn condition_matches(conditions: &[Condition], record: &Record) -> bool {
    matches_all(conditions, record)
}
