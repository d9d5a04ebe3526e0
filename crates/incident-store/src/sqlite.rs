//! SQLite record store
//!
//! Executes the SQL rendered by [`Query::to_sql`] with every value passed as
//! a bound parameter. The connection is guarded by a mutex; queries run to
//! completion without yielding.

use crate::error::StoreError;
use crate::query::{Query, QueryResult, Record};
use crate::store::RecordStore;
use parking_lot::Mutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Number, Value};
use std::path::Path;

/// Record store backed by a SQLite connection
///
/// Queries execute synchronously on the calling task while holding the
/// connection mutex; `run` never yields to the runtime. Keep queries point
/// lookups or small writes, or wrap the store in `spawn_blocking` when
/// they are not.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a database file
    ///
    /// # Errors
    /// Backend error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database
    ///
    /// # Errors
    /// Backend error if SQLite cannot allocate the database.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run trusted DDL, e.g. schema setup at startup
    ///
    /// # Errors
    /// Backend error from SQLite.
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }

    fn execute(&self, query: &Query) -> Result<QueryResult, StoreError> {
        let stmt = query.to_sql()?;
        let params: Vec<SqlValue> = stmt.params.iter().map(to_sql_value).collect();
        let conn = self.conn.lock();

        if let Query::Select(_) = query {
            let mut prepared = conn.prepare(&stmt.sql)?;
            let names: Vec<String> = prepared
                .column_names()
                .into_iter()
                .map(String::from)
                .collect();
            let rows = prepared.query_map(params_from_iter(params.iter()), |row| {
                let mut record = Record::new();
                for (idx, name) in names.iter().enumerate() {
                    record.insert(name.clone(), from_sql_value(row.get_ref(idx)?));
                }
                Ok(record)
            })?;
            let rows = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(QueryResult::Rows(rows))
        } else {
            let affected = conn.execute(&stmt.sql, params_from_iter(params.iter()))?;
            Ok(QueryResult::Affected(affected))
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for SqliteStore {
    async fn run(&self, query: &Query) -> Result<QueryResult, StoreError> {
        let result = self.execute(query);
        if let Err(e) = &result {
            tracing::debug!(entity = query.entity(), kind = e.kind(), "sqlite query failed");
        }
        result
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .unwrap_or(SqlValue::Null),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

fn from_sql_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
