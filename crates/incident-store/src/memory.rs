//! In-memory record store
//!
//! Rows are kept per entity in insertion order. Conditions are literal
//! equality on JSON values, so a value is never interpreted as anything but
//! data.

use crate::error::StoreError;
use crate::query::{condition_matches, select_rows, Query, QueryResult, Record};
use crate::store::RecordStore;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Record store backed by process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    entities: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryStore {
    /// Create store with no entities
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store with the given entities registered
    #[must_use]
    pub fn with_entities<I, S>(entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for entity in entities {
            store.register(entity);
        }
        store
    }

    /// Register an entity; no-op if present
    pub fn register(&self, entity: impl Into<String>) {
        self.entities.write().entry(entity.into()).or_default();
    }

    /// Append rows to an entity, registering it if needed
    pub fn seed(&self, entity: impl Into<String>, rows: impl IntoIterator<Item = Record>) {
        self.entities
            .write()
            .entry(entity.into())
            .or_default()
            .extend(rows);
    }

    /// Copy of all rows of an entity
    #[must_use]
    pub fn rows(&self, entity: &str) -> Vec<Record> {
        self.entities.read().get(entity).cloned().unwrap_or_default()
    }

    fn execute(&self, query: &Query) -> Result<QueryResult, StoreError> {
        query.validate()?;
        let unknown = || StoreError::UnknownEntity(query.entity().to_string());

        match query {
            Query::Select(q) => {
                let entities = self.entities.read();
                let rows = entities.get(&q.entity).ok_or_else(unknown)?;
                Ok(QueryResult::Rows(select_rows(q, rows.iter())))
            }
            Query::Insert(q) => {
                let mut entities = self.entities.write();
                let rows = entities.get_mut(&q.entity).ok_or_else(unknown)?;
                rows.extend(q.rows.iter().cloned());
                Ok(QueryResult::Affected(q.rows.len()))
            }
            Query::Update(q) => {
                let mut entities = self.entities.write();
                let rows = entities.get_mut(&q.entity).ok_or_else(unknown)?;
                let mut affected = 0;
                for row in rows
                    .iter_mut()
                    .filter(|r| condition_matches(&q.conditions, r))
                {
                    for (column, value) in &q.set {
                        row.insert(column.clone(), value.clone());
                    }
                    affected += 1;
                }
                Ok(QueryResult::Affected(affected))
            }
            Query::Delete(q) => {
                let mut entities = self.entities.write();
                let rows = entities.get_mut(&q.entity).ok_or_else(unknown)?;
                let before = rows.len();
                rows.retain(|r| !condition_matches(&q.conditions, r));
                Ok(QueryResult::Affected(before - rows.len()))
            }
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn run(&self, query: &Query) -> Result<QueryResult, StoreError> {
        let result = self.execute(query);
        tracing::trace!(entity = query.entity(), ok = result.is_ok(), "memory store query");
        result
    }
}
