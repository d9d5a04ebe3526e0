//! Record store capability
//!
//! The guard and the lookup gateway only ever see a `dyn RecordStore`; the
//! concrete backend is chosen at composition time.

use crate::error::StoreError;
use crate::query::{Query, QueryResult, Record, Select};

/// Persistence capability handed to the guard and gateway
///
/// Implementations must execute values as bound parameters only.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Execute a query
    async fn run(&self, query: &Query) -> Result<QueryResult, StoreError>;

    /// Point lookup returning at most one row
    async fn find_one(&self, select: &Select) -> Result<Option<Record>, StoreError> {
        let mut select = select.clone();
        select.one = true;
        let rows = self.run(&Query::Select(select)).await?.into_rows();
        Ok(rows.into_iter().next())
    }
}
