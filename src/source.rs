//! Interface to the external metadata provider.

mod memory;

use async_trait::async_trait;

use crate::error::DataSourceError;
use crate::model::{RelationshipEdge, TableMeta, TableRef};

pub use memory::MemorySource;

/// Table and foreign-key metadata provider.
///
/// Implementations talk to a live database, a cache, a parsed dump, etc.
/// The loader is the only caller and never issues more than one batch of
/// requests at a time.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Tables in `schema`, or in the default namespace when `None`.
    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<TableRef>, DataSourceError>;

    /// Columns of one table. `Ok(None)` means the table no longer exists.
    async fn get_table_properties(&self, id: &str) -> Result<Option<TableMeta>, DataSourceError>;

    /// Foreign keys in which `id` takes part, inbound or outbound.
    async fn get_relationships(&self, id: &str)
    -> Result<Vec<RelationshipEdge>, DataSourceError>;

    /// `CREATE TABLE` text for the "copy DDL" action.
    async fn generate_ddl(&self, id: &str) -> Result<String, DataSourceError>;
}
