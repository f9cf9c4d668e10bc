use std::collections::BTreeMap;

use async_trait::async_trait;

use super::DataSource;
use crate::ddl::generate_ddl;
use crate::error::DataSourceError;
use crate::model::{RelationshipEdge, TableMeta, TableRef, display_name};
use crate::sql::{ParsedSchema, SqlParseError, parse_ddl};

/// In-memory catalog, usually built from a DDL dump.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: BTreeMap<String, (Option<String>, TableMeta)>,
    /// Declaration order of table ids.
    order: Vec<String>,
    foreign_keys: Vec<RelationshipEdge>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ddl(source: &str) -> Result<Self, SqlParseError> {
        Ok(Self::from_parsed(parse_ddl(source)?))
    }

    pub fn from_parsed(parsed: ParsedSchema) -> Self {
        let mut memory = Self::new();
        for table in parsed.tables {
            let id = table.id();
            memory.insert_table(table.schema, TableMeta::new(id, table.columns));
        }
        for fk in parsed.foreign_keys {
            memory.insert_relationship(fk);
        }
        memory
    }

    pub fn insert_table(&mut self, schema: Option<String>, table: TableMeta) {
        if !self.tables.contains_key(&table.id) {
            self.order.push(table.id.clone());
        }
        self.tables.insert(table.id.clone(), (schema, table));
    }

    pub fn remove_table(&mut self, id: &str) -> Option<TableMeta> {
        self.order.retain(|t| t != id);
        self.tables.remove(id).map(|(_, t)| t)
    }

    pub fn insert_relationship(&mut self, edge: RelationshipEdge) {
        if !self.foreign_keys.contains(&edge) {
            self.foreign_keys.push(edge);
        }
    }

    pub fn table_count(&self) -> usize {
        self.order.len()
    }

    /// `id` may be qualified or, when unambiguous, a bare table name.
    fn resolve(&self, id: &str) -> Option<&TableMeta> {
        if let Some((_, t)) = self.tables.get(id) {
            return Some(t);
        }
        let mut by_name = self.tables.values().filter(|(_, t)| display_name(&t.id) == id);
        match (by_name.next(), by_name.next()) {
            (Some((_, t)), None) => Some(t),
            _ => None,
        }
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<TableRef>, DataSourceError> {
        Ok(self
            .order
            .iter()
            .filter_map(|id| self.tables.get(id))
            .filter(|(s, _)| schema.is_none() || s.as_deref() == schema)
            .map(|(s, t)| TableRef {
                id: t.id.clone(),
                schema: s.clone(),
            })
            .collect())
    }

    async fn get_table_properties(&self, id: &str) -> Result<Option<TableMeta>, DataSourceError> {
        Ok(self.resolve(id).cloned())
    }

    async fn get_relationships(
        &self,
        id: &str,
    ) -> Result<Vec<RelationshipEdge>, DataSourceError> {
        let id = self.resolve(id).map_or(id, |t| t.id.as_str());
        Ok(self
            .foreign_keys
            .iter()
            .filter(|fk| fk.touches(id))
            .cloned()
            .collect())
    }

    async fn generate_ddl(&self, id: &str) -> Result<String, DataSourceError> {
        let table = self.resolve(id).ok_or_else(|| DataSourceError::Ddl {
            table: id.to_string(),
            message: "table not found".to_string(),
        })?;
        Ok(generate_ddl(table, &self.foreign_keys))
    }
}
