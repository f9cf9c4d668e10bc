//! Progressive loader: pulls table and relationship metadata from a
//! [`DataSource`] in bounded batches, reporting progress as it goes.
//!
//! A load is all-or-nothing. The first data-source error aborts it and no
//! partial result is returned; the caller retries by loading again.

use std::collections::HashSet;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::error::LoadError;
use crate::model::{LoadProgress, RelationshipEdge, TableMeta};
use crate::source::DataSource;

/// What a diagram shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadScope {
    /// One table and its immediate foreign-key neighbours.
    SingleTable(String),
    /// Every table in a schema (`None` for the source's default).
    WholeSchema(Option<String>),
}

impl LoadScope {
    pub fn anchor(&self) -> Option<&str> {
        match self {
            LoadScope::SingleTable(id) => Some(id),
            LoadScope::WholeSchema(_) => None,
        }
    }
}

impl std::fmt::Display for LoadScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadScope::SingleTable(id) => write!(f, "table {}", id),
            LoadScope::WholeSchema(Some(schema)) => write!(f, "schema {}", schema),
            LoadScope::WholeSchema(None) => write!(f, "default schema"),
        }
    }
}

/// Settled result of a successful load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOutcome {
    pub tables: Vec<TableMeta>,
    /// Deduplicated, and only edges whose both endpoints were loaded.
    pub relationships: Vec<RelationshipEdge>,
    /// Anchor of a single-table load. Resolved id when the table was found,
    /// otherwise the requested id, which is then absent from `tables`.
    pub anchor: Option<String>,
}

impl LoadOutcome {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

pub struct Loader<'a> {
    source: &'a dyn DataSource,
    batch_size: usize,
}

impl<'a> Loader<'a> {
    pub fn new(source: &'a dyn DataSource, config: &LoaderConfig) -> Self {
        Self {
            source,
            batch_size: config.batch_size.max(1),
        }
    }

    /// Run one load. `on_progress` first sees `{0, 0}`, then one update per
    /// property batch with `loaded` strictly increasing up to `total`.
    pub async fn load(
        &self,
        scope: &LoadScope,
        mut on_progress: impl FnMut(LoadProgress),
    ) -> Result<LoadOutcome, LoadError> {
        on_progress(LoadProgress::default());
        info!(%scope, "loading diagram");

        let ids: Vec<String> = match scope {
            LoadScope::SingleTable(id) => vec![id.clone()],
            LoadScope::WholeSchema(schema) => self
                .source
                .list_tables(schema.as_deref())
                .await?
                .into_iter()
                .map(|t| t.id)
                .collect(),
        };

        let mut tables = self.fetch_properties(&ids, &mut on_progress).await?;

        let (anchor, relationships) = match scope {
            LoadScope::SingleTable(requested) => {
                // A missing anchor still brings in its neighbours; layout
                // then falls back to the grid.
                let anchor = match tables.first() {
                    Some(table) => table.id.clone(),
                    None => requested.clone(),
                };
                let relationships = self.fetch_neighbours(&anchor, &mut tables).await?;
                (Some(anchor), relationships)
            }
            LoadScope::WholeSchema(_) => (None, self.fetch_all_relationships(&tables).await?),
        };

        let relationships = resolve_relationships(relationships, &tables);
        info!(
            %scope,
            tables = tables.len(),
            relationships = relationships.len(),
            "diagram loaded"
        );

        Ok(LoadOutcome {
            tables,
            relationships,
            anchor,
        })
    }

    /// Batched property fetch. Tables the source no longer knows are dropped.
    async fn fetch_properties(
        &self,
        ids: &[String],
        on_progress: &mut impl FnMut(LoadProgress),
    ) -> Result<Vec<TableMeta>, LoadError> {
        let total = ids.len();
        let mut seen = HashSet::new();
        let mut tables = Vec::with_capacity(total);

        for (batch, chunk) in ids.chunks(self.batch_size).enumerate() {
            let results =
                try_join_all(chunk.iter().map(|id| self.source.get_table_properties(id))).await?;

            for (id, result) in chunk.iter().zip(results) {
                match result {
                    Some(table) if seen.insert(table.id.clone()) => tables.push(table),
                    Some(_) => {}
                    None => warn!(table = %id, "table not found, dropping from diagram"),
                }
            }

            let loaded = ((batch + 1) * self.batch_size).min(total);
            debug!(batch, loaded, total, "property batch done");
            on_progress(LoadProgress { loaded, total });
        }

        Ok(tables)
    }

    /// Anchor relationships, then every referenced table not yet loaded in
    /// one unbounded burst. Immediate neighbours only, so the burst is small.
    async fn fetch_neighbours(
        &self,
        anchor: &str,
        tables: &mut Vec<TableMeta>,
    ) -> Result<Vec<RelationshipEdge>, LoadError> {
        let relationships = self.source.get_relationships(anchor).await?;

        let mut known: HashSet<String> = tables.iter().map(|t| t.id.clone()).collect();
        known.insert(anchor.to_string());
        let mut missing = Vec::new();
        for rel in &relationships {
            for id in [&rel.source_table, &rel.target_table] {
                if known.insert(id.clone()) {
                    missing.push(id.clone());
                }
            }
        }

        debug!(anchor, neighbours = missing.len(), "fetching related tables");
        let results =
            try_join_all(missing.iter().map(|id| self.source.get_table_properties(id))).await?;

        for (id, result) in missing.iter().zip(results) {
            match result {
                Some(table) if !tables.iter().any(|t| t.id == table.id) => tables.push(table),
                Some(_) => {}
                None => warn!(table = %id, "related table not found, dropping from diagram"),
            }
        }

        Ok(relationships)
    }

    async fn fetch_all_relationships(
        &self,
        tables: &[TableMeta],
    ) -> Result<Vec<RelationshipEdge>, LoadError> {
        let mut relationships = Vec::new();
        for chunk in tables.chunks(self.batch_size) {
            let results =
                try_join_all(chunk.iter().map(|t| self.source.get_relationships(&t.id))).await?;
            relationships.extend(results.into_iter().flatten());
        }
        Ok(relationships)
    }
}

/// Deduplicate by the 4-tuple, keeping first-seen order, and drop edges
/// whose endpoints were not loaded.
pub fn resolve_relationships(
    relationships: Vec<RelationshipEdge>,
    tables: &[TableMeta],
) -> Vec<RelationshipEdge> {
    let ids: HashSet<&str> = tables.iter().map(|t| t.id.as_str()).collect();
    let mut seen = HashSet::new();
    let mut dangling = 0;

    let resolved: Vec<RelationshipEdge> = relationships
        .into_iter()
        .filter(|rel| {
            let present = ids.contains(rel.source_table.as_str())
                && ids.contains(rel.target_table.as_str());
            if !present {
                dangling += 1;
            }
            present
        })
        .filter(|rel| seen.insert(rel.clone()))
        .collect();

    if dangling > 0 {
        warn!(dangling, "relationships reference tables missing from the diagram");
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataSourceError;
    use crate::model::{ColumnSpec, TableRef};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted source that yields once per call so batch members overlap.
    #[derive(Default)]
    struct ScriptedSource {
        tables: Vec<String>,
        missing: HashSet<String>,
        relationships: HashMap<String, Vec<RelationshipEdge>>,
        fail_list: bool,
        fail_properties_of: Option<String>,
        fail_relationships_of: Option<String>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        property_calls: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn with_tables(n: usize) -> Self {
            Self {
                tables: (0..n).map(|i| format!("t{:02}", i)).collect(),
                ..Self::default()
            }
        }

        fn relate(mut self, source: &str, target: &str) -> Self {
            let edge = RelationshipEdge::new(source, format!("{}_id", target), target, "id");
            for side in [source, target] {
                self.relationships
                    .entry(side.to_string())
                    .or_default()
                    .push(edge.clone());
            }
            self
        }
    }

    #[async_trait]
    impl DataSource for ScriptedSource {
        async fn list_tables(
            &self,
            schema: Option<&str>,
        ) -> Result<Vec<TableRef>, DataSourceError> {
            if self.fail_list {
                return Err(DataSourceError::Enumerate {
                    scope: schema.unwrap_or("default").to_string(),
                    message: "permission denied".to_string(),
                });
            }
            Ok(self
                .tables
                .iter()
                .map(|id| TableRef {
                    id: id.clone(),
                    schema: schema.map(str::to_string),
                })
                .collect())
        }

        async fn get_table_properties(
            &self,
            id: &str,
        ) -> Result<Option<TableMeta>, DataSourceError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.property_calls.lock().unwrap().push(id.to_string());
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_properties_of.as_deref() == Some(id) {
                return Err(DataSourceError::Properties {
                    table: id.to_string(),
                    message: "timeout".to_string(),
                });
            }
            if self.missing.contains(id) {
                return Ok(None);
            }
            Ok(Some(TableMeta::new(id, vec![ColumnSpec::new("id", "int").primary_key()])))
        }

        async fn get_relationships(
            &self,
            id: &str,
        ) -> Result<Vec<RelationshipEdge>, DataSourceError> {
            tokio::task::yield_now().await;
            if self.fail_relationships_of.as_deref() == Some(id) {
                return Err(DataSourceError::Relationships {
                    table: id.to_string(),
                    message: "connection reset".to_string(),
                });
            }
            Ok(self.relationships.get(id).cloned().unwrap_or_default())
        }

        async fn generate_ddl(&self, id: &str) -> Result<String, DataSourceError> {
            Ok(format!("CREATE TABLE {} (id int);", id))
        }
    }

    fn loader(source: &ScriptedSource) -> Loader<'_> {
        Loader::new(source, &LoaderConfig::default())
    }

    #[tokio::test]
    async fn test_progress_batches_of_five() {
        let source = ScriptedSource::with_tables(12);
        let mut progress = Vec::new();

        let outcome = loader(&source)
            .load(&LoadScope::WholeSchema(None), |p| progress.push(p))
            .await
            .unwrap();

        assert_eq!(outcome.tables.len(), 12);
        let loaded: Vec<(usize, usize)> = progress.iter().map(|p| (p.loaded, p.total)).collect();
        assert_eq!(loaded, vec![(0, 0), (5, 12), (10, 12), (12, 12)]);
    }

    #[tokio::test]
    async fn test_batch_bounds_concurrency() {
        let source = ScriptedSource::with_tables(23);
        loader(&source)
            .load(&LoadScope::WholeSchema(None), |_| {})
            .await
            .unwrap();

        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 5);
        assert_eq!(source.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_progress_monotonic_for_any_size() {
        for n in [0, 1, 4, 5, 6, 17, 30] {
            let source = ScriptedSource::with_tables(n);
            let mut progress = Vec::new();
            loader(&source)
                .load(&LoadScope::WholeSchema(None), |p| progress.push(p))
                .await
                .unwrap();

            assert_eq!(progress[0], LoadProgress::default());
            assert!(progress.windows(2).all(|w| w[0].loaded < w[1].loaded));
            assert!(progress.iter().all(|p| p.loaded <= p.total || p.total == 0));
            assert_eq!(progress.last().unwrap().loaded, n);
        }
    }

    #[tokio::test]
    async fn test_whole_schema_dedupes_relationships() {
        let source = ScriptedSource::with_tables(3)
            .relate("t01", "t00")
            .relate("t02", "t00")
            .relate("t02", "t01");

        let outcome = loader(&source)
            .load(&LoadScope::WholeSchema(Some("public".to_string())), |_| {})
            .await
            .unwrap();

        assert_eq!(
            outcome.relationships,
            vec![
                RelationshipEdge::new("t01", "t00_id", "t00", "id"),
                RelationshipEdge::new("t02", "t00_id", "t00", "id"),
                RelationshipEdge::new("t02", "t01_id", "t01", "id"),
            ]
        );
        assert_eq!(outcome.anchor, None);
    }

    #[tokio::test]
    async fn test_not_found_tables_dropped_with_their_edges() {
        let mut source = ScriptedSource::with_tables(4)
            .relate("t01", "t00")
            .relate("t03", "t00");
        source.missing.insert("t03".to_string());

        let outcome = loader(&source)
            .load(&LoadScope::WholeSchema(None), |_| {})
            .await
            .unwrap();

        let ids: Vec<&str> = outcome.tables.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t00", "t01", "t02"]);
        assert_eq!(
            outcome.relationships,
            vec![RelationshipEdge::new("t01", "t00_id", "t00", "id")]
        );
    }

    #[tokio::test]
    async fn test_single_table_fetches_neighbours() {
        let source = ScriptedSource::with_tables(10)
            .relate("t00", "t01")
            .relate("t00", "t02")
            .relate("t03", "t00")
            .relate("t04", "t05");
        let mut progress = Vec::new();

        let outcome = loader(&source)
            .load(&LoadScope::SingleTable("t00".to_string()), |p| progress.push(p))
            .await
            .unwrap();

        let ids: Vec<&str> = outcome.tables.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t00", "t01", "t02", "t03"]);
        assert_eq!(outcome.anchor.as_deref(), Some("t00"));
        assert_eq!(outcome.relationships.len(), 3);
        assert_eq!(progress.last(), Some(&LoadProgress { loaded: 1, total: 1 }));

        let calls = source.property_calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["t00", "t01", "t02", "t03"]);
    }

    #[tokio::test]
    async fn test_single_table_missing_anchor_keeps_neighbours() {
        let mut source = ScriptedSource::with_tables(4)
            .relate("t00", "t01")
            .relate("t00", "t02")
            .relate("t03", "t01");
        source.missing.insert("t00".to_string());

        let outcome = loader(&source)
            .load(&LoadScope::SingleTable("t00".to_string()), |_| {})
            .await
            .unwrap();

        let ids: Vec<&str> = outcome.tables.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t01", "t02"]);
        assert_eq!(outcome.anchor.as_deref(), Some("t00"));
        assert!(outcome.relationships.is_empty());

        let calls = source.property_calls.lock().unwrap().clone();
        assert_eq!(calls, vec!["t00", "t01", "t02"]);
    }

    #[tokio::test]
    async fn test_single_table_unknown_without_relationships_is_empty() {
        let source = ScriptedSource::with_tables(2).relate("t00", "t01");
        let outcome = loader(&source)
            .load(&LoadScope::SingleTable("ghost".to_string()), |_| {})
            .await
            .unwrap();

        assert!(outcome.is_empty());
        assert_eq!(outcome.anchor.as_deref(), Some("ghost"));
    }

    #[tokio::test]
    async fn test_failure_aborts_whole_load() {
        let mut source = ScriptedSource::with_tables(12);
        source.fail_properties_of = Some("t07".to_string());
        let mut progress = Vec::new();

        let err = loader(&source)
            .load(&LoadScope::WholeSchema(None), |p| progress.push(p))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            LoadError::DataSource(DataSourceError::Properties {
                table: "t07".to_string(),
                message: "timeout".to_string(),
            })
        );
        assert_eq!(progress.last(), Some(&LoadProgress { loaded: 5, total: 12 }));
    }

    #[tokio::test]
    async fn test_enumeration_failure_aborts_load() {
        let mut source = ScriptedSource::with_tables(3);
        source.fail_list = true;
        let mut progress = Vec::new();

        let err = loader(&source)
            .load(&LoadScope::WholeSchema(Some("sales".to_string())), |p| progress.push(p))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            LoadError::DataSource(DataSourceError::Enumerate {
                scope: "sales".to_string(),
                message: "permission denied".to_string(),
            })
        );
        assert_eq!(progress, vec![LoadProgress::default()]);
        assert!(source.property_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_relationship_batch_failure_aborts_load() {
        let mut source = ScriptedSource::with_tables(8).relate("t01", "t00");
        source.fail_relationships_of = Some("t06".to_string());

        let err = loader(&source)
            .load(&LoadScope::WholeSchema(None), |_| {})
            .await
            .unwrap_err();

        assert_eq!(
            err,
            LoadError::DataSource(DataSourceError::Relationships {
                table: "t06".to_string(),
                message: "connection reset".to_string(),
            })
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_anchor_relationship_failure_aborts_load() {
        let mut source = ScriptedSource::with_tables(3).relate("t00", "t01");
        source.fail_relationships_of = Some("t00".to_string());

        let err = loader(&source)
            .load(&LoadScope::SingleTable("t00".to_string()), |_| {})
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LoadError::DataSource(DataSourceError::Relationships { ref table, .. }) if table == "t00"
        ));
    }

    #[test]
    fn test_resolve_relationships_dedupes_across_batches() {
        let tables = vec![
            TableMeta::new("a", vec![]),
            TableMeta::new("b", vec![]),
        ];
        let edge = RelationshipEdge::new("a", "b_id", "b", "id");
        let resolved = resolve_relationships(
            vec![
                edge.clone(),
                RelationshipEdge::new("a", "c_id", "c", "id"),
                edge.clone(),
            ],
            &tables,
        );
        assert_eq!(resolved, vec![edge]);
    }
}
