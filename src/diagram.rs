//! A loaded diagram: positioned nodes, routed edges, viewport and search,
//! with the level-of-detail policy applied.
//!
//! Everything positional is derived from `tables`, `relationships`, the
//! anchor and the detail level, and is recomputed wholesale when any of
//! them changes.

use serde::Serialize;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::layout::{LayoutEngine, Point, RoutedEdge, route_edges};
use crate::loader::LoadOutcome;
use crate::model::{Bounds, DetailLevel, RelationshipEdge, TableMeta, TableNode};
use crate::search::{NodeHighlight, SearchState, SearchStatus};
use crate::viewport::{Viewport, ViewportState, ZoomRange};

/// Snapshot handed to the host for painting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub nodes: Vec<TableNode>,
    /// Parallel to `nodes`.
    pub highlights: Vec<NodeHighlight>,
    pub edges: Vec<RoutedEdge>,
    pub viewport: ViewportState,
    pub width: f64,
    pub height: f64,
    pub detail: DetailLevel,
    pub simplified: bool,
    pub search: SearchStatus,
}

#[derive(Debug, Clone)]
pub struct Diagram {
    config: EngineConfig,
    engine: LayoutEngine,
    tables: Vec<TableMeta>,
    relationships: Vec<RelationshipEdge>,
    anchor: Option<String>,
    detail: DetailLevel,
    nodes: Vec<TableNode>,
    edges: Vec<RoutedEdge>,
    viewport: Viewport,
    search: SearchState,
}

impl Diagram {
    /// Build from a finished load and fit it into the viewport. `detail` is
    /// the host's preference; large diagrams are forced to `Compact`.
    pub fn from_outcome(outcome: LoadOutcome, detail: DetailLevel, config: &EngineConfig) -> Self {
        let count = outcome.tables.len();
        let large = count > config.thresholds.compact_above;
        let detail = if large && detail == DetailLevel::Detailed {
            info!(
                count,
                threshold = config.thresholds.compact_above,
                "large diagram, switching to compact detail"
            );
            DetailLevel::Compact
        } else {
            detail
        };

        let mut viewport = Viewport::new(&config.viewport);
        viewport.set_range(ZoomRange::for_node_count(
            &config.viewport,
            count,
            config.thresholds.compact_above,
        ));

        let mut diagram = Self {
            config: config.clone(),
            engine: LayoutEngine::from_config(config),
            tables: outcome.tables,
            relationships: outcome.relationships,
            anchor: outcome.anchor,
            detail,
            nodes: Vec::new(),
            edges: Vec::new(),
            viewport,
            search: SearchState::new(),
        };
        diagram.relayout();
        diagram.fit();
        diagram
    }

    fn relayout(&mut self) {
        self.nodes = self
            .engine
            .layout(&self.tables, self.anchor.as_deref(), self.detail);
        self.edges = route_edges(
            &self.nodes,
            &self.relationships,
            self.is_simplified(),
            self.config.layout.self_loop_offset,
        );
        self.search.refresh(&self.nodes);
        debug!(
            nodes = self.nodes.len(),
            edges = self.edges.len(),
            "diagram laid out"
        );
    }

    pub fn nodes(&self) -> &[TableNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[RoutedEdge] {
        &self.edges
    }

    pub fn detail(&self) -> DetailLevel {
        self.detail
    }

    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Straight edges once the diagram is big enough, whatever the detail.
    pub fn is_simplified(&self) -> bool {
        self.tables.len() > self.config.thresholds.simplify_edges_above
    }

    /// Explicit host choice; re-lays out and re-fits, then re-centers on the
    /// current search match if there is one.
    pub fn set_detail(&mut self, detail: DetailLevel) {
        if detail == self.detail {
            return;
        }
        self.detail = detail;
        self.relayout();
        self.fit();
        self.follow_current();
    }

    pub fn toggle_detail(&mut self) {
        self.set_detail(self.detail.toggled());
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport.set_size(width, height);
    }

    pub fn fit(&mut self) {
        self.viewport.fit_to_bounds(&Bounds::of_nodes(&self.nodes));
    }

    pub fn zoom_by(&mut self, delta: f64) {
        self.viewport.zoom_by(delta);
    }

    pub fn zoom_at(&mut self, delta: f64, screen: Point) {
        self.viewport.zoom_at(delta, screen);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.viewport.pan_by(dx, dy);
    }

    /// Update the query and follow the first match, if any.
    pub fn set_search_query(&mut self, query: &str) -> SearchStatus {
        self.search.update(&self.nodes, query);
        self.follow_current();
        self.search.status()
    }

    pub fn search_next(&mut self) -> SearchStatus {
        self.search.next();
        self.follow_current();
        self.search.status()
    }

    pub fn search_previous(&mut self) -> SearchStatus {
        self.search.previous();
        self.follow_current();
        self.search.status()
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
    }

    fn follow_current(&mut self) {
        let Some(id) = self.search.current() else {
            return;
        };
        if let Some(node) = self.nodes.iter().find(|n| n.id == id) {
            self.viewport.center_on(node);
        }
    }

    /// Topmost node under a screen point. Later nodes paint over earlier ones.
    pub fn node_at(&self, screen: Point) -> Option<&TableNode> {
        let world = self.viewport.screen_to_world(screen);
        self.nodes.iter().rev().find(|n| n.contains(world))
    }

    pub fn scene(&self) -> Scene {
        let (width, height) = self.viewport.size();
        Scene {
            nodes: self.nodes.clone(),
            highlights: self
                .nodes
                .iter()
                .map(|n| self.search.highlight(&n.id))
                .collect(),
            edges: self.edges.clone(),
            viewport: self.viewport.state(),
            width,
            height,
            detail: self.detail,
            simplified: self.is_simplified(),
            search: self.search.status(),
        }
    }
}
