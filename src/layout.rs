//! Layout solver: assigns a rectangle to every table.
//!
//! Two regimes, picked by node count and anchor presence:
//! - small anchored sets go on a circle around the anchor ([`circular`]);
//! - everything else is row-packed on a square-ish grid ([`grid`]).
//!
//! The solver is pure and deterministic: the same tables, anchor and detail
//! level always produce the same positions.

mod circular;
mod grid;
pub mod routing;

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::measure::NodeMetrics;
use crate::model::{DetailLevel, TableMeta, TableNode};

pub use routing::{ArrowHead, EdgePath, Point, RoutedEdge, route, route_edges};

/// Which placement strategy a layout pass used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutRegime {
    Empty,
    Single,
    Circular,
    Grid,
}

/// Layout engine configuration and computation.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    pub(crate) metrics: NodeMetrics,
    pub(crate) gap_x: f64,
    pub(crate) gap_y: f64,
    pub(crate) max_circular_nodes: usize,
    pub(crate) min_radius: f64,
    pub(crate) base_radius: f64,
    pub(crate) radius_per_node: f64,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl LayoutEngine {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            metrics: NodeMetrics::from_config(&config.sizing),
            gap_x: config.layout.gap_x,
            gap_y: config.layout.gap_y,
            max_circular_nodes: config.layout.max_circular_nodes,
            min_radius: config.layout.min_radius,
            base_radius: config.layout.base_radius,
            radius_per_node: config.layout.radius_per_node,
        }
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    /// Regime for `count` tables when the anchor was (or was not) found.
    pub fn regime(&self, count: usize, anchor_found: bool) -> LayoutRegime {
        match count {
            0 => LayoutRegime::Empty,
            1 => LayoutRegime::Single,
            n if anchor_found && n <= self.max_circular_nodes => LayoutRegime::Circular,
            _ => LayoutRegime::Grid,
        }
    }

    /// Circle radius for `count` nodes including the anchor.
    pub fn circle_radius(&self, count: usize) -> f64 {
        let satellites = count.saturating_sub(1) as f64;
        self.min_radius
            .max(self.base_radius + satellites * self.radius_per_node)
    }

    /// Compute positions for `tables`.
    ///
    /// An `anchor` that names no table in the set falls back to the grid
    /// with no node marked as anchor.
    pub fn layout(
        &self,
        tables: &[TableMeta],
        anchor: Option<&str>,
        detail: DetailLevel,
    ) -> Vec<TableNode> {
        let anchor_index = anchor.and_then(|a| tables.iter().position(|t| t.id == a));
        if let (Some(a), None) = (anchor, anchor_index) {
            warn!(anchor = a, "anchor table not in loaded set, using grid layout");
        }

        let mut nodes: Vec<TableNode> = tables
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let (width, height) = self.metrics.size(&t.columns, detail);
                TableNode {
                    id: t.id.clone(),
                    display_name: t.display_name().to_string(),
                    columns: t.columns.clone(),
                    x: 0.0,
                    y: 0.0,
                    width,
                    height,
                    is_anchor: Some(i) == anchor_index,
                }
            })
            .collect();

        let regime = self.regime(nodes.len(), anchor_index.is_some());
        debug!(?regime, count = nodes.len(), ?detail, "layout pass");

        match regime {
            LayoutRegime::Empty => {}
            LayoutRegime::Single => {
                let node = &mut nodes[0];
                node.x = -node.width / 2.0;
                node.y = -node.height / 2.0;
            }
            LayoutRegime::Circular => {
                if let Some(anchor) = anchor_index {
                    let radius = self.circle_radius(nodes.len());
                    circular::place(&mut nodes, anchor, radius);
                }
            }
            LayoutRegime::Grid => {
                nodes = grid::place(nodes, anchor_index, self.gap_x, self.gap_y);
            }
        }

        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnSpec;

    fn table(id: &str, columns: usize) -> TableMeta {
        TableMeta::new(
            id,
            (0..columns)
                .map(|i| ColumnSpec::new(format!("col{}", i), "int"))
                .collect(),
        )
    }

    fn tables(n: usize) -> Vec<TableMeta> {
        (0..n).map(|i| table(&format!("t{}", i), (i * 7) % 13)).collect()
    }

    fn overlaps(a: &TableNode, b: &TableNode) -> bool {
        a.x < b.x + b.width && b.x < a.x + a.width && a.y < b.y + b.height && b.y < a.y + a.height
    }

    #[test]
    fn test_empty_layout() {
        let engine = LayoutEngine::default();
        assert!(engine.layout(&[], Some("x"), DetailLevel::Detailed).is_empty());
    }

    #[test]
    fn test_single_node_at_origin() {
        let engine = LayoutEngine::default();
        for anchor in [None, Some("only")] {
            let nodes = engine.layout(&[table("only", 3)], anchor, DetailLevel::Detailed);
            assert_eq!(nodes.len(), 1);
            assert_eq!(nodes[0].center(), (0.0, 0.0));
        }
    }

    #[test]
    fn test_anchor_centered_at_origin() {
        let engine = LayoutEngine::default();
        for n in 2..=6 {
            let input = tables(n);
            let anchor_id = input[n / 2].id.clone();
            let nodes = engine.layout(&input, Some(&anchor_id), DetailLevel::Detailed);

            let anchor = nodes.iter().find(|n| n.is_anchor).unwrap();
            assert_eq!(anchor.id, anchor_id);
            assert_eq!(anchor.x, -anchor.width / 2.0);
            assert_eq!(anchor.y, -anchor.height / 2.0);
        }
    }

    #[test]
    fn test_orders_with_three_neighbors() {
        let engine = LayoutEngine::default();
        let input = vec![
            table("orders", 5),
            table("customers", 4),
            table("products", 6),
            table("warehouses", 3),
        ];
        assert_eq!(engine.circle_radius(input.len()), 300.0);

        let nodes = engine.layout(&input, Some("orders"), DetailLevel::Detailed);
        assert_eq!(engine.regime(4, true), LayoutRegime::Circular);
        assert_eq!(nodes[0].center(), (0.0, 0.0));

        let expected = [-90.0_f64, 30.0, 150.0];
        for (node, degrees) in nodes[1..].iter().zip(expected) {
            let (cx, cy) = node.center();
            let angle = cy.atan2(cx).to_degrees();
            assert!((angle - degrees).abs() < 1e-9, "{} at {}", node.id, angle);
            assert!(((cx * cx + cy * cy).sqrt() - 300.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_circle_radius_grows() {
        let engine = LayoutEngine::default();
        assert_eq!(engine.circle_radius(2), 300.0);
        assert_eq!(engine.circle_radius(6), 400.0);
    }

    #[test]
    fn test_large_anchored_set_uses_grid() {
        let engine = LayoutEngine::default();
        let input = tables(7);
        let nodes = engine.layout(&input, Some("t3"), DetailLevel::Detailed);

        assert_eq!(engine.regime(7, true), LayoutRegime::Grid);
        assert_eq!(nodes[0].id, "t3");
        assert!(nodes[0].is_anchor);
        assert_eq!((nodes[0].x, nodes[0].y), (0.0, 0.0));
    }

    #[test]
    fn test_missing_anchor_falls_back_to_grid() {
        let engine = LayoutEngine::default();
        let input = tables(3);
        let nodes = engine.layout(&input, Some("gone"), DetailLevel::Detailed);

        assert!(nodes.iter().all(|n| !n.is_anchor));
        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["t0", "t1", "t2"]);
        assert_eq!((nodes[0].x, nodes[0].y), (0.0, 0.0));
    }

    #[test]
    fn test_grid_never_overlaps() {
        let engine = LayoutEngine::default();
        for detail in [DetailLevel::Detailed, DetailLevel::Compact] {
            for n in 0..40 {
                let nodes = engine.layout(&tables(n), None, detail);
                assert_eq!(nodes.len(), n);
                for (i, a) in nodes.iter().enumerate() {
                    for b in &nodes[i + 1..] {
                        assert!(!overlaps(a, b), "{} overlaps {} (n = {})", a.id, b.id, n);
                    }
                }
            }
        }
    }

    #[test]
    fn test_layout_is_deterministic() {
        let engine = LayoutEngine::default();
        let input = tables(12);
        let first = engine.layout(&input, Some("t5"), DetailLevel::Detailed);
        let second = engine.layout(&input, Some("t5"), DetailLevel::Detailed);
        assert_eq!(first, second);
    }

    #[test]
    fn test_compact_nodes_share_height() {
        let engine = LayoutEngine::default();
        let nodes = engine.layout(&tables(9), None, DetailLevel::Compact);
        assert!(nodes.iter().all(|n| n.height == 44.0 && n.width == 180.0));
    }
}
