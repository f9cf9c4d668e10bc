//! Edge routing between positioned nodes.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::model::{RelationshipEdge, TableNode};

pub type Point = (f64, f64);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EdgePath {
    Line {
        from: Point,
        to: Point,
    },
    Cubic {
        from: Point,
        c1: Point,
        c2: Point,
        to: Point,
    },
}

impl EdgePath {
    pub fn start(&self) -> Point {
        match self {
            EdgePath::Line { from, .. } | EdgePath::Cubic { from, .. } => *from,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            EdgePath::Line { to, .. } | EdgePath::Cubic { to, .. } => *to,
        }
    }

    /// Direction of travel into the end point, in radians.
    pub fn end_angle(&self) -> f64 {
        let (from, to) = match self {
            EdgePath::Line { from, to } => (*from, *to),
            EdgePath::Cubic { from, c2, to, .. } => {
                if c2 == to {
                    (*from, *to)
                } else {
                    (*c2, *to)
                }
            }
        };
        (to.1 - from.1).atan2(to.0 - from.0)
    }
}

/// Arrow affordance at the target end of an edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArrowHead {
    pub tip: Point,
    pub angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedEdge {
    pub edge: RelationshipEdge,
    pub path: EdgePath,
    pub arrow: ArrowHead,
    /// Touches the anchor node; drawn heavier.
    pub emphasized: bool,
}

/// Connect the facing sides of two rectangles along the dominant axis
/// between their centers; the minor axis uses each node's own center.
pub fn route(source: &TableNode, target: &TableNode, simplified: bool) -> EdgePath {
    let (scx, scy) = source.center();
    let (tcx, tcy) = target.center();
    let dx = tcx - scx;
    let dy = tcy - scy;

    if dx.abs() >= dy.abs() {
        let (from, to) = if dx >= 0.0 {
            ((source.x + source.width, scy), (target.x, tcy))
        } else {
            ((source.x, scy), (target.x + target.width, tcy))
        };
        if simplified {
            return EdgePath::Line { from, to };
        }
        let mid_x = (from.0 + to.0) / 2.0;
        EdgePath::Cubic {
            from,
            c1: (mid_x, from.1),
            c2: (mid_x, to.1),
            to,
        }
    } else {
        let (from, to) = if dy >= 0.0 {
            ((scx, source.y + source.height), (tcx, target.y))
        } else {
            ((scx, source.y), (tcx, target.y + target.height))
        };
        if simplified {
            return EdgePath::Line { from, to };
        }
        let mid_y = (from.1 + to.1) / 2.0;
        EdgePath::Cubic {
            from,
            c1: (from.0, mid_y),
            c2: (to.0, mid_y),
            to,
        }
    }
}

/// Loop out of and back into the node's right side.
pub fn route_self_ref(node: &TableNode, loop_offset: f64) -> EdgePath {
    let x = node.x + node.width;
    let y_top = node.y + node.height * 0.3;
    let y_bottom = node.y + node.height * 0.7;

    EdgePath::Cubic {
        from: (x, y_top),
        c1: (x + loop_offset, y_top),
        c2: (x + loop_offset, y_bottom),
        to: (x, y_bottom),
    }
}

/// Route every edge whose endpoints are both present in `nodes`.
pub fn route_edges(
    nodes: &[TableNode],
    edges: &[RelationshipEdge],
    simplified: bool,
    loop_offset: f64,
) -> Vec<RoutedEdge> {
    let by_id: HashMap<&str, &TableNode> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();

    edges
        .iter()
        .filter_map(|edge| {
            let (Some(source), Some(target)) = (
                by_id.get(edge.source_table.as_str()),
                by_id.get(edge.target_table.as_str()),
            ) else {
                debug!(
                    source = %edge.source_table,
                    target = %edge.target_table,
                    "skipping edge with missing endpoint"
                );
                return None;
            };

            let path = if edge.is_self_ref() {
                route_self_ref(source, loop_offset)
            } else {
                route(source, target, simplified)
            };
            let arrow = ArrowHead {
                tip: path.end(),
                angle: path.end_angle(),
            };

            Some(RoutedEdge {
                edge: edge.clone(),
                path,
                arrow,
                emphasized: source.is_anchor || target.is_anchor,
            })
        })
        .collect()
}
