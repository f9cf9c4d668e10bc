//! Row-packed grid placement.

use crate::model::TableNode;

/// Anchor first, then input order.
fn ordered(mut nodes: Vec<TableNode>, anchor: Option<usize>) -> Vec<TableNode> {
    if let Some(a) = anchor.filter(|&a| a < nodes.len()) {
        let anchor_node = nodes.remove(a);
        nodes.insert(0, anchor_node);
    }
    nodes
}

/// Place nodes on a `ceil(sqrt(n))`-column grid. Each row is as tall as its
/// tallest node, so variable heights never overlap.
pub fn place(
    nodes: Vec<TableNode>,
    anchor: Option<usize>,
    gap_x: f64,
    gap_y: f64,
) -> Vec<TableNode> {
    let mut nodes = ordered(nodes, anchor);
    if nodes.is_empty() {
        return nodes;
    }

    let cols = (nodes.len() as f64).sqrt().ceil() as usize;
    let rows = nodes.len().div_ceil(cols);
    let cell_width = nodes.iter().map(|n| n.width).fold(0.0, f64::max) + gap_x;

    let mut row_heights = vec![0.0_f64; rows];
    for (i, node) in nodes.iter().enumerate() {
        let row = i / cols;
        row_heights[row] = row_heights[row].max(node.height);
    }

    let mut row_y = Vec::with_capacity(rows);
    let mut y = 0.0;
    for h in &row_heights {
        row_y.push(y);
        y += h + gap_y;
    }

    for (i, node) in nodes.iter_mut().enumerate() {
        node.x = (i % cols) as f64 * cell_width;
        node.y = row_y[i / cols];
    }

    nodes
}
