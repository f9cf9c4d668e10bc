//! Anchored circular placement.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::model::TableNode;

/// Center the anchor on the origin and spread the other nodes evenly on a
/// circle of `radius`, first one due north, going clockwise on screen.
/// Each satellite's center sits on the circle.
pub fn place(nodes: &mut [TableNode], anchor: usize, radius: f64) {
    let satellites = nodes.len().saturating_sub(1);
    let step = if satellites > 0 {
        2.0 * PI / satellites as f64
    } else {
        0.0
    };

    let mut slot = 0;
    for (i, node) in nodes.iter_mut().enumerate() {
        if i == anchor {
            node.x = -node.width / 2.0;
            node.y = -node.height / 2.0;
            continue;
        }

        let angle = step * slot as f64 - FRAC_PI_2;
        node.x = radius * angle.cos() - node.width / 2.0;
        node.y = radius * angle.sin() - node.height / 2.0;
        slot += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str) -> TableNode {
        TableNode {
            id: id.to_string(),
            display_name: id.to_string(),
            columns: vec![],
            x: 0.0,
            y: 0.0,
            width: 200.0,
            height: 100.0,
            is_anchor: false,
        }
    }

    #[test]
    fn test_first_satellite_due_north() {
        let mut nodes = vec![node("a"), node("b"), node("c")];
        place(&mut nodes, 0, 300.0);

        let (cx, cy) = nodes[1].center();
        assert!(cx.abs() < 1e-9);
        assert!((cy + 300.0).abs() < 1e-9);

        let (cx, cy) = nodes[2].center();
        assert!(cx.abs() < 1e-9);
        assert!((cy - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_anchor_in_middle_of_input() {
        let mut nodes = vec![node("a"), node("b"), node("c")];
        place(&mut nodes, 1, 300.0);

        assert_eq!(nodes[1].center(), (0.0, 0.0));
        assert!((nodes[0].center().1 + 300.0).abs() < 1e-9);
    }
}
