// Position allocator: places a new child to the right of its parent,
// below existing siblings, stepping down past occupied slots in that column.

use crate::types::{Edge, Node, NodeId, Position};

pub const NODE_WIDTH: f64 = 400.0;
pub const NODE_HEIGHT: f64 = 200.0;
pub const HORIZONTAL_GAP: f64 = 150.0;
pub const VERTICAL_GAP: f64 = 50.0;

/// Upper bound on downward steps while searching for a free slot.
pub const MAX_COLLISION_ATTEMPTS: u32 = 20;

const ROW_STEP: f64 = NODE_HEIGHT + VERTICAL_GAP;

/// Result of a placement search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Position,
    /// Number of downward steps taken. Never exceeds [`MAX_COLLISION_ATTEMPTS`].
    pub attempts: u32,
}

/// Compute where a new child of `parent_id` goes.
pub fn calculate_position(nodes: &[Node], edges: &[Edge], parent_id: Option<&NodeId>) -> Position {
    allocate(nodes, edges, parent_id).position
}

/// Like [`calculate_position`], also reporting how many collision steps were needed.
///
/// An absent or unknown parent places the node at the origin. If the column
/// is still crowded after [`MAX_COLLISION_ATTEMPTS`] steps the last candidate
/// is returned anyway, so overlap is possible in pathological layouts.
pub fn allocate(nodes: &[Node], edges: &[Edge], parent_id: Option<&NodeId>) -> Placement {
    let Some(parent) = parent_id.and_then(|id| nodes.iter().find(|n| &n.id == id)) else {
        return Placement {
            position: Position::ORIGIN,
            attempts: 0,
        };
    };

    let x = parent.position.x + NODE_WIDTH + HORIZONTAL_GAP;

    let column: Vec<f64> = nodes
        .iter()
        .filter(|n| (n.position.x - x).abs() < NODE_WIDTH / 2.0)
        .map(|n| n.position.y)
        .collect();

    let siblings = edges.iter().filter(|e| e.source == parent.id).count();
    #[allow(clippy::cast_precision_loss)]
    let mut y = parent.position.y + siblings as f64 * ROW_STEP;

    let collides = |y: f64| column.iter().any(|other| (other - y).abs() < ROW_STEP);

    let mut attempts = 0;
    while collides(y) && attempts < MAX_COLLISION_ATTEMPTS {
        y += ROW_STEP;
        attempts += 1;
    }

    Placement {
        position: Position::new(x, y),
        attempts,
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeContent;

    fn node_at(id: &str, x: f64, y: f64) -> Node {
        Node {
            id: NodeId::from(id),
            position: Position::new(x, y),
            content: NodeContent::question(id),
            parent_id: None,
            source_anchor: None,
        }
    }

    #[test]
    fn root_goes_to_origin() {
        assert_eq!(calculate_position(&[], &[], None), Position::ORIGIN);
    }

    #[test]
    fn unknown_parent_goes_to_origin() {
        let nodes = vec![node_at("a", 300.0, 300.0)];
        let pos = calculate_position(&nodes, &[], Some(&NodeId::from("missing")));
        assert_eq!(pos, Position::ORIGIN);
    }

    #[test]
    fn first_child_sits_right_of_parent() {
        let nodes = vec![node_at("p", 0.0, 0.0)];
        let pos = calculate_position(&nodes, &[], Some(&NodeId::from("p")));
        assert_eq!(pos, Position::new(550.0, 0.0));
    }

    #[test]
    fn fourth_child_is_three_rows_down() {
        let parent = NodeId::from("p");
        let mut nodes = vec![node_at("p", 0.0, 0.0)];
        let mut edges = Vec::new();
        for i in 0..3 {
            let id = NodeId::from(format!("c{i}"));
            nodes.push(node_at(id.as_str(), 550.0, f64::from(i) * ROW_STEP));
            edges.push(Edge::link(&parent, &id));
        }
        let placement = allocate(&nodes, &edges, Some(&parent));
        assert!(placement.position.y >= 3.0 * ROW_STEP);
        assert_eq!(placement.position.y, 750.0);
        assert_eq!(placement.attempts, 0);
    }

    #[test]
    fn steps_past_foreign_nodes_in_column() {
        // A node from another branch already occupies the first slot.
        let nodes = vec![node_at("p", 0.0, 0.0), node_at("other", 560.0, 100.0)];
        let placement = allocate(&nodes, &[], Some(&NodeId::from("p")));
        assert_eq!(placement.attempts, 2);
        assert_eq!(placement.position.y, 500.0);
    }

    #[test]
    fn search_gives_up_after_bound() {
        let mut nodes = vec![node_at("p", 0.0, 0.0)];
        for i in 0..40 {
            nodes.push(node_at(&format!("w{i}"), 550.0, f64::from(i) * ROW_STEP));
        }
        let placement = allocate(&nodes, &[], Some(&NodeId::from("p")));
        assert_eq!(placement.attempts, MAX_COLLISION_ATTEMPTS);
        assert_eq!(placement.position.y, f64::from(MAX_COLLISION_ATTEMPTS) * ROW_STEP);
    }

    #[test]
    fn nodes_outside_column_are_ignored() {
        let nodes = vec![node_at("p", 0.0, 0.0), node_at("far", 900.0, 0.0)];
        let pos = calculate_position(&nodes, &[], Some(&NodeId::from("p")));
        assert_eq!(pos, Position::new(550.0, 0.0));
    }
}
