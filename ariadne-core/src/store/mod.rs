//! The canvas store: authoritative nodes and edges plus transient UI selection.
//!
//! [`CanvasStore`] owns every mutation. Each operation applies one whole-state
//! transition under a lock, persists the node/edge snapshot through a
//! [`SnapshotPersistence`] backend, and announces a [`StoreEvent`] to subscribers.

pub mod canvas;
pub mod persist;

pub use canvas::{CanvasStore, ReplaceCounts};
pub use persist::{JsonFilePersistence, MemoryPersistence, SnapshotPersistence};

use crate::types::NodeId;

/// Change notifications emitted after each store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    NodeAdded(NodeId),
    ContentUpdated(NodeId),
    PositionUpdated(NodeId),
    EdgeAdded { source: NodeId, target: NodeId },
    /// A node was added together with the edge from its parent.
    ChildAdded { parent: NodeId, child: NodeId },
    /// A node and its descendants were removed.
    SubtreeDeleted { root: NodeId, removed: Vec<NodeId> },
    /// Nodes and/or edges were replaced wholesale (import, bulk set).
    Replaced { nodes: usize, edges: usize },
    Cleared,
    /// Anchor, detail-view node, or highlighted path changed.
    SelectionChanged,
}
