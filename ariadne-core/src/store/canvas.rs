use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::anchor::SelectedAnchor;
use crate::layout;
use crate::types::{CanvasSnapshot, ContentPatch, Edge, Node, NodeId, Position};

use super::StoreEvent;
use super::persist::{MemoryPersistence, SnapshotPersistence};

const EVENT_CAPACITY: usize = 1024;

/// What a bulk replace left in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceCounts {
    pub nodes: usize,
    pub edges: usize,
    /// Edges discarded because an endpoint was missing.
    pub dropped_edges: usize,
}

#[derive(Debug, Default)]
struct CanvasState {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    selected_anchor: Option<SelectedAnchor>,
    detail_node: Option<NodeId>,
    highlighted_path: Option<HashSet<NodeId>>,
}

impl CanvasState {
    fn snapshot(&self) -> CanvasSnapshot {
        CanvasSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    fn drop_orphan_edges(&mut self) -> usize {
        let ids: HashSet<&NodeId> = self.nodes.iter().map(|n| &n.id).collect();
        let before = self.edges.len();
        self.edges
            .retain(|e| ids.contains(&e.source) && ids.contains(&e.target));
        before - self.edges.len()
    }
}

/// Shared, observable store of canvas nodes and edges.
///
/// Every node/edge mutation persists the full snapshot and emits a
/// [`StoreEvent`]. Transient state (selected anchor, detail-view node,
/// highlighted path) is never persisted.
#[derive(Debug)]
pub struct CanvasStore {
    state: Mutex<CanvasState>,
    persistence: Box<dyn SnapshotPersistence>,
    events: broadcast::Sender<StoreEvent>,
}

impl CanvasStore {
    /// Rehydrate from `persistence`, dropping any edge whose endpoints are missing.
    pub fn open(persistence: Box<dyn SnapshotPersistence>) -> crate::error::Result<Self> {
        let mut state = CanvasState::default();
        if let Some(snapshot) = persistence.load()? {
            state.nodes = snapshot.nodes;
            state.edges = snapshot.edges;
            let cleaned = state.drop_orphan_edges();
            if cleaned > 0 {
                info!(cleaned, "Cleaned orphan edges on load");
            }
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            state: Mutex::new(state),
            persistence,
            events,
        })
    }

    /// An empty store that persists only in memory.
    pub fn in_memory() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(CanvasState::default()),
            persistence: Box::new(MemoryPersistence::new()),
            events,
        }
    }

    /// Receive [`StoreEvent`]s for every subsequent mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, CanvasState> {
        self.state.lock().expect("canvas store mutex poisoned")
    }

    /// Persist while still holding the lock so snapshots hit storage in
    /// mutation order.
    fn persist(&self, state: &CanvasState) {
        if let Err(e) = self.persistence.save(&state.snapshot()) {
            warn!(error = %e, "Failed to persist canvas snapshot");
        }
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    // ── Node operations ────────────────────────────────────────────

    /// Append a fully formed node. The caller guarantees its id is unique.
    pub fn add_node(&self, node: Node) {
        let id = node.id.clone();
        {
            let mut state = self.lock();
            state.nodes.push(node);
            self.persist(&state);
        }
        self.emit(StoreEvent::NodeAdded(id));
    }

    /// Merge `patch` into a node's content. Unknown ids are ignored and
    /// return `false`; late updates from a stream whose node was deleted land here.
    pub fn update_node_content(&self, node_id: &NodeId, patch: ContentPatch) -> bool {
        {
            let mut state = self.lock();
            let Some(node) = state.nodes.iter_mut().find(|n| &n.id == node_id) else {
                debug!(node = %node_id, "Dropping content update for unknown node");
                return false;
            };
            node.content.apply(patch);
            self.persist(&state);
        }
        self.emit(StoreEvent::ContentUpdated(node_id.clone()));
        true
    }

    /// Overwrite a node's position (end of a drag).
    pub fn update_node_position(&self, node_id: &NodeId, position: Position) -> bool {
        {
            let mut state = self.lock();
            let Some(node) = state.nodes.iter_mut().find(|n| &n.id == node_id) else {
                return false;
            };
            node.position = position;
            self.persist(&state);
        }
        self.emit(StoreEvent::PositionUpdated(node_id.clone()));
        true
    }

    /// Append a fully formed edge. The caller guarantees both endpoints exist.
    pub fn add_edge(&self, edge: Edge) {
        let event = StoreEvent::EdgeAdded {
            source: edge.source.clone(),
            target: edge.target.clone(),
        };
        {
            let mut state = self.lock();
            state.edges.push(edge);
            self.persist(&state);
        }
        self.emit(event);
    }

    /// Append a child node and the edge from its parent in one transition,
    /// so no reader or snapshot sees the node without its edge.
    pub fn add_child(&self, node: Node, edge: Edge) {
        let event = StoreEvent::ChildAdded {
            parent: edge.source.clone(),
            child: node.id.clone(),
        };
        {
            let mut state = self.lock();
            state.nodes.push(node);
            state.edges.push(edge);
            self.persist(&state);
        }
        self.emit(event);
    }

    /// Remove `node_id`, all of its descendants, and every edge touching them.
    ///
    /// Descendants are found by following edges from source to target with an
    /// explicit worklist. Transient selection pointing into the removed set is
    /// cleared. Returns the removed ids in discovery order (empty if the node
    /// was unknown).
    pub fn delete_node(&self, node_id: &NodeId) -> Vec<NodeId> {
        let removed = {
            let mut state = self.lock();
            if state.node(node_id).is_none() {
                return Vec::new();
            }

            let mut order = Vec::new();
            let mut doomed = HashSet::new();
            let mut stack = vec![node_id.clone()];
            while let Some(current) = stack.pop() {
                if !doomed.insert(current.clone()) {
                    continue;
                }
                for edge in state.edges.iter().filter(|e| e.source == current).rev() {
                    stack.push(edge.target.clone());
                }
                order.push(current);
            }

            state.nodes.retain(|n| !doomed.contains(&n.id));
            state.edges.retain(|e| !e.touches(&doomed));

            if state.detail_node.as_ref().is_some_and(|id| doomed.contains(id)) {
                state.detail_node = None;
            }
            if state
                .selected_anchor
                .as_ref()
                .is_some_and(|a| doomed.contains(&a.node_id))
            {
                state.selected_anchor = None;
            }
            if state
                .highlighted_path
                .as_ref()
                .is_some_and(|path| !path.is_disjoint(&doomed))
            {
                state.highlighted_path = None;
            }

            self.persist(&state);
            order
        };

        debug!(root = %node_id, removed = removed.len(), "Deleted subtree");
        self.emit(StoreEvent::SubtreeDeleted {
            root: node_id.clone(),
            removed: removed.clone(),
        });
        removed
    }

    /// Empty the canvas and all transient state.
    pub fn clear_all(&self) {
        {
            let mut state = self.lock();
            *state = CanvasState::default();
            self.persist(&state);
        }
        self.emit(StoreEvent::Cleared);
    }

    // ── Bulk replace ───────────────────────────────────────────────

    /// Replace all nodes, then drop edges left without endpoints.
    pub fn set_nodes(&self, nodes: Vec<Node>) {
        self.replace_with(|state| state.nodes = nodes);
    }

    /// Replace all edges, dropping any without endpoints.
    pub fn set_edges(&self, edges: Vec<Edge>) {
        self.replace_with(|state| state.edges = edges);
    }

    /// Replace nodes and edges in one step (project import). The counts are
    /// taken under the same lock as the replace.
    pub fn replace_all(&self, snapshot: CanvasSnapshot) -> ReplaceCounts {
        self.replace_with(|state| {
            state.nodes = snapshot.nodes;
            state.edges = snapshot.edges;
        })
    }

    fn replace_with(&self, apply: impl FnOnce(&mut CanvasState)) -> ReplaceCounts {
        let counts = {
            let mut state = self.lock();
            apply(&mut state);
            let cleaned = state.drop_orphan_edges();
            if cleaned > 0 {
                info!(cleaned, "Cleaned orphan edges after bulk replace");
            }
            if state
                .detail_node
                .as_ref()
                .is_some_and(|id| state.node(id).is_none())
            {
                state.detail_node = None;
            }
            self.persist(&state);
            ReplaceCounts {
                nodes: state.nodes.len(),
                edges: state.edges.len(),
                dropped_edges: cleaned,
            }
        };
        self.emit(StoreEvent::Replaced {
            nodes: counts.nodes,
            edges: counts.edges,
        });
        counts
    }

    // ── Transient selection ────────────────────────────────────────

    pub fn set_selected_anchor(&self, anchor: Option<SelectedAnchor>) {
        self.lock().selected_anchor = anchor;
        self.emit(StoreEvent::SelectionChanged);
    }

    pub fn selected_anchor(&self) -> Option<SelectedAnchor> {
        self.lock().selected_anchor.clone()
    }

    /// Take the selected anchor, leaving none.
    pub fn take_selected_anchor(&self) -> Option<SelectedAnchor> {
        let taken = self.lock().selected_anchor.take();
        if taken.is_some() {
            self.emit(StoreEvent::SelectionChanged);
        }
        taken
    }

    pub fn set_detail_node(&self, node_id: Option<NodeId>) {
        self.lock().detail_node = node_id;
        self.emit(StoreEvent::SelectionChanged);
    }

    pub fn detail_node(&self) -> Option<NodeId> {
        self.lock().detail_node.clone()
    }

    pub fn set_highlighted_path(&self, path: Option<HashSet<NodeId>>) {
        self.lock().highlighted_path = path;
        self.emit(StoreEvent::SelectionChanged);
    }

    pub fn highlighted_path(&self) -> Option<HashSet<NodeId>> {
        self.lock().highlighted_path.clone()
    }

    /// Highlight the chain from `node_id` back to its root and return it,
    /// starting at `node_id`. Unknown ids clear the highlight.
    pub fn trace_path(&self, node_id: &NodeId) -> Vec<NodeId> {
        let path = {
            let mut state = self.lock();
            let path = state.snapshot().ancestor_path(node_id);
            state.highlighted_path = if path.is_empty() {
                None
            } else {
                Some(path.iter().cloned().collect())
            };
            path
        };
        self.emit(StoreEvent::SelectionChanged);
        path
    }

    /// A click on empty canvas: drop the pending anchor and the highlight.
    pub fn background_click(&self) {
        {
            let mut state = self.lock();
            state.selected_anchor = None;
            state.highlighted_path = None;
        }
        self.emit(StoreEvent::SelectionChanged);
    }

    // ── Readers ────────────────────────────────────────────────────

    pub fn nodes(&self) -> Vec<Node> {
        self.lock().nodes.clone()
    }

    pub fn edges(&self) -> Vec<Edge> {
        self.lock().edges.clone()
    }

    pub fn node(&self, node_id: &NodeId) -> Option<Node> {
        self.lock().node(node_id).cloned()
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.lock().node(node_id).is_some()
    }

    pub fn snapshot(&self) -> CanvasSnapshot {
        self.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.lock().edges.len()
    }

    /// Nodes without a parent, in store order.
    pub fn roots(&self) -> Vec<Node> {
        self.lock().nodes.iter().filter(|n| n.is_root()).cloned().collect()
    }

    /// Direct children of `node_id`, in edge order.
    pub fn children(&self, node_id: &NodeId) -> Vec<Node> {
        let state = self.lock();
        state
            .edges
            .iter()
            .filter(|e| &e.source == node_id)
            .filter_map(|e| state.node(&e.target).cloned())
            .collect()
    }

    /// Where a new child of `parent_id` would be placed right now.
    pub fn calculate_position(&self, parent_id: Option<&NodeId>) -> Position {
        let state = self.lock();
        layout::calculate_position(&state.nodes, &state.edges, parent_id)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
