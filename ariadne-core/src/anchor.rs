//! Text-selection tracking inside rendered answers.
//!
//! At most one [`SelectedAnchor`] exists at a time and lives only in the
//! store's transient state; starting a new selection replaces the old one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AriadneError, StoreError};
use crate::store::CanvasStore;
use crate::types::{NodeId, Position};

/// Offsets of a selection within the rendered answer. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    /// Char offsets of the first occurrence of `needle` in `haystack`.
    pub fn locate(haystack: &str, needle: &str) -> Option<Self> {
        if needle.is_empty() {
            return None;
        }
        let byte_start = haystack.find(needle)?;
        let start = haystack[..byte_start].chars().count();
        Some(Self {
            start,
            end: start + needle.chars().count(),
        })
    }
}

/// A highlighted span awaiting a follow-up question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedAnchor {
    pub node_id: NodeId,
    /// The trimmed selection text.
    pub text: String,
    pub range: TextRange,
    /// Where the selection sits on screen, for placing a popover.
    pub position: Option<Position>,
}

/// Captures selections into the store's single anchor slot.
#[derive(Debug, Clone)]
pub struct AnchorTracker {
    store: Arc<CanvasStore>,
}

impl AnchorTracker {
    pub fn new(store: Arc<CanvasStore>) -> Self {
        Self { store }
    }

    /// Record a selection made inside `node_id`'s answer.
    ///
    /// Whitespace-only selections are ignored and leave any current anchor in
    /// place (`Ok(None)`). Selections in unknown nodes are rejected.
    pub fn capture(
        &self,
        node_id: &NodeId,
        selection: &str,
        range: TextRange,
        position: Option<Position>,
    ) -> crate::error::Result<Option<SelectedAnchor>> {
        let text = selection.trim();
        if text.is_empty() {
            return Ok(None);
        }
        if !self.store.contains(node_id) {
            return Err(AriadneError::Store(StoreError::NodeNotFound(
                node_id.to_string(),
            )));
        }

        let anchor = SelectedAnchor {
            node_id: node_id.clone(),
            text: text.to_string(),
            range,
            position,
        };
        debug!(node = %node_id, chars = anchor.text.chars().count(), "Captured selection");
        self.store.set_selected_anchor(Some(anchor.clone()));
        Ok(Some(anchor))
    }

    /// Dismiss the current selection.
    pub fn clear(&self) {
        self.store.set_selected_anchor(None);
    }

    pub fn current(&self) -> Option<SelectedAnchor> {
        self.store.selected_anchor()
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Node, NodeContent};

    fn tracker_with_node(id: &str) -> AnchorTracker {
        let store = Arc::new(CanvasStore::in_memory());
        store.add_node(Node {
            id: NodeId::from(id),
            position: Position::ORIGIN,
            content: NodeContent::question("q"),
            parent_id: None,
            source_anchor: None,
        });
        AnchorTracker::new(store)
    }

    #[test]
    fn capture_trims_selection() {
        let tracker = tracker_with_node("n");
        let anchor = tracker
            .capture(&NodeId::from("n"), "  disorder \n", TextRange { start: 3, end: 15 }, None)
            .unwrap()
            .unwrap();
        assert_eq!(anchor.text, "disorder");
        assert_eq!(tracker.current(), Some(anchor));
    }

    #[test]
    fn blank_selection_keeps_previous() {
        let tracker = tracker_with_node("n");
        tracker
            .capture(&NodeId::from("n"), "first", TextRange::default(), None)
            .unwrap();
        let result = tracker
            .capture(&NodeId::from("n"), "   ", TextRange::default(), None)
            .unwrap();
        assert!(result.is_none());
        assert_eq!(tracker.current().unwrap().text, "first");
    }

    #[test]
    fn new_selection_overwrites_old() {
        let tracker = tracker_with_node("n");
        tracker
            .capture(&NodeId::from("n"), "first", TextRange::default(), None)
            .unwrap();
        tracker
            .capture(
                &NodeId::from("n"),
                "second",
                TextRange::default(),
                Some(Position::new(12.0, 40.0)),
            )
            .unwrap();
        let current = tracker.current().unwrap();
        assert_eq!(current.text, "second");
        assert_eq!(current.position, Some(Position::new(12.0, 40.0)));
    }

    #[test]
    fn unknown_node_is_rejected() {
        let tracker = tracker_with_node("n");
        let err = tracker
            .capture(&NodeId::from("other"), "text", TextRange::default(), None)
            .unwrap_err();
        assert!(matches!(err, AriadneError::Store(StoreError::NodeNotFound(_))));
        assert!(tracker.current().is_none());
    }

    #[test]
    fn clear_removes_selection() {
        let tracker = tracker_with_node("n");
        tracker
            .capture(&NodeId::from("n"), "text", TextRange::default(), None)
            .unwrap();
        tracker.clear();
        assert!(tracker.current().is_none());
    }

    #[test]
    fn locate_uses_char_offsets() {
        let range = TextRange::locate("L'entropie est le désordre.", "désordre").unwrap();
        assert_eq!(range, TextRange { start: 18, end: 26 });
        assert!(TextRange::locate("abc", "zzz").is_none());
        assert!(TextRange::locate("abc", "").is_none());
    }
}
