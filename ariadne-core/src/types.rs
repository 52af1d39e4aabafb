use std::collections::HashSet;

use serde::{Deserialize, Serialize};

// ── Typed ID wrappers ──────────────────────────────────────────────

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

typed_id!(NodeId);
typed_id!(EdgeId);

impl NodeId {
    /// Fresh random identifier for a new node.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl EdgeId {
    /// Edge ids are derived from the endpoint pair, so a parent/child link
    /// always has the same id.
    pub fn between(source: &NodeId, target: &NodeId) -> Self {
        Self(format!("edge-{source}-{target}"))
    }
}

// ── Geometry ───────────────────────────────────────────────────────

/// A point on the canvas (or on screen, for selection popovers).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ── Nodes ──────────────────────────────────────────────────────────

/// The question/answer payload of a node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeContent {
    /// The question text. Fixed at creation.
    pub user_prompt: String,
    /// The answer text, grown by the streaming pipeline.
    #[serde(default)]
    pub ai_response: String,
    /// Model that produced the answer, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Total tokens reported by the endpoint, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
}

impl NodeContent {
    pub fn question(prompt: impl Into<String>) -> Self {
        Self {
            user_prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Shallow-merge a patch; fields absent from the patch are kept.
    pub fn apply(&mut self, patch: ContentPatch) {
        if let Some(response) = patch.ai_response {
            self.ai_response = response;
        }
        if let Some(model) = patch.model {
            self.model = Some(model);
        }
        if let Some(tokens) = patch.tokens_used {
            self.tokens_used = Some(tokens);
        }
    }
}

/// Partial update for [`NodeContent`]. Has no `user_prompt` field; the
/// question is fixed at creation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContentPatch {
    pub ai_response: Option<String>,
    pub model: Option<String>,
    pub tokens_used: Option<u64>,
}

impl ContentPatch {
    pub fn response(text: impl Into<String>) -> Self {
        Self {
            ai_response: Some(text.into()),
            ..Self::default()
        }
    }
}

/// The span of a parent's answer a follow-up question branched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAnchor {
    pub text: String,
    pub start_index: usize,
    pub end_index: usize,
}

impl SourceAnchor {
    /// Offsets span the anchor text itself (`0..len`); they are not
    /// resolved against the parent's answer.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let end_index = text.chars().count();
        Self {
            text,
            start_index: 0,
            end_index,
        }
    }
}

/// One question/answer exchange placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Position,
    pub content: NodeContent,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_anchor: Option<SourceAnchor>,
}

impl Node {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

// ── Edges ──────────────────────────────────────────────────────────

/// Directed parent → child link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn link(source: &NodeId, target: &NodeId) -> Self {
        Self {
            id: EdgeId::between(source, target),
            source: source.clone(),
            target: target.clone(),
        }
    }

    pub fn touches(&self, ids: &HashSet<NodeId>) -> bool {
        ids.contains(&self.source) || ids.contains(&self.target)
    }
}

// ── Snapshot ───────────────────────────────────────────────────────

/// The persisted shape of a canvas: nodes and edges, nothing transient.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl CanvasSnapshot {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Ancestor chain from `id` back to its root, starting with `id`.
    /// Empty if `id` is unknown. Stops on a repeated id.
    pub fn ancestor_path(&self, id: &NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.node(id);
        while let Some(node) = current {
            if !seen.insert(node.id.clone()) {
                break;
            }
            path.push(node.id.clone());
            current = node.parent_id.as_ref().and_then(|p| self.node(p));
        }
        path
    }
}

// ── Tests ───────────────────────────────────────────────────────────
