//! Tree mutations that involve more than one store write: creating a node
//! with its edge and answer stream, following up on a selection, and
//! deleting or resetting while streams are in flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::PromptSection;
use crate::error::{AriadneError, StoreError};
use crate::llm::prompt::{self, FollowUpContext, PromptContext};
use crate::store::CanvasStore;
use crate::stream::{StreamHandle, StreamRequest, StreamingPipeline};
use crate::types::{Edge, Node, NodeContent, NodeId, SourceAnchor};

/// A node that was just inserted, with the stream filling in its answer.
#[derive(Debug)]
pub struct CreatedNode {
    pub id: NodeId,
    pub stream: StreamHandle,
}

/// A registered stream: its token and a handle on its task.
#[derive(Debug)]
struct StreamEntry {
    token: CancellationToken,
    task: AbortHandle,
}

impl StreamEntry {
    fn is_live(&self) -> bool {
        !self.token.is_cancelled() && !self.task.is_finished()
    }
}

/// Streams started by this orchestrator. Every token is a child of `root`,
/// so cancelling `root` stops them all.
#[derive(Debug, Default)]
struct StreamRegistry {
    root: CancellationToken,
    active: HashMap<NodeId, StreamEntry>,
}

impl StreamRegistry {
    /// Drop entries whose stream ended or whose node is gone.
    fn prune(&mut self, store: &CanvasStore) {
        self.active
            .retain(|node, entry| entry.is_live() && store.contains(node));
    }
}

#[derive(Debug)]
pub struct Orchestrator {
    store: Arc<CanvasStore>,
    pipeline: StreamingPipeline,
    prompt: PromptSection,
    streams: Mutex<StreamRegistry>,
}

impl Orchestrator {
    pub fn new(pipeline: StreamingPipeline) -> Self {
        Self {
            store: Arc::clone(pipeline.store()),
            pipeline,
            prompt: PromptSection::default(),
            streams: Mutex::new(StreamRegistry::default()),
        }
    }

    /// Use the `[prompt]` preferences when building system instructions.
    #[must_use]
    pub fn with_prompt(mut self, prompt: PromptSection) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn store(&self) -> &Arc<CanvasStore> {
        &self.store
    }

    fn streams(&self) -> MutexGuard<'_, StreamRegistry> {
        self.streams.lock().expect("stream registry mutex poisoned")
    }

    /// Insert a node (and its edge, when `parent_id` is given) and start
    /// streaming its answer. Returns without waiting for the stream.
    ///
    /// Blank prompts and unknown parents are rejected before any mutation.
    pub fn create_node(
        &self,
        prompt: &str,
        parent_id: Option<&NodeId>,
        anchor_text: Option<&str>,
    ) -> crate::error::Result<CreatedNode> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AriadneError::InvalidInput("prompt must not be empty".into()));
        }
        let parent = match parent_id {
            Some(id) => Some(
                self.store
                    .node(id)
                    .ok_or_else(|| StoreError::NodeNotFound(id.to_string()))?,
            ),
            None => None,
        };
        let anchor_text = anchor_text.map(str::trim).filter(|a| !a.is_empty());

        // Taken before the insert so the new node is not part of its own context.
        let project_context = if self.prompt.include_project_context {
            prompt::render_project_context(&self.store.nodes())
        } else {
            None
        };

        let id = NodeId::generate();
        let position = self.store.calculate_position(parent_id);
        let node = Node {
            id: id.clone(),
            position,
            content: NodeContent::question(prompt),
            parent_id: parent.as_ref().map(|p| p.id.clone()),
            source_anchor: anchor_text.map(SourceAnchor::from_text),
        };
        match &parent {
            Some(parent) => self.store.add_child(node, Edge::link(&parent.id, &id)),
            None => self.store.add_node(node),
        }

        let follow_up = match (&parent, anchor_text) {
            (Some(parent), Some(anchor)) => Some(FollowUpContext {
                anchor: anchor.to_string(),
                parent_answer: parent.content.ai_response.clone(),
            }),
            _ => None,
        };
        let system_instruction = prompt::build_system_instruction(&PromptContext {
            custom_instruction: self.prompt.custom_instruction.clone(),
            project_context,
            follow_up,
        });

        info!(
            node = %id,
            parent = ?parent_id.map(NodeId::as_str),
            x = position.x,
            y = position.y,
            "Created node"
        );

        let stream = {
            let mut streams = self.streams();
            streams.prune(&self.store);
            let token = streams.root.child_token();
            let stream = self.pipeline.spawn_with_token(
                StreamRequest {
                    node_id: id.clone(),
                    prompt: prompt.to_string(),
                    system_instruction,
                },
                token.clone(),
            );
            streams.active.insert(
                id.clone(),
                StreamEntry {
                    token,
                    task: stream.abort_handle(),
                },
            );
            stream
        };

        Ok(CreatedNode { id, stream })
    }

    /// Ask a new top-level question.
    pub fn create_root(&self, prompt: &str) -> crate::error::Result<CreatedNode> {
        self.create_node(prompt, None, None)
    }

    /// Branch a child off the current selection. On success the selection is
    /// cleared and the new node becomes the detail-view node.
    pub fn follow_up(&self, question: &str) -> crate::error::Result<CreatedNode> {
        let anchor = self
            .store
            .selected_anchor()
            .ok_or(AriadneError::NoActiveSelection)?;
        let created = self.create_node(question, Some(&anchor.node_id), Some(&anchor.text))?;
        self.store.set_selected_anchor(None);
        self.store.set_detail_node(Some(created.id.clone()));
        Ok(created)
    }

    /// Delete a node and its descendants, cancelling their streams.
    pub fn delete_node(&self, node_id: &NodeId) -> Vec<NodeId> {
        let removed = self.store.delete_node(node_id);
        let mut streams = self.streams();
        for id in &removed {
            if let Some(entry) = streams.active.remove(id) {
                debug!(node = %id, "Cancelling stream of deleted node");
                entry.token.cancel();
            }
        }
        removed
    }

    /// Cancel every stream and empty the canvas.
    pub fn reset(&self) {
        {
            let mut streams = self.streams();
            streams.root.cancel();
            streams.root = CancellationToken::new();
            streams.active.clear();
        }
        self.store.clear_all();
        info!("Canvas reset");
    }

    /// Streams still running for nodes that exist. Finished and cancelled
    /// entries are pruned on the way.
    pub fn active_streams(&self) -> usize {
        let mut streams = self.streams();
        streams.prune(&self.store);
        streams.active.len()
    }
}

// ── Tests ───────────────────────────────────────────────────────────
