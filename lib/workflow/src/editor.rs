//! Editing session for one workflow.
//!
//! The session owns its copy of the graph and drives the node selector.
//! Rejected insertions leave the graph as it was and queue a notice for the
//! user; successful ones close the selector.

use crate::connection::Connection;
use crate::error::PlacementError;
use crate::graph::WorkflowGraph;
use crate::placement::{ScreenPoint, Viewport, request_insertion};
use crate::registry::{NodeRole, NodeType, NodeTypeDescriptor, NodeTypeRegistry};
use automa_core::{ConnectionId, NodeId, WorkflowId};
use rand::Rng;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

/// A user-visible message produced by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub message: String,
}

/// The graph to persist for a workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub workflow_id: WorkflowId,
    #[serde(flatten)]
    pub graph: WorkflowGraph,
}

/// In-memory editing state for one workflow.
#[derive(Debug, Clone)]
pub struct EditorSession {
    registry: Arc<NodeTypeRegistry>,
    workflow_id: WorkflowId,
    graph: WorkflowGraph,
    viewport: Viewport,
    selector_open: bool,
    dirty: bool,
    notices: Vec<Notice>,
}

impl EditorSession {
    /// Opens a session on a loaded graph.
    #[must_use]
    pub fn new(registry: Arc<NodeTypeRegistry>, workflow_id: WorkflowId, graph: WorkflowGraph) -> Self {
        Self {
            registry,
            workflow_id,
            graph,
            viewport: Viewport::default(),
            selector_open: false,
            dirty: false,
            notices: Vec::new(),
        }
    }

    #[must_use]
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    #[must_use]
    pub fn workflow_id(&self) -> WorkflowId {
        self.workflow_id
    }

    /// Returns whether the graph changed since the last save request.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Records the editor's current pan and zoom.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn open_selector(&mut self) {
        self.selector_open = true;
    }

    pub fn close_selector(&mut self) {
        self.selector_open = false;
    }

    #[must_use]
    pub fn is_selector_open(&self) -> bool {
        self.selector_open
    }

    /// Node types the selector offers under `role`.
    pub fn selector_entries(&self, role: NodeRole) -> impl Iterator<Item = &NodeTypeDescriptor> {
        self.registry.list_by_role(role)
    }

    /// Inserts a node of `node_type` near `screen_point`.
    ///
    /// # Errors
    ///
    /// Returns the placement error after queueing a notice for it. The graph
    /// and the selector state are left unchanged.
    pub fn insert_node<R: Rng + ?Sized>(
        &mut self,
        node_type: NodeType,
        screen_point: ScreenPoint,
        rng: &mut R,
    ) -> Result<NodeId, PlacementError> {
        match request_insertion(
            &self.registry,
            &self.graph,
            node_type,
            screen_point,
            self.viewport,
            rng,
        ) {
            Ok(insertion) => {
                self.graph = insertion.graph;
                self.selector_open = false;
                self.dirty = true;
                Ok(insertion.node_id)
            }
            Err(err) => {
                let message = match &err {
                    PlacementError::DuplicateSingletonNode { node_type } => {
                        let label = self
                            .registry
                            .describe(*node_type)
                            .map_or(node_type.as_str(), |d| d.label);
                        format!("Only one {} is allowed per workflow", label.to_lowercase())
                    }
                    other => other.to_string(),
                };
                self.notices.push(Notice { message });
                Err(err)
            }
        }
    }

    /// Adds a connection drawn by the user.
    pub fn connect(&mut self, connection: Connection) {
        self.apply(|graph| graph.add_connection(connection));
    }

    pub fn remove_node(&mut self, node_id: &NodeId) {
        self.apply(|graph| graph.remove_node(node_id));
    }

    pub fn remove_connection(&mut self, connection_id: &ConnectionId) {
        self.apply(|graph| graph.remove_connection(connection_id));
    }

    /// Merges a settings-dialog submission into a node's data.
    pub fn update_node_data(&mut self, node_id: &NodeId, patch: Map<String, JsonValue>) {
        self.apply(|graph| graph.update_node_data(node_id, patch));
    }

    /// Drains queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Snapshots the graph for saving and clears the dirty flag.
    pub fn save_request(&mut self) -> SaveRequest {
        self.dirty = false;
        SaveRequest {
            workflow_id: self.workflow_id,
            graph: self.graph.clone(),
        }
    }

    fn apply(&mut self, edit: impl FnOnce(WorkflowGraph) -> WorkflowGraph) {
        let before = std::mem::take(&mut self.graph);
        let snapshot = before.clone();
        self.graph = edit(before);
        if self.graph != snapshot {
            self.dirty = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Position;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::json;

    fn session(graph: WorkflowGraph) -> EditorSession {
        EditorSession::new(
            Arc::new(NodeTypeRegistry::builtin()),
            WorkflowId::new(),
            graph,
        )
    }

    #[test]
    fn insertion_closes_selector() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut editor = session(WorkflowGraph::seeded());
        editor.open_selector();

        let id = editor
            .insert_node(NodeType::ManualTrigger, ScreenPoint::new(300.0, 200.0), &mut rng)
            .expect("insert");

        assert!(!editor.is_selector_open());
        assert!(editor.is_dirty());
        assert_eq!(editor.graph().node_count(), 1);
        assert_eq!(editor.graph().nodes()[0].id, id);
    }

    #[test]
    fn rejected_insertion_queues_notice_and_keeps_state() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut editor = session(WorkflowGraph::seeded());
        editor
            .insert_node(NodeType::ManualTrigger, ScreenPoint::default(), &mut rng)
            .expect("first trigger");
        let before = editor.graph().clone();

        editor.open_selector();
        let err = editor
            .insert_node(NodeType::ManualTrigger, ScreenPoint::default(), &mut rng)
            .unwrap_err();

        assert!(matches!(err, PlacementError::DuplicateSingletonNode { .. }));
        assert!(editor.is_selector_open());
        assert_eq!(editor.graph(), &before);

        let notices = editor.take_notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains("manual trigger"));
        assert!(editor.take_notices().is_empty());
    }

    #[test]
    fn selector_offers_triggers_and_actions() {
        let editor = session(WorkflowGraph::seeded());
        let triggers: Vec<_> = editor
            .selector_entries(NodeRole::Trigger)
            .map(|d| d.label)
            .collect();
        let actions: Vec<_> = editor
            .selector_entries(NodeRole::Action)
            .map(|d| d.label)
            .collect();
        assert_eq!(triggers, vec!["Manual Trigger"]);
        assert_eq!(actions, vec!["HTTP Request"]);
    }

    #[test]
    fn editing_flows_into_save_request() {
        let trigger: NodeId = "t".parse().expect("id");
        let request: NodeId = "r".parse().expect("id");
        let graph = WorkflowGraph::new()
            .add_node(trigger.clone(), NodeType::ManualTrigger, Position::ORIGIN)
            .add_node(request.clone(), NodeType::HttpRequest, Position::new(200.0, 0.0));
        let mut editor = session(graph);
        assert!(!editor.is_dirty());

        editor.connect(Connection::new(
            "c1".parse().expect("id"),
            trigger.clone(),
            request.clone(),
        ));
        let JsonValue::Object(patch) = json!({"endpoint": "https://example.com", "method": "POST"})
        else {
            unreachable!()
        };
        editor.update_node_data(&request, patch);

        let save = editor.save_request();
        assert!(!editor.is_dirty());
        assert_eq!(save.workflow_id, editor.workflow_id());
        assert_eq!(save.graph.connection_count(), 1);
        assert_eq!(
            save.graph.node_data(&request).and_then(|d| d.get("method")),
            Some(&json!("POST"))
        );

        editor.remove_node(&trigger);
        assert_eq!(editor.graph().connection_count(), 0);
        assert!(editor.is_dirty());
    }

    #[test]
    fn no_op_edits_leave_session_clean() {
        let mut editor = session(WorkflowGraph::seeded());
        let missing_connection: ConnectionId = "missing".parse().expect("id");
        let missing_node: NodeId = "missing".parse().expect("id");
        editor.remove_connection(&missing_connection);
        editor.update_node_data(&missing_node, Map::new());
        assert!(!editor.is_dirty());
    }

    #[test]
    fn save_request_serializes_graph_inline() {
        let mut editor = session(WorkflowGraph::new());
        let value = serde_json::to_value(editor.save_request()).expect("serialize");
        assert_eq!(value["nodes"], json!([]));
        assert_eq!(value["connections"], json!([]));
        assert!(value["workflowId"].is_string());
    }
}
