//! Mapping between workflow graphs and their relational storage rows.
//!
//! Storage keeps one row per node and one row per connection. Nodes carry a
//! `name` column next to their data payload; the mapper keeps the two in
//! step:
//!
//! - writing, `name` is the node's string label, or its type identifier when
//!   no label was ever set
//! - reading, a string `label` already in the payload wins; otherwise the
//!   label is synthesized from `name`
//!
//! Reading is lenient: a payload that is not a JSON object becomes an empty
//! object, and connection rows whose endpoints are not among the node rows
//! are dropped with a warning. Storage cascades node deletes into
//! connections, so such rows only appear if that guarantee was bypassed.

use crate::connection::Connection;
use crate::graph::WorkflowGraph;
use crate::node::{Node, NodeData, Position};
use crate::registry::{DEFAULT_HANDLE, NodeType};
use automa_core::{ConnectionId, NodeId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;

/// A stored node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRow {
    pub id: NodeId,
    pub workflow_id: WorkflowId,
    pub node_type: NodeType,
    pub name: String,
    pub position_x: f64,
    pub position_y: f64,
    pub data: JsonValue,
}

/// A stored connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRow {
    pub id: ConnectionId,
    pub workflow_id: WorkflowId,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    pub from_output: String,
    pub to_input: String,
}

/// Converts a graph into the rows that store it under `workflow_id`.
#[must_use]
pub fn to_storage_rows(
    workflow_id: WorkflowId,
    graph: &WorkflowGraph,
) -> (Vec<NodeRow>, Vec<ConnectionRow>) {
    let nodes = graph
        .nodes()
        .iter()
        .map(|node| NodeRow {
            id: node.id.clone(),
            workflow_id,
            node_type: node.node_type,
            name: node
                .data
                .label()
                .map_or_else(|| node.node_type.as_str().to_string(), str::to_string),
            position_x: node.position.x,
            position_y: node.position.y,
            data: node.data.clone().into_value(),
        })
        .collect();

    let connections = graph
        .connections()
        .iter()
        .map(|connection| ConnectionRow {
            id: connection.id.clone(),
            workflow_id,
            from_node_id: connection.source.clone(),
            to_node_id: connection.target.clone(),
            from_output: handle_or_default(&connection.source_handle),
            to_input: handle_or_default(&connection.target_handle),
        })
        .collect();

    (nodes, connections)
}

/// Rebuilds a graph from its stored rows.
#[must_use]
pub fn from_storage_rows(nodes: Vec<NodeRow>, connections: Vec<ConnectionRow>) -> WorkflowGraph {
    let known: HashSet<NodeId> = nodes.iter().map(|row| row.id.clone()).collect();

    let connections = connections
        .into_iter()
        .filter(|row| {
            let intact = known.contains(&row.from_node_id) && known.contains(&row.to_node_id);
            if !intact {
                tracing::warn!(
                    connection_id = %row.id,
                    workflow_id = %row.workflow_id,
                    from_node_id = %row.from_node_id,
                    to_node_id = %row.to_node_id,
                    "dropping connection with missing endpoint"
                );
            }
            intact
        })
        .map(|row| {
            Connection::between(
                row.id,
                row.from_node_id,
                handle_or_default(&row.from_output),
                row.to_node_id,
                handle_or_default(&row.to_input),
            )
        })
        .collect();

    let nodes = nodes
        .into_iter()
        .map(|row| {
            let data = NodeData::from_value_lenient(row.data);
            let data = if data.label().is_some() {
                data
            } else {
                data.with_label(row.name)
            };
            Node::new(
                row.id,
                row.node_type,
                Position::new(row.position_x, row.position_y),
            )
            .with_data(data)
        })
        .collect();

    WorkflowGraph::from_parts(nodes, connections)
}

fn handle_or_default(handle: &str) -> String {
    if handle.is_empty() {
        DEFAULT_HANDLE.to_string()
    } else {
        handle.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn node_id(raw: &str) -> NodeId {
        raw.parse().expect("node id")
    }

    fn node_row(workflow_id: WorkflowId, id: &str, node_type: NodeType, data: JsonValue) -> NodeRow {
        NodeRow {
            id: node_id(id),
            workflow_id,
            node_type,
            name: node_type.as_str().to_string(),
            position_x: 12.5,
            position_y: -4.0,
            data,
        }
    }

    fn connection_row(workflow_id: WorkflowId, id: &str, from: &str, to: &str) -> ConnectionRow {
        ConnectionRow {
            id: id.parse().expect("connection id"),
            workflow_id,
            from_node_id: node_id(from),
            to_node_id: node_id(to),
            from_output: "main".to_string(),
            to_input: "main".to_string(),
        }
    }

    fn sample_graph() -> WorkflowGraph {
        WorkflowGraph::new()
            .add_node(node_id("t"), NodeType::ManualTrigger, Position::new(0.0, 0.0))
            .insert_node(
                Node::new(node_id("h"), NodeType::HttpRequest, Position::new(300.0, 40.0))
                    .with_data(
                        NodeData::new()
                            .with_label("Fetch users")
                            .with("endpoint", json!("https://api.example.com/users"))
                            .with("method", json!("GET")),
                    ),
            )
            .add_connection(Connection::new(
                "c1".parse().expect("id"),
                node_id("t"),
                node_id("h"),
            ))
    }

    /// Adds the label the read path synthesizes for unlabeled nodes.
    fn with_synthesized_labels(graph: WorkflowGraph) -> WorkflowGraph {
        let (nodes, connections) = graph.into_parts();
        let nodes = nodes
            .into_iter()
            .map(|node| {
                if node.data.label().is_some() {
                    node
                } else {
                    let label = node.node_type.as_str();
                    let data = node.data.clone().with_label(label);
                    node.with_data(data)
                }
            })
            .collect();
        WorkflowGraph::from_parts(nodes, connections)
    }

    #[test]
    fn name_defaults_to_type_identifier() {
        let (nodes, _) = to_storage_rows(WorkflowId::new(), &sample_graph());
        let names: Vec<_> = nodes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["MANUAL_TRIGGER", "Fetch users"]);
    }

    #[test]
    fn rows_carry_workflow_and_positions() {
        let workflow_id = WorkflowId::new();
        let (nodes, connections) = to_storage_rows(workflow_id, &sample_graph());

        assert!(nodes.iter().all(|r| r.workflow_id == workflow_id));
        assert_eq!((nodes[1].position_x, nodes[1].position_y), (300.0, 40.0));
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].from_output, "main");
        assert_eq!(connections[0].to_input, "main");
    }

    #[test]
    fn roundtrip_is_lossless_up_to_label_synthesis() {
        let graph = sample_graph();
        let (nodes, connections) = to_storage_rows(WorkflowId::new(), &graph);
        let restored = from_storage_rows(nodes, connections);

        assert_eq!(restored, with_synthesized_labels(graph));
    }

    #[test]
    fn roundtrip_keeps_named_handles_and_parallel_connections() {
        let graph = sample_graph()
            .add_connection(Connection::between(
                "c2".parse().expect("id"),
                node_id("t"),
                "success",
                node_id("h"),
                "input",
            ))
            .add_connection(Connection::new(
                "c3".parse().expect("id"),
                node_id("t"),
                node_id("h"),
            ));
        let workflow_id = WorkflowId::new();
        let (nodes, connections) = to_storage_rows(workflow_id, &graph);

        assert_eq!(connections.len(), 3);
        let named = connections
            .iter()
            .find(|row| row.id.as_str() == "c2")
            .expect("named connection row");
        assert_eq!(named.from_output, "success");
        assert_eq!(named.to_input, "input");

        let restored = from_storage_rows(nodes, connections);
        assert_eq!(restored.connection_count(), 3);
        assert_eq!(restored, with_synthesized_labels(graph));
    }

    #[test]
    fn stored_label_is_preserved_verbatim() {
        let workflow_id = WorkflowId::new();
        let mut row = node_row(
            workflow_id,
            "h",
            NodeType::HttpRequest,
            json!({"label": "Custom"}),
        );
        row.name = "Something else".to_string();

        let graph = from_storage_rows(vec![row], Vec::new());
        assert_eq!(graph.nodes()[0].data.label(), Some("Custom"));
    }

    #[test]
    fn label_is_synthesized_from_name() {
        let workflow_id = WorkflowId::new();
        let mut row = node_row(workflow_id, "h", NodeType::HttpRequest, json!({"method": "GET"}));
        row.name = "Stored name".to_string();

        let graph = from_storage_rows(vec![row], Vec::new());
        let data = &graph.nodes()[0].data;
        assert_eq!(data.label(), Some("Stored name"));
        assert_eq!(data.get("method"), Some(&json!("GET")));
    }

    #[test]
    fn non_string_label_is_replaced() {
        let workflow_id = WorkflowId::new();
        let row = node_row(workflow_id, "h", NodeType::HttpRequest, json!({"label": 42}));
        let graph = from_storage_rows(vec![row], Vec::new());
        assert_eq!(graph.nodes()[0].data.label(), Some("HTTP_REQUEST"));
    }

    #[test]
    fn non_object_payload_reads_as_empty() {
        let workflow_id = WorkflowId::new();
        let rows = vec![
            node_row(workflow_id, "a", NodeType::HttpRequest, JsonValue::Null),
            node_row(workflow_id, "b", NodeType::HttpRequest, json!([1, 2, 3])),
        ];
        let graph = from_storage_rows(rows, Vec::new());
        for node in graph.nodes() {
            assert_eq!(node.data.len(), 1);
            assert_eq!(node.data.label(), Some("HTTP_REQUEST"));
        }
    }

    #[test]
    fn dangling_connection_rows_are_dropped() {
        let workflow_id = WorkflowId::new();
        let nodes = vec![
            node_row(workflow_id, "a", NodeType::ManualTrigger, json!({})),
            node_row(workflow_id, "b", NodeType::HttpRequest, json!({})),
        ];
        let connections = vec![
            connection_row(workflow_id, "c1", "a", "b"),
            connection_row(workflow_id, "c2", "b", "ghost"),
        ];

        let graph = from_storage_rows(nodes, connections);
        assert_eq!(graph.connection_count(), 1);
        assert_eq!(graph.connections()[0].id.as_str(), "c1");
    }

    #[test]
    fn empty_stored_handles_read_as_main() {
        let workflow_id = WorkflowId::new();
        let nodes = vec![
            node_row(workflow_id, "a", NodeType::ManualTrigger, json!({})),
            node_row(workflow_id, "b", NodeType::HttpRequest, json!({})),
        ];
        let mut connection = connection_row(workflow_id, "c1", "a", "b");
        connection.from_output.clear();

        let graph = from_storage_rows(nodes, vec![connection]);
        assert_eq!(graph.connections()[0].source_handle, "main");
    }

    #[test]
    fn read_path_is_idempotent() {
        let workflow_id = WorkflowId::new();
        let nodes = vec![
            node_row(workflow_id, "a", NodeType::ManualTrigger, JsonValue::Null),
            node_row(
                workflow_id,
                "b",
                NodeType::HttpRequest,
                json!({"label": "Kept", "endpoint": "https://x.example"}),
            ),
        ];
        let connections = vec![connection_row(workflow_id, "c1", "a", "b")];

        let once = from_storage_rows(nodes, connections);
        let (nodes, connections) = to_storage_rows(workflow_id, &once);
        let twice = from_storage_rows(nodes, connections);

        assert_eq!(once, twice);
    }
}
