//! The in-memory workflow graph.
//!
//! A graph is a set of nodes and a set of connections between their
//! handles. Mutating operations consume the graph and return the new value,
//! so an editing session never shares mutable state with anything else;
//! clone first to keep the previous version.
//!
//! Structural queries (entry nodes, successors, cycles) run on a petgraph
//! view built on demand.

use crate::connection::Connection;
use crate::node::{Node, NodeData, Position};
use crate::registry::NodeType;
use automa_core::{ConnectionId, NodeId};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

/// A workflow's nodes and connections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowGraph {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    connections: Vec<Connection>,
}

impl WorkflowGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The graph every new workflow starts with: a lone placeholder at the origin.
    #[must_use]
    pub fn seeded() -> Self {
        Self::new().add_node(NodeId::new(), NodeType::Initial, Position::ORIGIN)
    }

    /// Builds a graph from existing parts without checking them.
    #[must_use]
    pub fn from_parts(nodes: Vec<Node>, connections: Vec<Connection>) -> Self {
        Self { nodes, connections }
    }

    /// Splits the graph into its parts.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Node>, Vec<Connection>) {
        (self.nodes, self.connections)
    }

    /// Appends a node with an empty configuration payload.
    #[must_use]
    pub fn add_node(self, id: NodeId, node_type: NodeType, position: Position) -> Self {
        self.insert_node(Node::new(id, node_type, position))
    }

    /// Appends a fully built node.
    #[must_use]
    pub fn insert_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    /// Removes a node and every connection that starts or ends at it.
    #[must_use]
    pub fn remove_node(mut self, node_id: &NodeId) -> Self {
        self.nodes.retain(|n| &n.id != node_id);
        self.connections.retain(|c| !c.touches(node_id));
        self
    }

    /// Appends a connection.
    ///
    /// Parallel connections between the same handles are kept as distinct
    /// entries.
    #[must_use]
    pub fn add_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    /// Removes a connection. Unknown IDs leave the graph unchanged.
    #[must_use]
    pub fn remove_connection(mut self, connection_id: &ConnectionId) -> Self {
        self.connections.retain(|c| &c.id != connection_id);
        self
    }

    /// Shallow-merges `patch` into a node's data.
    ///
    /// Unknown IDs leave the graph unchanged, which tolerates edits made
    /// against a stale copy of the graph.
    #[must_use]
    pub fn update_node_data(mut self, node_id: &NodeId, patch: Map<String, JsonValue>) -> Self {
        if let Some(node) = self.nodes.iter_mut().find(|n| &n.id == node_id) {
            node.data.merge(patch);
        }
        self
    }

    /// Replaces the graph's content with `node` if the only node is the
    /// placeholder; appends `node` otherwise.
    #[must_use]
    pub fn replace_if_placeholder(self, node: Node) -> Self {
        if self.is_placeholder_only() {
            Self::new().insert_node(node)
        } else {
            self.insert_node(node)
        }
    }

    /// Returns whether the graph consists of exactly the placeholder node.
    #[must_use]
    pub fn is_placeholder_only(&self) -> bool {
        matches!(self.nodes.as_slice(), [only] if only.is_placeholder())
    }

    /// Returns a node by its ID.
    #[must_use]
    pub fn node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == node_id)
    }

    /// Returns a connection by its ID.
    #[must_use]
    pub fn connection(&self, connection_id: &ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| &c.id == connection_id)
    }

    /// Returns the node's data, if the node exists.
    #[must_use]
    pub fn node_data(&self, node_id: &NodeId) -> Option<&NodeData> {
        self.node(node_id).map(|n| &n.data)
    }

    /// Returns all nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Returns all connections in insertion order.
    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of connections in the graph.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Returns how many nodes have the given type.
    #[must_use]
    pub fn count_of_type(&self, node_type: NodeType) -> usize {
        self.nodes.iter().filter(|n| n.node_type == node_type).count()
    }

    /// Returns whether any node has the given type.
    #[must_use]
    pub fn contains_type(&self, node_type: NodeType) -> bool {
        self.nodes.iter().any(|n| n.node_type == node_type)
    }

    /// Returns nodes that have no incoming connections (entry points).
    #[must_use]
    pub fn entry_nodes(&self) -> Vec<&Node> {
        let topology = Topology::of(self);
        topology
            .graph
            .node_indices()
            .filter(|&idx| {
                topology
                    .graph
                    .edges_directed(idx, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .map(|idx| &self.nodes[topology.graph[idx]])
            .collect()
    }

    /// Returns the downstream nodes of a node, with the connection leading to each.
    #[must_use]
    pub fn successors(&self, node_id: &NodeId) -> Vec<(&Node, &Connection)> {
        let topology = Topology::of(self);
        let Some(&index) = topology.index_of.get(node_id) else {
            return Vec::new();
        };

        topology
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| {
                (
                    &self.nodes[topology.graph[edge.target()]],
                    &self.connections[*edge.weight()],
                )
            })
            .collect()
    }

    /// Returns whether the connections form no cycle.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        !petgraph::algo::is_cyclic_directed(&Topology::of(self).graph)
    }
}

/// Set equality: order of nodes and connections does not matter.
impl PartialEq for WorkflowGraph {
    fn eq(&self, other: &Self) -> bool {
        if self.nodes.len() != other.nodes.len()
            || self.connections.len() != other.connections.len()
        {
            return false;
        }

        let mut left_nodes: Vec<_> = self.nodes.iter().collect();
        let mut right_nodes: Vec<_> = other.nodes.iter().collect();
        left_nodes.sort_by(|a, b| a.id.cmp(&b.id));
        right_nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut left_connections: Vec<_> = self.connections.iter().collect();
        let mut right_connections: Vec<_> = other.connections.iter().collect();
        left_connections.sort_by(|a, b| a.id.cmp(&b.id));
        right_connections.sort_by(|a, b| a.id.cmp(&b.id));

        left_nodes == right_nodes && left_connections == right_connections
    }
}

/// petgraph view of a workflow graph.
///
/// Node weights index into `WorkflowGraph::nodes`, edge weights into
/// `WorkflowGraph::connections`. Connections with a missing endpoint are
/// left out.
struct Topology<'a> {
    graph: DiGraph<usize, usize>,
    index_of: HashMap<&'a NodeId, NodeIndex>,
}

impl<'a> Topology<'a> {
    fn of(workflow: &'a WorkflowGraph) -> Self {
        let mut graph = DiGraph::with_capacity(workflow.nodes.len(), workflow.connections.len());
        let mut index_of = HashMap::with_capacity(workflow.nodes.len());

        for (position, node) in workflow.nodes.iter().enumerate() {
            index_of.insert(&node.id, graph.add_node(position));
        }

        for (position, connection) in workflow.connections.iter().enumerate() {
            let (Some(&source), Some(&target)) = (
                index_of.get(&connection.source),
                index_of.get(&connection.target),
            ) else {
                continue;
            };
            graph.add_edge(source, target, position);
        }

        Self { graph, index_of }
    }
}
