//! Error types for the workflow crate.
//!
//! - `ConfigError`: a node's configuration payload does not fit its type
//! - `PlacementError`: an editor insertion request was refused
//! - `ValidationError`: a graph submitted for saving is malformed
//!
//! None of these carry workflow-level context; callers add that when they
//! report the error.

use crate::registry::NodeType;
use automa_core::{ConnectionId, NodeId};
use std::fmt;

/// Errors decoding a node's configuration payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The payload does not match the type's schema.
    Malformed { node_type: NodeType, reason: String },
    /// The endpoint is not a URL, even with template placeholders filled in.
    InvalidEndpoint { endpoint: String, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { node_type, reason } => {
                write!(f, "malformed {node_type} configuration: {reason}")
            }
            Self::InvalidEndpoint { endpoint, reason } => {
                write!(f, "invalid endpoint '{endpoint}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Reasons an insertion request is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// The type allows a single instance and the graph already has one.
    DuplicateSingletonNode { node_type: NodeType },
    /// The registry in use has no entry for the type.
    ///
    /// Types only originate from the registry itself, so this indicates a
    /// misconfigured catalogue rather than a user mistake.
    UnknownNodeType { node_type: NodeType },
    /// The type is not offered for insertion, such as the placeholder.
    NotInsertable { node_type: NodeType },
    /// The viewport cannot map screen space to graph space.
    InvalidViewport { reason: String },
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSingletonNode { node_type } => {
                write!(f, "only one {node_type} node is allowed per workflow")
            }
            Self::UnknownNodeType { node_type } => {
                write!(f, "node type {node_type} is not registered")
            }
            Self::NotInsertable { node_type } => {
                write!(f, "{node_type} nodes cannot be inserted")
            }
            Self::InvalidViewport { reason } => write!(f, "invalid viewport: {reason}"),
        }
    }
}

impl std::error::Error for PlacementError {}

/// Reasons a graph is rejected before it is saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A node position is NaN or infinite.
    NonFiniteCoordinates { node_id: NodeId },
    /// Two nodes share an ID.
    DuplicateNodeId { node_id: NodeId },
    /// Two connections share an ID.
    DuplicateConnectionId { connection_id: ConnectionId },
    /// A connection endpoint references a node that is not in the graph.
    DanglingConnection {
        connection_id: ConnectionId,
        node_id: NodeId,
    },
    /// The source handle is not an output of the source node's type.
    UnknownSourceHandle {
        connection_id: ConnectionId,
        node_id: NodeId,
        handle: String,
    },
    /// The target handle is not an input of the target node's type.
    UnknownTargetHandle {
        connection_id: ConnectionId,
        node_id: NodeId,
        handle: String,
    },
    /// More than one node of a single-instance type.
    SingletonViolation { node_type: NodeType, count: usize },
    /// The placeholder shares the graph with other nodes.
    PlaceholderNotAlone,
    /// The registry has no entry for a node's type.
    UnregisteredNodeType { node_id: NodeId, node_type: NodeType },
    /// A node's configuration does not decode for its type.
    InvalidNodeConfig { node_id: NodeId, source: ConfigError },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteCoordinates { node_id } => {
                write!(f, "node {node_id} has non-finite coordinates")
            }
            Self::DuplicateNodeId { node_id } => write!(f, "duplicate node id: {node_id}"),
            Self::DuplicateConnectionId { connection_id } => {
                write!(f, "duplicate connection id: {connection_id}")
            }
            Self::DanglingConnection {
                connection_id,
                node_id,
            } => {
                write!(
                    f,
                    "connection {connection_id} references missing node {node_id}"
                )
            }
            Self::UnknownSourceHandle {
                connection_id,
                node_id,
                handle,
            } => {
                write!(
                    f,
                    "connection {connection_id}: node {node_id} has no output handle '{handle}'"
                )
            }
            Self::UnknownTargetHandle {
                connection_id,
                node_id,
                handle,
            } => {
                write!(
                    f,
                    "connection {connection_id}: node {node_id} has no input handle '{handle}'"
                )
            }
            Self::SingletonViolation { node_type, count } => {
                write!(f, "{count} {node_type} nodes found, at most one is allowed")
            }
            Self::PlaceholderNotAlone => {
                write!(f, "the placeholder node cannot coexist with other nodes")
            }
            Self::UnregisteredNodeType { node_id, node_type } => {
                write!(f, "node {node_id} has unregistered type {node_type}")
            }
            Self::InvalidNodeConfig { node_id, source } => {
                write!(f, "node {node_id}: {source}")
            }
        }
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidNodeConfig { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Error returned when a workflow name is outside the accepted length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidWorkflowName {
    /// Length of the rejected name, in characters.
    pub len: usize,
}

impl fmt::Display for InvalidWorkflowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "workflow name must be between {} and {} characters, got {}",
            crate::definition::WorkflowName::MIN_LEN,
            crate::definition::WorkflowName::MAX_LEN,
            self.len
        )
    }
}

impl std::error::Error for InvalidWorkflowName {}
