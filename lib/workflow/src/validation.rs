//! Whole-graph validation for saves.
//!
//! The editor keeps its graph valid while the user works, but the save
//! payload comes from outside the server and is checked again before any
//! storage transaction opens.

use crate::error::ValidationError;
use crate::graph::WorkflowGraph;
use crate::registry::{NodeType, NodeTypeRegistry};
use std::collections::{HashMap, HashSet};

/// Checks that `graph` can be persisted as a workflow's node/edge set.
///
/// # Errors
///
/// Returns the first problem found, checking nodes before connections and
/// graph-wide rules last.
pub fn validate_for_save(
    registry: &NodeTypeRegistry,
    graph: &WorkflowGraph,
) -> Result<(), ValidationError> {
    let mut nodes_by_id = HashMap::with_capacity(graph.node_count());
    for node in graph.nodes() {
        if nodes_by_id.insert(&node.id, node).is_some() {
            return Err(ValidationError::DuplicateNodeId {
                node_id: node.id.clone(),
            });
        }
        if !node.position.is_finite() {
            return Err(ValidationError::NonFiniteCoordinates {
                node_id: node.id.clone(),
            });
        }
        if registry.describe(node.node_type).is_none() {
            return Err(ValidationError::UnregisteredNodeType {
                node_id: node.id.clone(),
                node_type: node.node_type,
            });
        }
        node.config()
            .map_err(|source| ValidationError::InvalidNodeConfig {
                node_id: node.id.clone(),
                source,
            })?;
    }

    let mut connection_ids = HashSet::with_capacity(graph.connection_count());
    for connection in graph.connections() {
        if !connection_ids.insert(&connection.id) {
            return Err(ValidationError::DuplicateConnectionId {
                connection_id: connection.id.clone(),
            });
        }

        let source = nodes_by_id.get(&connection.source).ok_or_else(|| {
            ValidationError::DanglingConnection {
                connection_id: connection.id.clone(),
                node_id: connection.source.clone(),
            }
        })?;
        let target = nodes_by_id.get(&connection.target).ok_or_else(|| {
            ValidationError::DanglingConnection {
                connection_id: connection.id.clone(),
                node_id: connection.target.clone(),
            }
        })?;

        let source_handles = registry
            .describe(source.node_type)
            .map(|d| d.handles)
            .unwrap_or_default();
        if !source_handles.has_output(&connection.source_handle) {
            return Err(ValidationError::UnknownSourceHandle {
                connection_id: connection.id.clone(),
                node_id: source.id.clone(),
                handle: connection.source_handle.clone(),
            });
        }

        let target_handles = registry
            .describe(target.node_type)
            .map(|d| d.handles)
            .unwrap_or_default();
        if !target_handles.has_input(&connection.target_handle) {
            return Err(ValidationError::UnknownTargetHandle {
                connection_id: connection.id.clone(),
                node_id: target.id.clone(),
                handle: connection.target_handle.clone(),
            });
        }
    }

    for descriptor in registry.descriptors().filter(|d| d.single_instance) {
        let count = graph.count_of_type(descriptor.node_type);
        if count > 1 {
            return Err(ValidationError::SingletonViolation {
                node_type: descriptor.node_type,
                count,
            });
        }
    }

    if graph.contains_type(NodeType::Initial) && graph.node_count() > 1 {
        return Err(ValidationError::PlaceholderNotAlone);
    }

    Ok(())
}
