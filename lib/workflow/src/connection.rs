//! Connections between workflow nodes.
//!
//! A connection links a named output handle on a source node to a named
//! input handle on a target node. Handles default to `"main"`.

use crate::registry::DEFAULT_HANDLE;
use automa_core::{ConnectionId, NodeId};
use serde::{Deserialize, Deserializer, Serialize};

/// A directed connection between two node handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Unique identifier for this connection within the workflow.
    pub id: ConnectionId,
    /// The node the connection leaves from.
    pub source: NodeId,
    /// Output handle on the source node.
    #[serde(default = "default_handle", deserialize_with = "handle_or_default")]
    pub source_handle: String,
    /// The node the connection arrives at.
    pub target: NodeId,
    /// Input handle on the target node.
    #[serde(default = "default_handle", deserialize_with = "handle_or_default")]
    pub target_handle: String,
}

impl Connection {
    /// Creates a connection between the default handles of two nodes.
    #[must_use]
    pub fn new(id: ConnectionId, source: NodeId, target: NodeId) -> Self {
        Self::between(id, source, DEFAULT_HANDLE, target, DEFAULT_HANDLE)
    }

    /// Creates a connection between named handles.
    #[must_use]
    pub fn between(
        id: ConnectionId,
        source: NodeId,
        source_handle: impl Into<String>,
        target: NodeId,
        target_handle: impl Into<String>,
    ) -> Self {
        Self {
            id,
            source,
            source_handle: source_handle.into(),
            target,
            target_handle: target_handle.into(),
        }
    }

    /// Returns whether either endpoint is `node_id`.
    #[must_use]
    pub fn touches(&self, node_id: &NodeId) -> bool {
        &self.source == node_id || &self.target == node_id
    }
}

fn default_handle() -> String {
    DEFAULT_HANDLE.to_string()
}

/// Null, missing and empty handle names all mean the default handle.
fn handle_or_default<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let handle = Option::<String>::deserialize(deserializer)?;
    Ok(handle
        .filter(|h| !h.is_empty())
        .unwrap_or_else(default_handle))
}
