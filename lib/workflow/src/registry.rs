//! Node-type registry.
//!
//! The registry is an immutable catalogue describing every node type the
//! editor can place: display metadata, the role it plays in a workflow,
//! whether it may appear more than once, its configurable fields and the
//! named handles connections may bind to.
//!
//! It is constructed explicitly and handed to the components that need it,
//! so tests can substitute a fixture catalogue.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Handle name used when a connection endpoint does not name one.
pub const DEFAULT_HANDLE: &str = "main";

/// Identifier of a node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    /// Placeholder seeded into every new workflow.
    Initial,
    /// Starts a workflow when the user asks for it.
    ManualTrigger,
    /// Performs an outbound HTTP request.
    HttpRequest,
}

impl NodeType {
    /// Every node type, in declaration order.
    pub const ALL: [NodeType; 3] = [Self::Initial, Self::ManualTrigger, Self::HttpRequest];

    /// Returns the stable identifier used in storage and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "INITIAL",
            Self::ManualTrigger => "MANUAL_TRIGGER",
            Self::HttpRequest => "HTTP_REQUEST",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a known node type identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNodeType(pub String);

impl fmt::Display for UnknownNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown node type: {}", self.0)
    }
}

impl std::error::Error for UnknownNodeType {}

impl FromStr for NodeType {
    type Err = UnknownNodeType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownNodeType(s.to_string()))
    }
}

/// The role a node type plays in a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// Entry point that starts a workflow.
    Trigger,
    /// A step performed once the workflow is running.
    Action,
    /// Stand-in shown in an otherwise empty workflow; never offered for insertion.
    Placeholder,
}

/// Named handles a node exposes for connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleLayout {
    /// Handles that may be the target of a connection.
    pub inputs: &'static [&'static str],
    /// Handles that may be the source of a connection.
    pub outputs: &'static [&'static str],
}

impl HandleLayout {
    /// A node with no handles.
    pub const NONE: Self = Self {
        inputs: &[],
        outputs: &[],
    };

    /// Returns whether `name` is an input handle.
    #[must_use]
    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.contains(&name)
    }

    /// Returns whether `name` is an output handle.
    #[must_use]
    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.contains(&name)
    }
}

impl Default for HandleLayout {
    fn default() -> Self {
        Self::NONE
    }
}

/// Immutable description of one node type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTypeDescriptor {
    /// The type this entry describes.
    pub node_type: NodeType,
    /// Human-readable name.
    pub label: &'static str,
    /// One-line description shown in the node selector.
    pub description: &'static str,
    /// Icon reference resolved by the presentation layer.
    pub icon: &'static str,
    /// Trigger, action or placeholder.
    pub role: NodeRole,
    /// At most one node of this type may exist per workflow.
    pub single_instance: bool,
    /// Keys of the type's configuration payload.
    pub config_fields: &'static [&'static str],
    /// Connection handles.
    pub handles: HandleLayout,
}

/// Catalogue of node types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTypeRegistry {
    descriptors: Vec<NodeTypeDescriptor>,
}

impl NodeTypeRegistry {
    /// Creates a registry from descriptors in declaration order.
    #[must_use]
    pub fn new(descriptors: Vec<NodeTypeDescriptor>) -> Self {
        Self { descriptors }
    }

    /// The catalogue shipped with the application.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(vec![
            NodeTypeDescriptor {
                node_type: NodeType::Initial,
                label: "Initial",
                description: "Add a first node to get started",
                icon: "plus",
                role: NodeRole::Placeholder,
                single_instance: true,
                config_fields: &[],
                handles: HandleLayout::NONE,
            },
            NodeTypeDescriptor {
                node_type: NodeType::ManualTrigger,
                label: "Manual Trigger",
                description: "Start workflow manually",
                icon: "mouse-pointer",
                role: NodeRole::Trigger,
                single_instance: true,
                config_fields: &[],
                handles: HandleLayout {
                    inputs: &[],
                    outputs: &[DEFAULT_HANDLE],
                },
            },
            NodeTypeDescriptor {
                node_type: NodeType::HttpRequest,
                label: "HTTP Request",
                description: "Make an HTTP request",
                icon: "globe",
                role: NodeRole::Action,
                single_instance: false,
                config_fields: &["endpoint", "method", "body"],
                handles: HandleLayout {
                    inputs: &[DEFAULT_HANDLE],
                    outputs: &[DEFAULT_HANDLE],
                },
            },
        ])
    }

    /// Looks up the descriptor for a node type.
    #[must_use]
    pub fn describe(&self, node_type: NodeType) -> Option<&NodeTypeDescriptor> {
        self.descriptors.iter().find(|d| d.node_type == node_type)
    }

    /// Returns descriptors with the given role, in declaration order.
    pub fn list_by_role(&self, role: NodeRole) -> impl Iterator<Item = &NodeTypeDescriptor> {
        self.descriptors.iter().filter(move |d| d.role == role)
    }

    /// Returns every descriptor, in declaration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &NodeTypeDescriptor> {
        self.descriptors.iter()
    }

    /// Returns whether the type is registered as single-instance.
    #[must_use]
    pub fn is_single_instance(&self, node_type: NodeType) -> bool {
        self.describe(node_type).is_some_and(|d| d.single_instance)
    }
}

impl Default for NodeTypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_identifiers_roundtrip() {
        for node_type in NodeType::ALL {
            let parsed: NodeType = node_type.as_str().parse().expect("known type");
            assert_eq!(parsed, node_type);
        }
        assert!("WEBHOOK".parse::<NodeType>().is_err());
    }

    #[test]
    fn node_type_serializes_as_identifier() {
        let json = serde_json::to_string(&NodeType::ManualTrigger).expect("serialize");
        assert_eq!(json, "\"MANUAL_TRIGGER\"");
    }

    #[test]
    fn builtin_describes_every_type() {
        let registry = NodeTypeRegistry::builtin();
        for node_type in NodeType::ALL {
            assert!(registry.describe(node_type).is_some(), "{node_type} missing");
        }
    }

    #[test]
    fn list_by_role_keeps_declaration_order() {
        let registry = NodeTypeRegistry::builtin();
        let triggers: Vec<_> = registry
            .list_by_role(NodeRole::Trigger)
            .map(|d| d.node_type)
            .collect();
        let actions: Vec<_> = registry
            .list_by_role(NodeRole::Action)
            .map(|d| d.node_type)
            .collect();

        assert_eq!(triggers, vec![NodeType::ManualTrigger]);
        assert_eq!(actions, vec![NodeType::HttpRequest]);
    }

    #[test]
    fn placeholder_is_not_offered_as_trigger_or_action() {
        let registry = NodeTypeRegistry::builtin();
        let offered = registry
            .list_by_role(NodeRole::Trigger)
            .chain(registry.list_by_role(NodeRole::Action))
            .any(|d| d.node_type == NodeType::Initial);
        assert!(!offered);
    }

    #[test]
    fn single_instance_flags() {
        let registry = NodeTypeRegistry::builtin();
        assert!(registry.is_single_instance(NodeType::ManualTrigger));
        assert!(registry.is_single_instance(NodeType::Initial));
        assert!(!registry.is_single_instance(NodeType::HttpRequest));
    }

    #[test]
    fn fixture_registry_can_omit_types() {
        let builtin = NodeTypeRegistry::builtin();
        let http = builtin
            .describe(NodeType::HttpRequest)
            .cloned()
            .expect("builtin http");
        let registry = NodeTypeRegistry::new(vec![http]);

        assert!(registry.describe(NodeType::ManualTrigger).is_none());
        assert!(!registry.is_single_instance(NodeType::ManualTrigger));
    }

    #[test]
    fn handle_layout_lookup() {
        let registry = NodeTypeRegistry::builtin();
        let trigger = registry.describe(NodeType::ManualTrigger).expect("trigger");
        assert!(trigger.handles.has_output("main"));
        assert!(!trigger.handles.has_input("main"));
    }
}
