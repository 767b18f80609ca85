//! Workflow nodes and their configuration payloads.
//!
//! A node has:
//! - An ID generated by the editor, stable across edits
//! - A type from the node-type registry
//! - A position in graph coordinate space
//! - A data mapping holding the type's configuration (and the display label)
//!
//! The data mapping stays an open JSON object so unknown keys survive a
//! round trip, but it is schema-checked per node type through
//! [`NodeConfig::decode`].

use crate::error::ConfigError;
use crate::registry::NodeType;
use automa_core::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Key under which a node's display label is kept in its data mapping.
pub const LABEL_KEY: &str = "label";

/// A point in graph coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// The origin.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    /// Creates a position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns whether both coordinates are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A node's configuration payload: an open key to value mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeData(Map<String, JsonValue>);

impl NodeData {
    /// Creates an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Reads a stored payload, treating anything but a JSON object as empty.
    #[must_use]
    pub fn from_value_lenient(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(map) => Self(map),
            _ => Self::new(),
        }
    }

    /// Returns the display label if one is set as a string.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.0.get(LABEL_KEY).and_then(JsonValue::as_str)
    }

    /// Sets the display label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.0
            .insert(LABEL_KEY.to_string(), JsonValue::String(label.into()));
        self
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// Sets a single key.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Shallow-merges `patch` into this payload; patch keys win.
    pub fn merge(&mut self, patch: Map<String, JsonValue>) {
        self.0.extend(patch);
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the payload has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.0
    }

    /// Converts the payload into a JSON object value.
    #[must_use]
    pub fn into_value(self) -> JsonValue {
        JsonValue::Object(self.0)
    }
}

impl From<Map<String, JsonValue>> for NodeData {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map)
    }
}

/// A workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier for this node within the workflow.
    pub id: NodeId,
    /// The node's type.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Position in graph coordinate space.
    pub position: Position,
    /// Type-specific configuration.
    #[serde(default)]
    pub data: NodeData,
}

impl Node {
    /// Creates a node with an empty configuration payload.
    #[must_use]
    pub fn new(id: NodeId, node_type: NodeType, position: Position) -> Self {
        Self {
            id,
            node_type,
            position,
            data: NodeData::new(),
        }
    }

    /// Replaces the configuration payload.
    #[must_use]
    pub fn with_data(mut self, data: NodeData) -> Self {
        self.data = data;
        self
    }

    /// Returns whether this is the placeholder node.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.node_type == NodeType::Initial
    }

    /// Decodes the payload against the node's type.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload does not fit the type's schema.
    pub fn config(&self) -> Result<NodeConfig, ConfigError> {
        NodeConfig::decode(self.node_type, &self.data)
    }
}

/// HTTP methods an HTTP request node may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Returns whether requests with this method carry a body.
    #[must_use]
    pub fn has_body(self) -> bool {
        !matches!(self, Self::Get)
    }
}

/// Configuration of an `HTTP_REQUEST` node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HttpRequestConfig {
    /// Target URL; may contain `{{variable}}` placeholders. Unset until configured.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Request method.
    #[serde(default)]
    pub method: HttpMethod,
    /// Request body template.
    #[serde(default)]
    pub body: Option<String>,
}

impl HttpRequestConfig {
    /// Short summary shown on the node, e.g. `POST: https://api.example.com`.
    #[must_use]
    pub fn summary(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}: {endpoint}", method_name(self.method)),
            None => "Not Configured".to_string(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };
        if endpoint.is_empty() {
            return Err(ConfigError::InvalidEndpoint {
                endpoint: endpoint.clone(),
                reason: "endpoint is empty".to_string(),
            });
        }
        let sanitized = fill_placeholders(endpoint, "placeholder");
        url::Url::parse(&sanitized).map_err(|e| ConfigError::InvalidEndpoint {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

fn method_name(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Get => "GET",
        HttpMethod::Post => "POST",
        HttpMethod::Put => "PUT",
        HttpMethod::Patch => "PATCH",
        HttpMethod::Delete => "DELETE",
    }
}

/// Replaces every `{{...}}` template placeholder with `fill`.
fn fill_placeholders(template: &str, fill: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(fill);
        rest = &rest[start + 2 + len + 2..];
    }
    out.push_str(rest);
    out
}

/// Typed view of a node's configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeConfig {
    /// The placeholder has no configuration.
    Initial,
    /// Manual triggers have no configuration.
    ManualTrigger,
    /// HTTP request settings.
    HttpRequest(HttpRequestConfig),
}

impl NodeConfig {
    /// Decodes and validates `data` for `node_type`.
    ///
    /// Keys the type does not know about (such as the label) are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a known key has the wrong shape or the HTTP
    /// endpoint is not a URL.
    pub fn decode(node_type: NodeType, data: &NodeData) -> Result<Self, ConfigError> {
        match node_type {
            NodeType::Initial => Ok(Self::Initial),
            NodeType::ManualTrigger => Ok(Self::ManualTrigger),
            NodeType::HttpRequest => {
                let config: HttpRequestConfig =
                    serde_json::from_value(JsonValue::Object(data.as_map().clone())).map_err(
                        |e| ConfigError::Malformed {
                            node_type,
                            reason: e.to_string(),
                        },
                    )?;
                config.validate()?;
                Ok(Self::HttpRequest(config))
            }
        }
    }
}
