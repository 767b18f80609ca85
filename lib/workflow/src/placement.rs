//! Node placement for editor insertions.
//!
//! An insertion request names a node type and a point on screen. The engine
//! checks the type's single-instance rule, maps the point into graph space
//! through the current viewport, scatters it by a bounded random jitter so
//! repeated insertions from a fixed anchor do not stack, and then either
//! replaces the placeholder or appends the new node.

use crate::error::PlacementError;
use crate::graph::WorkflowGraph;
use crate::node::{Node, Position};
use crate::registry::{NodeRole, NodeType, NodeTypeRegistry};
use automa_core::NodeId;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Maximum jitter applied on each axis, in graph units.
pub const JITTER_RADIUS: f64 = 150.0;

/// A point in screen space (pixels relative to the editor pane).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    /// Creates a screen point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The editor's pan/zoom transform.
///
/// A graph point `g` is drawn at screen point `g * zoom + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Viewport {
    /// Creates a viewport.
    #[must_use]
    pub const fn new(x: f64, y: f64, zoom: f64) -> Self {
        Self { x, y, zoom }
    }

    /// Maps a screen point into graph space.
    ///
    /// # Errors
    ///
    /// Returns an error if the transform is not invertible.
    pub fn screen_to_graph(&self, point: ScreenPoint) -> Result<Position, PlacementError> {
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return Err(PlacementError::InvalidViewport {
                reason: format!("zoom must be finite and positive, got {}", self.zoom),
            });
        }
        if !(self.x.is_finite() && self.y.is_finite()) {
            return Err(PlacementError::InvalidViewport {
                reason: "pan offset must be finite".to_string(),
            });
        }
        Ok(Position::new(
            (point.x - self.x) / self.zoom,
            (point.y - self.y) / self.zoom,
        ))
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

/// A successful insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct Insertion {
    /// The graph after the insertion.
    pub graph: WorkflowGraph,
    /// ID of the inserted node.
    pub node_id: NodeId,
    /// Whether the insertion replaced the placeholder.
    pub replaced_placeholder: bool,
}

/// Places a new node of `node_type` near `screen_point`.
///
/// The input graph is never modified; on error the caller keeps using it
/// as-is. Closing the insertion surface on success is the caller's job.
///
/// # Errors
///
/// - [`PlacementError::DuplicateSingletonNode`] if the type is single-instance
///   and already present
/// - [`PlacementError::UnknownNodeType`] if the registry does not know the type
/// - [`PlacementError::NotInsertable`] if the type is the placeholder
/// - [`PlacementError::InvalidViewport`] if the viewport cannot be inverted
pub fn request_insertion<R: Rng + ?Sized>(
    registry: &NodeTypeRegistry,
    graph: &WorkflowGraph,
    node_type: NodeType,
    screen_point: ScreenPoint,
    viewport: Viewport,
    rng: &mut R,
) -> Result<Insertion, PlacementError> {
    let descriptor = registry
        .describe(node_type)
        .ok_or(PlacementError::UnknownNodeType { node_type })?;

    if descriptor.role == NodeRole::Placeholder {
        return Err(PlacementError::NotInsertable { node_type });
    }

    if descriptor.single_instance && graph.contains_type(node_type) {
        return Err(PlacementError::DuplicateSingletonNode { node_type });
    }

    let anchor = viewport.screen_to_graph(screen_point)?;
    let position = jitter(anchor, rng);

    let node_id = NodeId::new();
    let replaced_placeholder = graph.is_placeholder_only();
    let graph = graph
        .clone()
        .replace_if_placeholder(Node::new(node_id.clone(), node_type, position));

    tracing::debug!(
        node_type = %node_type,
        node_id = %node_id,
        replaced_placeholder,
        "node inserted"
    );

    Ok(Insertion {
        graph,
        node_id,
        replaced_placeholder,
    })
}

/// Offsets `anchor` by a uniform amount in `[-JITTER_RADIUS, JITTER_RADIUS]` per axis.
pub fn jitter<R: Rng + ?Sized>(anchor: Position, rng: &mut R) -> Position {
    Position::new(
        anchor.x + rng.random_range(-JITTER_RADIUS..=JITTER_RADIUS),
        anchor.y + rng.random_range(-JITTER_RADIUS..=JITTER_RADIUS),
    )
}
