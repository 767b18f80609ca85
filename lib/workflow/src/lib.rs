//! Workflow graph model for automa.
//!
//! This crate provides everything the editor and the server share about a
//! workflow's structure:
//!
//! - **Registry**: the catalogue of node types and their handles
//! - **Graph Model**: nodes and connections with pure, value-returning edits
//! - **Placement**: singleton-aware node insertion from screen coordinates
//! - **Validation**: whole-graph checks run before a save
//! - **Mapper**: conversion to and from relational storage rows
//! - **Editor**: an editing session that produces save requests

pub mod connection;
pub mod definition;
pub mod editor;
pub mod error;
pub mod graph;
pub mod mapper;
pub mod node;
pub mod placement;
pub mod registry;
pub mod validation;

pub use connection::Connection;
pub use definition::{Workflow, WorkflowName, WorkflowWithGraph};
pub use editor::{EditorSession, Notice, SaveRequest};
pub use error::{ConfigError, InvalidWorkflowName, PlacementError, ValidationError};
pub use graph::WorkflowGraph;
pub use mapper::{ConnectionRow, NodeRow, from_storage_rows, to_storage_rows};
pub use node::{HttpMethod, HttpRequestConfig, Node, NodeConfig, NodeData, Position};
pub use placement::{Insertion, ScreenPoint, Viewport, request_insertion};
pub use registry::{HandleLayout, NodeRole, NodeType, NodeTypeDescriptor, NodeTypeRegistry};
pub use validation::validate_for_save;
