//! Core domain types and utilities for automa.
//!
//! This crate provides the identifier types and the error handling
//! foundation shared by the workflow library and the server.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ConnectionId, NodeId, ParseIdError, UserId, WorkflowId};
