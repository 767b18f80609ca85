//! Workflow storage.
//!
//! This module provides:
//! - The [`WorkflowStore`] trait the service layer is written against
//! - A PostgreSQL implementation
//! - An in-memory implementation with the same transactional behavior

pub mod memory;
pub mod workflow;

pub use memory::MemoryWorkflowStore;
pub use workflow::PgWorkflowStore;

use async_trait::async_trait;
use automa_core::{Result, UserId, WorkflowId};
use automa_workflow::{ConnectionRow, NodeRow, Workflow, WorkflowName};
use std::fmt;

/// Storage failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No workflow matched the ID (and owner, where one was given).
    NotFound { id: WorkflowId },
    /// The database could not be reached or asked for the transaction to be
    /// retried. Safe to retry.
    Unavailable { details: String },
    /// Any other database failure.
    Database { details: String },
    /// A stored row could not be decoded.
    Corrupt { details: String },
}

impl StoreError {
    /// Classifies a sqlx error.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        let details = err.to_string();
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Unavailable { details }
            }
            // serialization_failure, deadlock_detected
            sqlx::Error::Database(db) if matches!(db.code().as_deref(), Some("40001" | "40P01")) => {
                Self::Unavailable { details }
            }
            _ => Self::Database { details },
        }
    }

    /// Returns whether the failed operation may succeed if retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "workflow '{id}' not found"),
            Self::Unavailable { details } => write!(f, "storage unavailable: {details}"),
            Self::Database { details } => write!(f, "workflow database error: {details}"),
            Self::Corrupt { details } => write!(f, "corrupt workflow row: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Filter and window for workflow listings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListFilter {
    /// Case-insensitive substring the name must contain.
    pub search: Option<String>,
    pub limit: u32,
    pub offset: u64,
}

/// One page of a listing plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowPage {
    pub items: Vec<Workflow>,
    pub total_count: u64,
}

/// Persistence for workflows and their graphs.
///
/// Graph writes are all-or-nothing: readers observe either the complete
/// previous node/connection set or the complete new one.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Stores a new workflow with its initial graph.
    async fn insert(
        &self,
        workflow: &Workflow,
        nodes: &[NodeRow],
        connections: &[ConnectionRow],
    ) -> Result<(), StoreError>;

    /// Loads a workflow's metadata.
    async fn find(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError>;

    /// Loads a workflow's node and connection rows.
    async fn load_graph(
        &self,
        id: WorkflowId,
    ) -> Result<(Vec<NodeRow>, Vec<ConnectionRow>), StoreError>;

    /// Replaces a workflow's whole graph in one transaction and stamps
    /// `updated_at` as its last write before commit.
    async fn replace_graph(
        &self,
        id: WorkflowId,
        nodes: &[NodeRow],
        connections: &[ConnectionRow],
    ) -> Result<Workflow, StoreError>;

    /// Lists an owner's workflows, most recently updated first.
    async fn list(&self, owner: &UserId, filter: &ListFilter) -> Result<WorkflowPage, StoreError>;

    /// Renames a workflow owned by `owner`.
    async fn rename(
        &self,
        id: WorkflowId,
        owner: &UserId,
        name: &WorkflowName,
    ) -> Result<Workflow, StoreError>;

    /// Deletes a workflow owned by `owner`, with its nodes and connections.
    async fn delete(&self, id: WorkflowId, owner: &UserId) -> Result<(), StoreError>;
}
