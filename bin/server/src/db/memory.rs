//! In-memory workflow store.
//!
//! Holds everything behind one `RwLock`; each write runs in a single
//! write section, which gives the same all-or-nothing graph replacement as
//! a database transaction. Connection rows are checked against the node
//! rows like the database's foreign keys would.

use super::{ListFilter, StoreError, WorkflowPage, WorkflowStore};
use async_trait::async_trait;
use automa_core::{NodeId, Result, UserId, WorkflowId};
use automa_workflow::{ConnectionRow, NodeRow, Workflow, WorkflowName};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct State {
    workflows: HashMap<WorkflowId, Workflow>,
    graphs: HashMap<WorkflowId, (Vec<NodeRow>, Vec<ConnectionRow>)>,
}

/// Workflow store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryWorkflowStore {
    state: RwLock<State>,
}

impl MemoryWorkflowStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_rows(nodes: &[NodeRow], connections: &[ConnectionRow]) -> std::result::Result<(), StoreError> {
    let mut node_ids: HashSet<&NodeId> = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !node_ids.insert(&node.id) {
            return Err(StoreError::Database {
                details: format!("duplicate node id '{}'", node.id),
            });
        }
    }
    let mut connection_ids = HashSet::with_capacity(connections.len());
    for connection in connections {
        if !connection_ids.insert(&connection.id) {
            return Err(StoreError::Database {
                details: format!("duplicate connection id '{}'", connection.id),
            });
        }
        if !node_ids.contains(&connection.from_node_id) || !node_ids.contains(&connection.to_node_id)
        {
            return Err(StoreError::Database {
                details: format!("connection '{}' references a missing node", connection.id),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn insert(
        &self,
        workflow: &Workflow,
        nodes: &[NodeRow],
        connections: &[ConnectionRow],
    ) -> Result<(), StoreError> {
        check_rows(nodes, connections)?;
        let mut state = self.state.write().await;
        if state.workflows.contains_key(&workflow.id) {
            return Err(StoreError::Database {
                details: format!("workflow '{}' already exists", workflow.id),
            }
            .into());
        }
        state.workflows.insert(workflow.id, workflow.clone());
        state
            .graphs
            .insert(workflow.id, (nodes.to_vec(), connections.to_vec()));
        Ok(())
    }

    async fn find(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        Ok(self.state.read().await.workflows.get(&id).cloned())
    }

    async fn load_graph(
        &self,
        id: WorkflowId,
    ) -> Result<(Vec<NodeRow>, Vec<ConnectionRow>), StoreError> {
        Ok(self
            .state
            .read()
            .await
            .graphs
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_graph(
        &self,
        id: WorkflowId,
        nodes: &[NodeRow],
        connections: &[ConnectionRow],
    ) -> Result<Workflow, StoreError> {
        check_rows(nodes, connections)?;
        let mut state = self.state.write().await;
        let Some(workflow) = state.workflows.get_mut(&id) else {
            return Err(StoreError::NotFound { id }.into());
        };
        workflow.updated_at = Utc::now();
        let workflow = workflow.clone();
        state.graphs.insert(id, (nodes.to_vec(), connections.to_vec()));
        Ok(workflow)
    }

    async fn list(&self, owner: &UserId, filter: &ListFilter) -> Result<WorkflowPage, StoreError> {
        let state = self.state.read().await;
        let needle = filter.search.as_deref().map(str::to_lowercase);

        let mut matches: Vec<&Workflow> = state
            .workflows
            .values()
            .filter(|w| w.is_owned_by(owner))
            .filter(|w| {
                needle
                    .as_deref()
                    .is_none_or(|n| w.name.as_str().to_lowercase().contains(n))
            })
            .collect();
        matches.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));

        let total_count = matches.len() as u64;
        let offset = usize::try_from(filter.offset).unwrap_or(usize::MAX);
        let items = matches
            .into_iter()
            .skip(offset)
            .take(filter.limit as usize)
            .cloned()
            .collect();

        Ok(WorkflowPage { items, total_count })
    }

    async fn rename(
        &self,
        id: WorkflowId,
        owner: &UserId,
        name: &WorkflowName,
    ) -> Result<Workflow, StoreError> {
        let mut state = self.state.write().await;
        match state.workflows.get_mut(&id) {
            Some(workflow) if workflow.is_owned_by(owner) => {
                workflow.name = name.clone();
                workflow.updated_at = Utc::now();
                Ok(workflow.clone())
            }
            _ => Err(StoreError::NotFound { id }.into()),
        }
    }

    async fn delete(&self, id: WorkflowId, owner: &UserId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.workflows.get(&id).is_some_and(|w| w.is_owned_by(owner)) {
            return Err(StoreError::NotFound { id }.into());
        }
        state.workflows.remove(&id);
        state.graphs.remove(&id);
        Ok(())
    }
}
