//! Owner-scoped workflow operations.
//!
//! Every operation takes the requesting user. A workflow owned by someone
//! else is reported exactly like a missing one.

use crate::db::{ListFilter, WorkflowStore};
use crate::error::WorkflowError;
use automa_core::{UserId, WorkflowId};
use automa_workflow::{
    NodeTypeRegistry, Workflow, WorkflowGraph, WorkflowName, WorkflowWithGraph, from_storage_rows,
    to_storage_rows, validate_for_save,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Page returned when no page is requested.
pub const DEFAULT_PAGE: u32 = 1;
/// Page size returned when none is requested.
pub const DEFAULT_PAGE_SIZE: u32 = 5;
pub const MIN_PAGE_SIZE: u32 = 1;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Listing request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
}

/// Pagination details of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_count: u64,
    pub total_pages: u64,
    pub current_page: u32,
    pub page_size: u32,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl Pagination {
    fn new(total_count: u64, page: u32, page_size: u32) -> Self {
        let total_pages = total_count.div_ceil(u64::from(page_size));
        Self {
            total_count,
            total_pages,
            current_page: page,
            page_size,
            has_next_page: u64::from(page) < total_pages,
            has_previous_page: page > 1,
        }
    }
}

/// One page of an owner's workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowList {
    pub items: Vec<Workflow>,
    pub pagination: Pagination,
}

/// Workflow operations on top of a [`WorkflowStore`].
#[derive(Clone)]
pub struct WorkflowService {
    store: Arc<dyn WorkflowStore>,
    registry: Arc<NodeTypeRegistry>,
}

impl WorkflowService {
    /// Creates a service.
    pub fn new(store: Arc<dyn WorkflowStore>, registry: Arc<NodeTypeRegistry>) -> Self {
        Self { store, registry }
    }

    /// The node-type catalogue saves are validated against.
    #[must_use]
    pub fn registry(&self) -> &Arc<NodeTypeRegistry> {
        &self.registry
    }

    /// Creates a workflow with a generated name and a lone placeholder node.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow cannot be stored.
    pub async fn create(&self, owner: &UserId) -> Result<WorkflowWithGraph, WorkflowError> {
        let name = WorkflowName::generate(&mut rand::rng());
        let workflow = Workflow::new(name, owner.clone());
        let graph = WorkflowGraph::seeded();
        let (nodes, connections) = to_storage_rows(workflow.id, &graph);

        self.store
            .insert(&workflow, &nodes, &connections)
            .await
            .map_err(WorkflowError::from_store)?;

        tracing::info!(
            workflow_id = %workflow.id,
            owner_id = %owner,
            name = %workflow.name,
            "workflow created"
        );
        Ok(WorkflowWithGraph { workflow, graph })
    }

    /// Loads a workflow and its graph.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] if the workflow is missing or not
    /// owned by `owner`.
    pub async fn get_graph(
        &self,
        id: WorkflowId,
        owner: &UserId,
    ) -> Result<WorkflowWithGraph, WorkflowError> {
        let workflow = self.find_owned(id, owner).await?;
        let (nodes, connections) = self
            .store
            .load_graph(id)
            .await
            .map_err(WorkflowError::from_store)?;

        Ok(WorkflowWithGraph {
            workflow,
            graph: from_storage_rows(nodes, connections),
        })
    }

    /// Replaces a workflow's graph.
    ///
    /// Ownership and validation are checked before the storage transaction
    /// opens.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::NotFound`] if the workflow is missing or not owned
    /// - [`WorkflowError::InvalidGraph`] if the graph fails validation
    /// - [`WorkflowError::Unavailable`] if storage failed transiently
    pub async fn save_graph(
        &self,
        id: WorkflowId,
        owner: &UserId,
        graph: &WorkflowGraph,
    ) -> Result<Workflow, WorkflowError> {
        self.find_owned(id, owner).await?;

        validate_for_save(&self.registry, graph).map_err(|err| {
            tracing::debug!(workflow_id = %id, error = %err, "rejected graph");
            WorkflowError::InvalidGraph(err)
        })?;

        let (nodes, connections) = to_storage_rows(id, graph);
        let workflow = self
            .store
            .replace_graph(id, &nodes, &connections)
            .await
            .map_err(WorkflowError::from_store)?;

        tracing::info!(
            workflow_id = %id,
            nodes = nodes.len(),
            connections = connections.len(),
            "workflow graph saved"
        );
        Ok(workflow)
    }

    /// Lists an owner's workflows, most recently updated first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidQuery`] if the page is zero or the page
    /// size is out of bounds.
    pub async fn list(
        &self,
        owner: &UserId,
        params: ListParams,
    ) -> Result<WorkflowList, WorkflowError> {
        let page = params.page.unwrap_or(DEFAULT_PAGE);
        let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page < 1 {
            return Err(WorkflowError::InvalidQuery {
                details: "page must be at least 1".to_string(),
            });
        }
        if !(MIN_PAGE_SIZE..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(WorkflowError::InvalidQuery {
                details: format!("page size must be between {MIN_PAGE_SIZE} and {MAX_PAGE_SIZE}"),
            });
        }

        let filter = ListFilter {
            search: params.search.filter(|s| !s.is_empty()),
            limit: page_size,
            offset: u64::from(page - 1) * u64::from(page_size),
        };
        let result = self
            .store
            .list(owner, &filter)
            .await
            .map_err(WorkflowError::from_store)?;

        Ok(WorkflowList {
            items: result.items,
            pagination: Pagination::new(result.total_count, page, page_size),
        })
    }

    /// Renames a workflow.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] if the workflow is missing or not
    /// owned by `owner`.
    pub async fn rename(
        &self,
        id: WorkflowId,
        owner: &UserId,
        name: &WorkflowName,
    ) -> Result<Workflow, WorkflowError> {
        let workflow = self
            .store
            .rename(id, owner, name)
            .await
            .map_err(WorkflowError::from_store)?;
        tracing::info!(workflow_id = %id, name = %name, "workflow renamed");
        Ok(workflow)
    }

    /// Deletes a workflow with its nodes and connections.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] if the workflow is missing or not
    /// owned by `owner`.
    pub async fn delete(&self, id: WorkflowId, owner: &UserId) -> Result<(), WorkflowError> {
        self.store
            .delete(id, owner)
            .await
            .map_err(WorkflowError::from_store)?;
        tracing::info!(workflow_id = %id, "workflow deleted");
        Ok(())
    }

    async fn find_owned(&self, id: WorkflowId, owner: &UserId) -> Result<Workflow, WorkflowError> {
        let workflow = self
            .store
            .find(id)
            .await
            .map_err(WorkflowError::from_store)?;

        match workflow {
            Some(workflow) if workflow.is_owned_by(owner) => Ok(workflow),
            Some(_) => {
                tracing::debug!(workflow_id = %id, owner_id = %owner, "workflow not owned by requester");
                Err(WorkflowError::NotFound { id: id.to_string() })
            }
            None => Err(WorkflowError::NotFound { id: id.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryWorkflowStore;
    use automa_core::NodeId;
    use automa_workflow::{Connection, NodeType, Position, ValidationError};
    use serde_json::{Value as JsonValue, json};

    fn service() -> (WorkflowService, Arc<MemoryWorkflowStore>) {
        let store = Arc::new(MemoryWorkflowStore::new());
        let service = WorkflowService::new(store.clone(), Arc::new(NodeTypeRegistry::builtin()));
        (service, store)
    }

    fn user(raw: &str) -> UserId {
        raw.parse().expect("user id")
    }

    fn node_id(raw: &str) -> NodeId {
        raw.parse().expect("node id")
    }

    fn trigger_then_request() -> WorkflowGraph {
        let JsonValue::Object(data) = json!({
            "label": "Fetch",
            "endpoint": "https://api.example.com/items",
            "method": "GET"
        }) else {
            unreachable!()
        };
        WorkflowGraph::new()
            .add_node(node_id("t"), NodeType::ManualTrigger, Position::new(0.0, 0.0))
            .add_node(node_id("r"), NodeType::HttpRequest, Position::new(250.0, 10.0))
            .update_node_data(&node_id("r"), data)
            .add_connection(Connection::new(
                "c1".parse().expect("id"),
                node_id("t"),
                node_id("r"),
            ))
    }

    #[tokio::test]
    async fn create_seeds_placeholder() {
        let (service, _) = service();
        let created = service.create(&user("user_1")).await.expect("create");

        assert_eq!(created.workflow.owner_id.as_str(), "user_1");
        assert_eq!(created.graph.node_count(), 1);
        assert_eq!(created.graph.connection_count(), 0);
        let node = &created.graph.nodes()[0];
        assert_eq!(node.node_type, NodeType::Initial);
        assert_eq!(node.position, Position::ORIGIN);

        let loaded = service
            .get_graph(created.workflow.id, &user("user_1"))
            .await
            .expect("load");
        assert_eq!(loaded.graph.node_count(), 1);
        assert_eq!(loaded.graph.nodes()[0].data.label(), Some("INITIAL"));
    }

    #[tokio::test]
    async fn save_then_reload_returns_same_graph() {
        let (service, _) = service();
        let owner = user("user_1");
        let created = service.create(&owner).await.expect("create");
        let graph = trigger_then_request();

        service
            .save_graph(created.workflow.id, &owner, &graph)
            .await
            .expect("save");
        let loaded = service
            .get_graph(created.workflow.id, &owner)
            .await
            .expect("load");

        assert_eq!(loaded.graph.node_count(), 2);
        assert_eq!(loaded.graph.connection_count(), 1);
        assert_eq!(
            loaded.graph.node(&node_id("r")),
            graph.node(&node_id("r"))
        );
        assert_eq!(loaded.graph.connections(), graph.connections());
    }

    #[tokio::test]
    async fn saving_twice_stores_identical_rows() {
        let (service, store) = service();
        let owner = user("user_1");
        let id = service.create(&owner).await.expect("create").workflow.id;
        let graph = trigger_then_request();

        let first = service.save_graph(id, &owner, &graph).await.expect("save");
        let rows_after_first = store.load_graph(id).await.expect("load");
        let second = service.save_graph(id, &owner, &graph).await.expect("save");
        let rows_after_second = store.load_graph(id).await.expect("load");

        assert_eq!(rows_after_first, rows_after_second);
        assert_eq!(rows_after_first, to_storage_rows(id, &graph));
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn other_owners_see_not_found() {
        let (service, _) = service();
        let owner = user("user_1");
        let stranger = user("user_2");
        let id = service.create(&owner).await.expect("create").workflow.id;

        let err = service.get_graph(id, &stranger).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { .. }));

        let err = service
            .save_graph(id, &stranger, &trigger_then_request())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { .. }));

        let missing = service
            .get_graph(WorkflowId::new(), &owner)
            .await
            .unwrap_err();
        assert_eq!(missing.public_message(), err.public_message());
    }

    #[tokio::test]
    async fn invalid_graph_is_rejected_before_storage() {
        let (service, store) = service();
        let owner = user("user_1");
        let id = service.create(&owner).await.expect("create").workflow.id;
        let before = store.load_graph(id).await.expect("load");

        let graph = trigger_then_request().add_node(
            node_id("t2"),
            NodeType::ManualTrigger,
            Position::ORIGIN,
        );
        let err = service.save_graph(id, &owner, &graph).await.unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::InvalidGraph(ValidationError::SingletonViolation { .. })
        ));
        assert_eq!(store.load_graph(id).await.expect("load"), before);
    }

    #[tokio::test]
    async fn list_paginates_with_defaults() {
        let (service, _) = service();
        let owner = user("user_1");
        for _ in 0..7 {
            service.create(&owner).await.expect("create");
        }
        service.create(&user("user_2")).await.expect("create");

        let first = service
            .list(&owner, ListParams::default())
            .await
            .expect("list");
        assert_eq!(first.items.len(), 5);
        assert_eq!(
            first.pagination,
            Pagination {
                total_count: 7,
                total_pages: 2,
                current_page: 1,
                page_size: 5,
                has_next_page: true,
                has_previous_page: false,
            }
        );

        let second = service
            .list(
                &owner,
                ListParams {
                    page: Some(2),
                    ..ListParams::default()
                },
            )
            .await
            .expect("list");
        assert_eq!(second.items.len(), 2);
        assert!(!second.pagination.has_next_page);
        assert!(second.pagination.has_previous_page);
    }

    #[tokio::test]
    async fn list_rejects_out_of_bounds_parameters() {
        let (service, _) = service();
        let owner = user("user_1");
        for params in [
            ListParams {
                page: Some(0),
                ..ListParams::default()
            },
            ListParams {
                page_size: Some(0),
                ..ListParams::default()
            },
            ListParams {
                page_size: Some(101),
                ..ListParams::default()
            },
        ] {
            let err = service.list(&owner, params).await.unwrap_err();
            assert!(matches!(err, WorkflowError::InvalidQuery { .. }));
        }
    }

    #[tokio::test]
    async fn rename_and_delete() {
        let (service, _) = service();
        let owner = user("user_1");
        let id = service.create(&owner).await.expect("create").workflow.id;
        let name = WorkflowName::new("Nightly sync").expect("name");

        let renamed = service.rename(id, &owner, &name).await.expect("rename");
        assert_eq!(renamed.name, name);

        let err = service.delete(id, &user("user_2")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { .. }));

        service.delete(id, &owner).await.expect("delete");
        let err = service.get_graph(id, &owner).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { .. }));
    }

    #[test]
    fn empty_listing_has_no_pages() {
        let pagination = Pagination::new(0, 1, 5);
        assert_eq!(pagination.total_pages, 0);
        assert!(!pagination.has_next_page);
    }
}
