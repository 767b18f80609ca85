//! JSON HTTP API.
//!
//! Routes:
//! - `POST /api/workflows` creates a workflow
//! - `GET /api/workflows` lists the caller's workflows
//! - `GET /api/workflows/{id}` loads a workflow with its graph
//! - `PATCH /api/workflows/{id}` renames a workflow
//! - `DELETE /api/workflows/{id}` deletes a workflow
//! - `PUT /api/workflows/{id}/graph` replaces a workflow's graph
//!
//! The caller is identified by the `x-user-id` header, set by the
//! authenticating proxy in front of this service.

use crate::error::WorkflowError;
use crate::service::{ListParams, WorkflowList, WorkflowService};
use automa_core::{UserId, WorkflowId};
use automa_workflow::{Workflow, WorkflowGraph, WorkflowName, WorkflowWithGraph};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tower_http::trace::TraceLayer;

/// Header carrying the authenticated user's ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: WorkflowService,
}

impl AppState {
    pub fn new(service: WorkflowService) -> Self {
        Self { service }
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub UserId);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = WorkflowError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(WorkflowError::NotAuthenticated)?;
        UserId::from_str(raw)
            .map(Self)
            .map_err(|_| WorkflowError::NotAuthenticated)
    }
}

/// A workflow with its graph, as the editor loads it.
#[derive(Debug, Serialize)]
pub struct WorkflowGraphResponse {
    pub id: WorkflowId,
    pub name: WorkflowName,
    #[serde(flatten)]
    pub graph: WorkflowGraph,
}

impl From<WorkflowWithGraph> for WorkflowGraphResponse {
    fn from(loaded: WorkflowWithGraph) -> Self {
        Self {
            id: loaded.workflow.id,
            name: loaded.workflow.name,
            graph: loaded.graph,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/workflows", get(list_workflows).post(create_workflow))
        .route(
            "/api/workflows/{id}",
            get(get_workflow)
                .patch(rename_workflow)
                .delete(delete_workflow),
        )
        .route("/api/workflows/{id}/graph", put(save_workflow_graph))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Unparsable IDs cannot name an existing workflow.
fn parse_workflow_id(raw: &str) -> Result<WorkflowId, WorkflowError> {
    WorkflowId::from_str(raw).map_err(|_| WorkflowError::NotFound {
        id: raw.to_string(),
    })
}

async fn create_workflow(
    State(state): State<AppState>,
    Caller(owner): Caller,
) -> Result<(StatusCode, Json<WorkflowGraphResponse>), WorkflowError> {
    let created = state.service.create(&owner).await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

async fn list_workflows(
    State(state): State<AppState>,
    Caller(owner): Caller,
    query: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<WorkflowList>, WorkflowError> {
    let Query(params) = query?;
    Ok(Json(state.service.list(&owner, params).await?))
}

async fn get_workflow(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(id): Path<String>,
) -> Result<Json<WorkflowGraphResponse>, WorkflowError> {
    let id = parse_workflow_id(&id)?;
    let loaded = state.service.get_graph(id, &owner).await?;
    Ok(Json(loaded.into()))
}

async fn save_workflow_graph(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(id): Path<String>,
    body: Result<Json<WorkflowGraph>, JsonRejection>,
) -> Result<Json<Workflow>, WorkflowError> {
    let id = parse_workflow_id(&id)?;
    let Json(graph) = body?;
    Ok(Json(state.service.save_graph(id, &owner, &graph).await?))
}

async fn rename_workflow(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(id): Path<String>,
    body: Result<Json<RenameRequest>, JsonRejection>,
) -> Result<Json<Workflow>, WorkflowError> {
    let id = parse_workflow_id(&id)?;
    let Json(request) = body?;
    let name = WorkflowName::new(&request.name).map_err(WorkflowError::InvalidName)?;
    Ok(Json(state.service.rename(id, &owner, &name).await?))
}

async fn delete_workflow(
    State(state): State<AppState>,
    Caller(owner): Caller,
    Path(id): Path<String>,
) -> Result<StatusCode, WorkflowError> {
    let id = parse_workflow_id(&id)?;
    state.service.delete(id, &owner).await?;
    Ok(StatusCode::NO_CONTENT)
}
