//! PostgreSQL workflow store.

use super::{ListFilter, StoreError, WorkflowPage, WorkflowStore};
use async_trait::async_trait;
use automa_core::{Result, UserId, WorkflowId};
use automa_workflow::{ConnectionRow, NodeRow, NodeType, Workflow, WorkflowName};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::str::FromStr;
use tracing::instrument;

/// Last statement of a graph replacement. `now()` would be the
/// transaction start time, not the commit time.
const STAMP_UPDATED_AT: &str = r#"
    UPDATE workflows
    SET updated_at = clock_timestamp()
    WHERE id = $1
    RETURNING id, name, owner_id, created_at, updated_at
"#;

/// Row type for workflow queries.
#[derive(FromRow)]
struct WorkflowDbRow {
    id: String,
    name: String,
    owner_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkflowDbRow {
    fn try_into_workflow(self) -> std::result::Result<Workflow, StoreError> {
        let id = WorkflowId::from_str(&self.id).map_err(|e| StoreError::Corrupt {
            details: format!("invalid workflow id '{}': {e}", self.id),
        })?;
        let name = WorkflowName::new(&self.name).map_err(|e| StoreError::Corrupt {
            details: format!("workflow '{}': {e}", self.id),
        })?;
        let owner_id = UserId::from_str(&self.owner_id).map_err(|e| StoreError::Corrupt {
            details: format!("workflow '{}': {e}", self.id),
        })?;

        Ok(Workflow {
            id,
            name,
            owner_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct NodeDbRow {
    id: String,
    node_type: String,
    name: String,
    position_x: f64,
    position_y: f64,
    data: serde_json::Value,
}

impl NodeDbRow {
    fn try_into_row(self, workflow_id: WorkflowId) -> std::result::Result<NodeRow, StoreError> {
        let corrupt = |details: String| StoreError::Corrupt { details };
        Ok(NodeRow {
            id: self
                .id
                .parse()
                .map_err(|e| corrupt(format!("node in workflow '{workflow_id}': {e}")))?,
            workflow_id,
            node_type: NodeType::from_str(&self.node_type)
                .map_err(|e| corrupt(format!("node '{}': {e}", self.id)))?,
            name: self.name,
            position_x: self.position_x,
            position_y: self.position_y,
            data: self.data,
        })
    }
}

#[derive(FromRow)]
struct ConnectionDbRow {
    id: String,
    from_node_id: String,
    to_node_id: String,
    from_output: String,
    to_input: String,
}

impl ConnectionDbRow {
    fn try_into_row(self, workflow_id: WorkflowId) -> std::result::Result<ConnectionRow, StoreError> {
        let corrupt = |e: automa_core::ParseIdError| StoreError::Corrupt {
            details: format!("connection '{}' in workflow '{workflow_id}': {e}", self.id),
        };
        Ok(ConnectionRow {
            id: self.id.parse().map_err(corrupt)?,
            workflow_id,
            from_node_id: self.from_node_id.parse().map_err(corrupt)?,
            to_node_id: self.to_node_id.parse().map_err(corrupt)?,
            from_output: self.from_output,
            to_input: self.to_input,
        })
    }
}

/// Workflow store backed by PostgreSQL.
#[derive(Clone)]
pub struct PgWorkflowStore {
    pool: PgPool,
}

impl PgWorkflowStore {
    /// Creates a new store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_rows(
    tx: &mut Transaction<'_, Postgres>,
    nodes: &[NodeRow],
    connections: &[ConnectionRow],
) -> std::result::Result<(), sqlx::Error> {
    for node in nodes {
        sqlx::query(
            r#"
            INSERT INTO nodes (id, workflow_id, type, name, position_x, position_y, data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(node.id.as_str())
        .bind(node.workflow_id.to_string())
        .bind(node.node_type.as_str())
        .bind(&node.name)
        .bind(node.position_x)
        .bind(node.position_y)
        .bind(&node.data)
        .execute(&mut **tx)
        .await?;
    }

    for connection in connections {
        sqlx::query(
            r#"
            INSERT INTO connections (id, workflow_id, from_node_id, to_node_id, from_output, to_input)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(connection.id.as_str())
        .bind(connection.workflow_id.to_string())
        .bind(connection.from_node_id.as_str())
        .bind(connection.to_node_id.as_str())
        .bind(&connection.from_output)
        .bind(&connection.to_input)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

#[async_trait]
impl WorkflowStore for PgWorkflowStore {
    #[instrument(skip_all, fields(workflow_id = %workflow.id))]
    async fn insert(
        &self,
        workflow: &Workflow,
        nodes: &[NodeRow],
        connections: &[ConnectionRow],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from_sqlx)?;

        sqlx::query(
            r#"
            INSERT INTO workflows (id, name, owner_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(workflow.id.to_string())
        .bind(workflow.name.as_str())
        .bind(workflow.owner_id.as_str())
        .bind(workflow.created_at)
        .bind(workflow.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        insert_rows(&mut tx, nodes, connections)
            .await
            .map_err(StoreError::from_sqlx)?;

        tx.commit().await.map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    #[instrument(skip(self), fields(workflow_id = %id))]
    async fn find(&self, id: WorkflowId) -> Result<Option<Workflow>, StoreError> {
        let row: Option<WorkflowDbRow> = sqlx::query_as(
            r#"
            SELECT id, name, owner_id, created_at, updated_at
            FROM workflows
            WHERE id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(row.map(WorkflowDbRow::try_into_workflow).transpose()?)
    }

    #[instrument(skip(self), fields(workflow_id = %id))]
    async fn load_graph(
        &self,
        id: WorkflowId,
    ) -> Result<(Vec<NodeRow>, Vec<ConnectionRow>), StoreError> {
        // One snapshot for both reads so a concurrent save is seen whole or not at all.
        let mut tx = self.pool.begin().await.map_err(StoreError::from_sqlx)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?;

        let nodes: Vec<NodeDbRow> = sqlx::query_as(
            r#"
            SELECT id, type AS node_type, name, position_x, position_y, data
            FROM nodes
            WHERE workflow_id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        let connections: Vec<ConnectionDbRow> = sqlx::query_as(
            r#"
            SELECT id, from_node_id, to_node_id, from_output, to_input
            FROM connections
            WHERE workflow_id = $1
            "#,
        )
        .bind(id.to_string())
        .fetch_all(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        tx.commit().await.map_err(StoreError::from_sqlx)?;

        let nodes = nodes
            .into_iter()
            .map(|row| row.try_into_row(id))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let connections = connections
            .into_iter()
            .map(|row| row.try_into_row(id))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok((nodes, connections))
    }

    #[instrument(
        skip(self, nodes, connections),
        fields(workflow_id = %id, nodes = nodes.len(), connections = connections.len())
    )]
    async fn replace_graph(
        &self,
        id: WorkflowId,
        nodes: &[NodeRow],
        connections: &[ConnectionRow],
    ) -> Result<Workflow, StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from_sqlx)?;

        // Locks the workflow row, serializing concurrent saves of the same workflow.
        let locked: Option<String> =
            sqlx::query_scalar("SELECT id FROM workflows WHERE id = $1 FOR UPDATE")
                .bind(id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(StoreError::from_sqlx)?;
        if locked.is_none() {
            return Err(StoreError::NotFound { id }.into());
        }

        sqlx::query("DELETE FROM connections WHERE workflow_id = $1")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?;
        sqlx::query("DELETE FROM nodes WHERE workflow_id = $1")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?;

        insert_rows(&mut tx, nodes, connections)
            .await
            .map_err(StoreError::from_sqlx)?;

        let row: WorkflowDbRow = sqlx::query_as(STAMP_UPDATED_AT)
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?;
        // Dropping `tx` on a corrupt row rolls the save back.
        let workflow = row.try_into_workflow()?;

        tx.commit().await.map_err(StoreError::from_sqlx)?;
        tracing::debug!("workflow graph replaced");

        Ok(workflow)
    }

    #[instrument(skip(self, filter), fields(owner_id = %owner))]
    async fn list(&self, owner: &UserId, filter: &ListFilter) -> Result<WorkflowPage, StoreError> {
        let pattern = filter
            .search
            .as_deref()
            .map(|s| format!("%{}%", escape_like(s)));

        let rows: Vec<WorkflowDbRow> = sqlx::query_as(
            r#"
            SELECT id, name, owner_id, created_at, updated_at
            FROM workflows
            WHERE owner_id = $1
              AND ($2::text IS NULL OR name ILIKE $2)
            ORDER BY updated_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(owner.as_str())
        .bind(pattern.as_deref())
        .bind(i64::from(filter.limit))
        .bind(i64::try_from(filter.offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM workflows
            WHERE owner_id = $1
              AND ($2::text IS NULL OR name ILIKE $2)
            "#,
        )
        .bind(owner.as_str())
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        let items = rows
            .into_iter()
            .map(WorkflowDbRow::try_into_workflow)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(WorkflowPage {
            items,
            total_count: u64::try_from(total).unwrap_or_default(),
        })
    }

    #[instrument(skip(self, name), fields(workflow_id = %id, owner_id = %owner))]
    async fn rename(
        &self,
        id: WorkflowId,
        owner: &UserId,
        name: &WorkflowName,
    ) -> Result<Workflow, StoreError> {
        let row: Option<WorkflowDbRow> = sqlx::query_as(
            r#"
            UPDATE workflows
            SET name = $3, updated_at = now()
            WHERE id = $1 AND owner_id = $2
            RETURNING id, name, owner_id, created_at, updated_at
            "#,
        )
        .bind(id.to_string())
        .bind(owner.as_str())
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        match row {
            Some(row) => Ok(row.try_into_workflow()?),
            None => Err(StoreError::NotFound { id }.into()),
        }
    }

    #[instrument(skip(self), fields(workflow_id = %id, owner_id = %owner))]
    async fn delete(&self, id: WorkflowId, owner: &UserId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM workflows WHERE id = $1 AND owner_id = $2")
            .bind(id.to_string())
            .bind(owner.as_str())
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id }.into());
        }
        Ok(())
    }
}

/// Escapes `LIKE` wildcards so the search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
