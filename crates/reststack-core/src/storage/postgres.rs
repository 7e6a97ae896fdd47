//! PostgreSQL JSONB storage backend.
//!
//! All resources share one table:
//!
//! ```text
//! reststack_documents(seq BIGSERIAL, resource TEXT, id TEXT, doc JSONB,
//!                     PRIMARY KEY (resource, id))
//! ```
//!
//! `doc` holds the item without its `id`; the `id` column maps to and from
//! the public `id`. Rows come back in insertion (`seq`) order. Writes run in
//! a transaction holding `pg_advisory_xact_lock(hashtext(resource))`.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row, Transaction};
use tracing::{debug, info};

use reststack_model::types::{Document, ID_FIELD, Item};

use super::{Queries, StorageError, StorageResult};
use crate::filter::{Filter, FilterLeaf, FilterOp};

/// Table holding every document.
const TABLE: &str = "reststack_documents";

/// Default pool size.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// PostgreSQL implementation of [`Queries`].
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing pool. Call [`PostgresStore::run_migrations`] before use.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` and ensure the schema exists.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Connection {
                message: e.to_string(),
            })?;
        let store = Self::new(pool);
        store.run_migrations().await?;
        info!("connected to PostgreSQL document store");
        Ok(store)
    }

    /// Create the document table and its ordering index.
    pub async fn run_migrations(&self) -> StorageResult<()> {
        let statements = [
            format!(
                "CREATE TABLE IF NOT EXISTS {TABLE} (
                    seq BIGSERIAL NOT NULL,
                    resource TEXT NOT NULL,
                    id TEXT NOT NULL,
                    doc JSONB NOT NULL,
                    PRIMARY KEY (resource, id)
                )"
            ),
            format!("CREATE INDEX IF NOT EXISTS {TABLE}_seq_idx ON {TABLE} (resource, seq)"),
        ];
        for statement in &statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| query_error("run migrations", &e))?;
        }
        Ok(())
    }

    /// Begin a transaction holding the per-resource write lock.
    async fn begin_locked(&self, resource: &str) -> StorageResult<Transaction<'static, Postgres>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| query_error("begin transaction", &e))?;
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(resource)
            .execute(&mut *tx)
            .await
            .map_err(|e| query_error("acquire resource lock", &e))?;
        Ok(tx)
    }
}

#[async_trait]
impl Queries for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn get_all(&self, resource: &str, filter: Option<&Filter>) -> StorageResult<Vec<Item>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT id, doc FROM {TABLE}"));
        push_where(&mut builder, resource, filter);
        builder.push(" ORDER BY seq");
        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| query_error("select documents", &e))?;
        rows.iter().map(row_to_item).collect()
    }

    async fn get_by_id(&self, resource: &str, id: &str) -> StorageResult<Option<Item>> {
        let row = sqlx::query(&format!(
            "SELECT id, doc FROM {TABLE} WHERE resource = $1 AND id = $2"
        ))
        .bind(resource)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| query_error("select document", &e))?;
        row.as_ref().map(row_to_item).transpose()
    }

    async fn create(
        &self,
        resource: &str,
        id: Option<&str>,
        mut fields: Document,
    ) -> StorageResult<Item> {
        fields.remove(ID_FIELD);
        let id = id.map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_owned);
        let mut tx = self.begin_locked(resource).await?;
        let row = sqlx::query(&format!(
            "INSERT INTO {TABLE} (resource, id, doc) VALUES ($1, $2, $3)
             ON CONFLICT (resource, id) DO NOTHING
             RETURNING id, doc"
        ))
        .bind(resource)
        .bind(&id)
        .bind(Value::Object(fields))
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| query_error("insert document", &e))?;
        let Some(row) = row else {
            return Err(StorageError::AlreadyExists { id });
        };
        let item = row_to_item(&row)?;
        commit(tx).await?;
        debug!(resource, id = %item.id, "created document");
        Ok(item)
    }

    async fn update(&self, resource: &str, item: Item) -> StorageResult<Item> {
        self.write_doc(resource, item, "doc || $3").await
    }

    async fn replace(&self, resource: &str, item: Item) -> StorageResult<Item> {
        self.write_doc(resource, item, "$3").await
    }

    async fn delete_by_id(&self, resource: &str, id: &str) -> StorageResult<()> {
        let mut tx = self.begin_locked(resource).await?;
        sqlx::query(&format!(
            "DELETE FROM {TABLE} WHERE resource = $1 AND id = $2"
        ))
        .bind(resource)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| query_error("delete document", &e))?;
        commit(tx).await
    }

    async fn delete_all(&self, resource: &str) -> StorageResult<()> {
        let mut tx = self.begin_locked(resource).await?;
        sqlx::query(&format!("DELETE FROM {TABLE} WHERE resource = $1"))
            .bind(resource)
            .execute(&mut *tx)
            .await
            .map_err(|e| query_error("delete documents", &e))?;
        commit(tx).await
    }

    async fn delete_by_filter(&self, resource: &str, filter: &Filter) -> StorageResult<()> {
        let mut tx = self.begin_locked(resource).await?;
        let mut builder = QueryBuilder::<Postgres>::new(format!("DELETE FROM {TABLE}"));
        push_where(&mut builder, resource, Some(filter));
        let result = builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| query_error("delete filtered documents", &e))?;
        commit(tx).await?;
        debug!(resource, removed = result.rows_affected(), "deleted filtered documents");
        Ok(())
    }
}

impl PostgresStore {
    /// `UPDATE ... SET doc = <expr>` for one existing row.
    async fn write_doc(&self, resource: &str, item: Item, expr: &str) -> StorageResult<Item> {
        let Item { id, mut fields } = item;
        fields.remove(ID_FIELD);
        let mut tx = self.begin_locked(resource).await?;
        let row = sqlx::query(&format!(
            "UPDATE {TABLE} SET doc = {expr} WHERE resource = $1 AND id = $2 RETURNING id, doc"
        ))
        .bind(resource)
        .bind(&id)
        .bind(Value::Object(fields))
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| query_error("update document", &e))?;
        let Some(row) = row else {
            return Err(StorageError::NotFound { id });
        };
        let item = row_to_item(&row)?;
        commit(tx).await?;
        Ok(item)
    }
}

async fn commit(tx: Transaction<'static, Postgres>) -> StorageResult<()> {
    tx.commit()
        .await
        .map_err(|e| query_error("commit transaction", &e))
}

fn query_error(operation: &str, e: &sqlx::Error) -> StorageError {
    StorageError::Query {
        message: format!("failed to {operation}: {e}"),
    }
}

fn row_to_item(row: &PgRow) -> StorageResult<Item> {
    let id: String = row
        .try_get("id")
        .map_err(|e| query_error("decode id", &e))?;
    let doc: Value = row
        .try_get("doc")
        .map_err(|e| query_error("decode document", &e))?;
    match doc {
        Value::Object(fields) => Ok(Item::new(id, fields)),
        other => Err(StorageError::Corrupt {
            location: TABLE.to_owned(),
            message: format!("document '{id}' is not an object: {other}"),
        }),
    }
}

// ---------------------------------------------------------------------------
// Filter compilation
// ---------------------------------------------------------------------------

fn push_where(builder: &mut QueryBuilder<'_, Postgres>, resource: &str, filter: Option<&Filter>) {
    builder.push(" WHERE resource = ");
    builder.push_bind(resource.to_owned());
    for leaf in filter.map(Filter::leaves).unwrap_or_default() {
        builder.push(" AND ");
        push_leaf(builder, &leaf);
    }
}

/// Compile one leaf with the same semantics as the in-memory evaluator:
/// strings case-insensitive, numbers numeric, booleans boolean, anything
/// else never equal. Intermediate path steps must be objects.
fn push_leaf(builder: &mut QueryBuilder<'_, Postgres>, leaf: &FilterLeaf<'_>) {
    if leaf.op == FilterOp::Neq {
        builder.push("NOT ");
    }
    builder.push("(");

    if leaf.path == [ID_FIELD] {
        builder.push("id ILIKE ");
        builder.push_bind(like_pattern(leaf.value));
        builder.push(" ESCAPE '\\'");
        builder.push(")");
        return;
    }

    let path: Vec<String> = leaf.path.iter().map(|s| (*s).to_owned()).collect();
    builder.push("COALESCE(");
    // `#>` also indexes arrays; dotted filter paths only descend through objects.
    for depth in 1..path.len() {
        builder.push("jsonb_typeof(doc #> ");
        builder.push_bind(path[..depth].to_vec());
        builder.push(") = 'object' AND ");
    }
    builder.push("CASE jsonb_typeof(doc #> ");
    builder.push_bind(path.clone());
    builder.push(") WHEN 'string' THEN (doc #>> ");
    builder.push_bind(path.clone());
    builder.push(") ILIKE ");
    builder.push_bind(like_pattern(leaf.value));
    builder.push(" ESCAPE '\\'");

    builder.push(" WHEN 'number' THEN ");
    match leaf.value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => {
            builder.push("(doc #>> ");
            builder.push_bind(path.clone());
            builder.push(")::double precision = ");
            builder.push_bind(number);
        }
        _ => {
            builder.push("FALSE");
        }
    }

    builder.push(" WHEN 'boolean' THEN ");
    match leaf.value.to_ascii_lowercase().as_str() {
        "true" | "false" => {
            builder.push("(doc #>> ");
            builder.push_bind(path);
            builder.push(")::boolean = ");
            builder.push_bind(leaf.value.eq_ignore_ascii_case("true"));
        }
        _ => {
            builder.push("FALSE");
        }
    }

    builder.push(" ELSE FALSE END, FALSE))");
}

/// Escape LIKE wildcards so the operand matches literally.
fn like_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
