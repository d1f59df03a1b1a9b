use std::{future::Future, str::FromStr, time::Duration};

use sqlx::{
    query, query_as, query_scalar,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};

use crate::model::{NewTodo, ObjectId, Todo};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("todo {0} not found")]
    NotFound(ObjectId),
}

/// Gateway over the `todos` collection.
///
/// Holds the process-wide connection pool. Cloning is cheap and every clone
/// shares the same pool; `close` releases it for all of them.
#[derive(Debug, Clone)]
pub struct TodoStore {
    db: Pool<Sqlite>,
    timeout: Duration,
}

impl TodoStore {
    /// Opens the pool, checks liveness and makes sure the collection exists.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&config.url)?.create_if_missing(true);

        let pool = tokio::time::timeout(
            config.timeout,
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .connect_with(options),
        )
        .await
        .map_err(|_| StoreError::Timeout(config.timeout))??;

        Self::from_pool(pool, config.timeout).await
    }

    /// Initialises a store over an already opened pool. The pool is closed
    /// again if initialisation fails.
    pub async fn from_pool(pool: Pool<Sqlite>, timeout: Duration) -> Result<Self, StoreError> {
        let store = TodoStore { db: pool, timeout };

        let init = async {
            store.ping().await?;
            store.create_collection().await
        };
        if let Err(err) = init.await {
            store.close().await;
            return Err(err);
        }

        Ok(store)
    }

    async fn create_collection(&self) -> Result<(), StoreError> {
        self.bounded(
            query(
                r#"CREATE TABLE IF NOT EXISTS todos (
                id TEXT PRIMARY KEY NOT NULL DEFAULT (lower(hex(randomblob(12)))),
                body TEXT NOT NULL CHECK (length(body) > 0),
                completed BOOLEAN NOT NULL DEFAULT 0
            );"#,
            )
            .execute(&self.db),
        )
        .await?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.bounded(query_scalar::<_, i64>("SELECT 1").fetch_one(&self.db))
            .await?;
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<Todo>, StoreError> {
        self.bounded(
            query_as::<_, Todo>("SELECT id, completed, body FROM todos ORDER BY rowid")
                .fetch_all(&self.db),
        )
        .await
    }

    pub async fn insert(&self, todo: NewTodo) -> Result<Todo, StoreError> {
        self.bounded(
            query_as::<_, Todo>(
                "INSERT INTO todos (body, completed) VALUES (?, ?) RETURNING id, completed, body",
            )
            .bind(todo.body)
            .bind(todo.completed)
            .fetch_one(&self.db),
        )
        .await
    }

    /// Deleting an id that matches nothing is not an error.
    pub async fn delete_by_id(&self, id: &ObjectId) -> Result<(), StoreError> {
        let rows_affected = self
            .bounded(
                query("DELETE FROM todos WHERE id = ?")
                    .bind(id.as_str())
                    .execute(&self.db),
            )
            .await?
            .rows_affected();
        tracing::debug!(%id, rows_affected, "deleted todo");
        Ok(())
    }

    /// Sets `completed` in a single conditional statement, so concurrent
    /// calls cannot overwrite each other's record.
    pub async fn mark_complete(&self, id: &ObjectId) -> Result<(), StoreError> {
        let updated = self
            .bounded(
                query_scalar::<_, ObjectId>(
                    "UPDATE todos SET completed = 1 WHERE id = ? RETURNING id",
                )
                .bind(id.as_str())
                .fetch_optional(&self.db),
            )
            .await?;

        match updated {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id.clone())),
        }
    }

    pub async fn close(&self) {
        self.db.close().await;
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    // In-memory databases live as long as their connection, so the pool is
    // pinned to a single connection that never expires.
    pub(crate) async fn memory_store() -> TodoStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        TodoStore::from_pool(pool, Duration::from_secs(5))
            .await
            .unwrap()
    }

    fn missing_id() -> ObjectId {
        "000000000000000000000000".parse().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_distinct_ids() {
        let store = memory_store().await;

        let first = store.insert(NewTodo::new("buy milk")).await.unwrap();
        let second = store.insert(NewTodo::new("buy milk")).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.body, "buy milk");
        assert!(!first.completed);
        assert!(first.id.as_str().parse::<ObjectId>().is_ok());
    }

    #[tokio::test]
    async fn list_all_returns_records_in_insertion_order() {
        let store = memory_store().await;
        assert!(store.list_all().await.unwrap().is_empty());

        let a = store.insert(NewTodo::new("a")).await.unwrap();
        let b = store.insert(NewTodo::new("b")).await.unwrap();

        assert_eq!(store.list_all().await.unwrap(), vec![a, b]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = memory_store().await;
        let todo = store.insert(NewTodo::new("walk dog")).await.unwrap();

        store.delete_by_id(&todo.id).await.unwrap();
        store.delete_by_id(&todo.id).await.unwrap();
        store.delete_by_id(&missing_id()).await.unwrap();

        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_complete_sets_flag_and_is_idempotent() {
        let store = memory_store().await;
        let todo = store.insert(NewTodo::new("pay rent")).await.unwrap();

        store.mark_complete(&todo.id).await.unwrap();
        store.mark_complete(&todo.id).await.unwrap();

        let todos = store.list_all().await.unwrap();
        assert_eq!(todos.len(), 1);
        assert!(todos[0].completed);
        assert_eq!(todos[0].body, "pay rent");
    }

    #[tokio::test]
    async fn mark_complete_on_missing_id_is_not_found() {
        let store = memory_store().await;

        let err = store.mark_complete(&missing_id()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == missing_id()));
    }

    #[tokio::test]
    async fn empty_body_is_rejected_by_the_store() {
        let store = memory_store().await;

        let err = store.insert(NewTodo::new("")).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test]
    async fn stalled_calls_hit_the_deadline() {
        let store = memory_store().await;
        let store = TodoStore {
            db: store.db.clone(),
            timeout: Duration::from_millis(20),
        };

        let err = store
            .bounded(std::future::pending::<Result<(), sqlx::Error>>())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(t) if t == Duration::from_millis(20)));

        let response = axum::response::IntoResponse::into_response(crate::error::AppError::from(err));
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn init_on_a_closed_pool_fails() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        pool.close().await;

        let result = TodoStore::from_pool(pool.clone(), Duration::from_secs(5)).await;
        assert!(result.is_err());
        assert!(pool.is_closed());
    }

    #[tokio::test]
    async fn failed_collection_setup_closes_the_pool() {
        // An empty file is a valid database, but read-only forbids CREATE TABLE
        let file = tempfile::NamedTempFile::new().unwrap();
        let options = SqliteConnectOptions::new()
            .filename(file.path())
            .read_only(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();

        let result = TodoStore::from_pool(pool.clone(), Duration::from_secs(5)).await;
        assert!(matches!(result, Err(StoreError::Database(_))));
        assert!(pool.is_closed());
    }

    #[tokio::test]
    async fn closed_store_reports_errors_instead_of_panicking() {
        let store = memory_store().await;
        store.close().await;

        assert!(store.list_all().await.is_err());
        assert!(store.ping().await.is_err());
    }
}
