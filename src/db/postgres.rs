use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{Collection, DocumentStore, Filter, StoreError, WriteBatch, WriteOp};

/// Document store backed by a single JSONB `documents` table.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the migrations embedded from ./migrations/ (idempotent).
    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

async fn apply(conn: &mut PgConnection, op: &WriteOp) -> Result<(), StoreError> {
    match op {
        WriteOp::Create {
            collection,
            id,
            body,
        } => {
            let res = sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
                .bind(collection.as_str())
                .bind(id)
                .bind(body)
                .execute(&mut *conn)
                .await;
            match res {
                Ok(_) => Ok(()),
                Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                    Err(StoreError::Duplicate {
                        collection: *collection,
                        id: *id,
                    })
                }
                Err(e) => Err(e.into()),
            }
        }
        WriteOp::Update {
            collection,
            id,
            fields,
        } => {
            let res = sqlx::query(
                "UPDATE documents
                 SET body = body || $3, updated_at = NOW()
                 WHERE collection = $1 AND id = $2",
            )
            .bind(collection.as_str())
            .bind(id)
            .bind(Value::Object(fields.clone()))
            .execute(&mut *conn)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate {
                    collection: *collection,
                    id: *id,
                },
                e => e.into(),
            })?;
            if res.rows_affected() == 0 {
                return Err(StoreError::NotFound {
                    collection: *collection,
                    id: *id,
                });
            }
            Ok(())
        }
        WriteOp::Delete { collection, id } => {
            sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection.as_str())
                .bind(id)
                .execute(&mut *conn)
                .await?;
            Ok(())
        }
    }
}

impl DocumentStore for PgDocumentStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let docs = sqlx::query_scalar::<_, Value>(
            "SELECT body FROM documents WHERE collection = $1 ORDER BY created_at, id",
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(docs)
    }

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let docs = sqlx::query_scalar::<_, Value>(
            "SELECT body FROM documents
             WHERE collection = $1 AND body @> $2
             ORDER BY created_at, id",
        )
        .bind(collection.as_str())
        .bind(filter.clone().into_value())
        .fetch_all(&self.pool)
        .await?;
        Ok(docs)
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, StoreError> {
        let doc = sqlx::query_scalar::<_, Value>(
            "SELECT body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc)
    }

    async fn create(&self, collection: Collection, id: Uuid, body: Value) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        apply(
            &mut conn,
            &WriteOp::Create {
                collection,
                id,
                body,
            },
        )
        .await
    }

    async fn update_fields(
        &self,
        collection: Collection,
        id: Uuid,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        apply(
            &mut conn,
            &WriteOp::Update {
                collection,
                id,
                fields,
            },
        )
        .await
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        apply(&mut conn, &WriteOp::Delete { collection, id }).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for op in batch.ops() {
            apply(&mut tx, op).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
