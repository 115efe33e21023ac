pub mod memory;
pub mod postgres;

use std::future::Future;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// Named document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Companies,
    Buildings,
    MenuItems,
    CombinedMenus,
    ServiceStructures,
    MealPlanStructures,
    CompanyMenus,
    MenuUpdations,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Companies => "companies",
            Collection::Buildings => "buildings",
            Collection::MenuItems => "menu_items",
            Collection::CombinedMenus => "combined_menus",
            Collection::ServiceStructures => "service_structures",
            Collection::MealPlanStructures => "meal_plan_structures",
            Collection::CompanyMenus => "company_menus",
            Collection::MenuUpdations => "menu_updations",
        }
    }

    /// Collections holding at most one active document per (companyId, buildingId).
    pub fn one_active_per_building(&self) -> bool {
        matches!(self, Collection::ServiceStructures | Collection::MealPlanStructures)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{collection} document {id} not found")]
    NotFound { collection: Collection, id: Uuid },

    #[error("{collection} document {id} already exists")]
    Duplicate { collection: Collection, id: Uuid },

    #[error("Write to {0} rejected by the store")]
    Rejected(Collection),
}

/// Top-level field equality filter, e.g. `{"companyId": "...", "status": "active"}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Map<String, Value>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Create {
        collection: Collection,
        id: Uuid,
        body: Value,
    },
    Update {
        collection: Collection,
        id: Uuid,
        fields: Map<String, Value>,
    },
    Delete {
        collection: Collection,
        id: Uuid,
    },
}

/// Writes committed together: either all of them land or none do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create<T: Serialize>(
        &mut self,
        collection: Collection,
        id: Uuid,
        document: &T,
    ) -> Result<&mut Self, StoreError> {
        let body = serde_json::to_value(document)?;
        self.ops.push(WriteOp::Create {
            collection,
            id,
            body,
        });
        Ok(self)
    }

    pub fn update(&mut self, collection: Collection, id: Uuid, fields: Map<String, Value>) -> &mut Self {
        self.ops.push(WriteOp::Update {
            collection,
            id,
            fields,
        });
        self
    }

    pub fn delete(&mut self, collection: Collection, id: Uuid) -> &mut Self {
        self.ops.push(WriteOp::Delete { collection, id });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Generic document store collaborator. Every document is a JSON object
/// carrying its own `id`.
pub trait DocumentStore: Clone + Send + Sync + 'static {
    /// Cheap liveness check for the health route.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn list(&self, collection: Collection)
        -> impl Future<Output = Result<Vec<Value>, StoreError>> + Send;

    fn find(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<Value>, StoreError>> + Send;

    fn get(
        &self,
        collection: Collection,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Value>, StoreError>> + Send;

    fn create(
        &self,
        collection: Collection,
        id: Uuid,
        body: Value,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Merge `fields` into the top level of an existing document.
    fn update_fields(
        &self,
        collection: Collection,
        id: Uuid,
        fields: Map<String, Value>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete(
        &self,
        collection: Collection,
        id: Uuid,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn commit(&self, batch: WriteBatch) -> impl Future<Output = Result<(), StoreError>> + Send;
}

pub fn decode<T: DeserializeOwned>(documents: Vec<Value>) -> Result<Vec<T>, StoreError> {
    documents
        .into_iter()
        .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
        .collect()
}

pub async fn fetch_all<T: DeserializeOwned, S: DocumentStore>(
    store: &S,
    collection: Collection,
) -> Result<Vec<T>, StoreError> {
    decode(store.list(collection).await?)
}

pub async fn fetch_where<T: DeserializeOwned, S: DocumentStore>(
    store: &S,
    collection: Collection,
    filter: &Filter,
) -> Result<Vec<T>, StoreError> {
    decode(store.find(collection, filter).await?)
}

pub async fn fetch_one<T: DeserializeOwned, S: DocumentStore>(
    store: &S,
    collection: Collection,
    id: Uuid,
) -> Result<Option<T>, StoreError> {
    match store.get(collection, id).await? {
        Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
        None => Ok(None),
    }
}

pub async fn insert<T: Serialize, S: DocumentStore>(
    store: &S,
    collection: Collection,
    id: Uuid,
    document: &T,
) -> Result<(), StoreError> {
    let body = serde_json::to_value(document)?;
    store.create(collection, id, body).await
}

/// Serialize a typed record into the field map of a partial update.
pub fn fields<T: Serialize>(value: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            Ok(map)
        }
    }
}
