use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Collection, DocumentStore, Filter, StoreError, WriteBatch, WriteOp};

type Documents = HashMap<Collection, Vec<(Uuid, Value)>>;

#[derive(Default)]
struct MemoryState {
    documents: Documents,
    rejections: Vec<(Collection, Filter)>,
}

/// In-process document store. Keeps insertion order per collection and
/// applies batches all-or-nothing.
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every future write into `collection` whose resulting document
    /// matches `filter` fail with `StoreError::Rejected`.
    pub async fn reject_writes(&self, collection: Collection, filter: Filter) {
        self.state.write().await.rejections.push((collection, filter));
    }

    pub async fn count(&self, collection: Collection) -> usize {
        self.state
            .read()
            .await
            .documents
            .get(&collection)
            .map_or(0, Vec::len)
    }
}

fn check_rejections(
    rejections: &[(Collection, Filter)],
    collection: Collection,
    body: &Value,
) -> Result<(), StoreError> {
    let rejected = rejections
        .iter()
        .any(|(c, filter)| *c == collection && filter.matches(body));
    if rejected {
        return Err(StoreError::Rejected(collection));
    }
    Ok(())
}

/// Another active document already holds the same company building.
fn active_slot_taken(
    docs: &[(Uuid, Value)],
    collection: Collection,
    id: Uuid,
    body: &Value,
) -> bool {
    if !collection.one_active_per_building() || body.get("status") != Some(&Value::from("active")) {
        return false;
    }
    docs.iter().any(|(other, doc)| {
        *other != id
            && doc.get("status") == body.get("status")
            && doc.get("companyId") == body.get("companyId")
            && doc.get("buildingId") == body.get("buildingId")
    })
}

fn apply(
    documents: &mut Documents,
    rejections: &[(Collection, Filter)],
    op: &WriteOp,
) -> Result<(), StoreError> {
    match op {
        WriteOp::Create {
            collection,
            id,
            body,
        } => {
            check_rejections(rejections, *collection, body)?;
            let docs = documents.entry(*collection).or_default();
            if docs.iter().any(|(existing, _)| existing == id)
                || active_slot_taken(docs, *collection, *id, body)
            {
                return Err(StoreError::Duplicate {
                    collection: *collection,
                    id: *id,
                });
            }
            docs.push((*id, body.clone()));
            Ok(())
        }
        WriteOp::Update {
            collection,
            id,
            fields,
        } => {
            let not_found = StoreError::NotFound {
                collection: *collection,
                id: *id,
            };
            let docs = documents.get_mut(collection).ok_or(not_found)?;
            let index = docs
                .iter()
                .position(|(existing, _)| existing == id)
                .ok_or(StoreError::NotFound {
                    collection: *collection,
                    id: *id,
                })?;

            let mut merged = docs[index].1.clone();
            if let Value::Object(map) = &mut merged {
                for (key, value) in fields {
                    map.insert(key.clone(), value.clone());
                }
            }
            check_rejections(rejections, *collection, &merged)?;
            if active_slot_taken(docs, *collection, *id, &merged) {
                return Err(StoreError::Duplicate {
                    collection: *collection,
                    id: *id,
                });
            }
            docs[index].1 = merged;
            Ok(())
        }
        WriteOp::Delete { collection, id } => {
            if let Some(docs) = documents.get_mut(collection) {
                docs.retain(|(existing, _)| existing != id);
            }
            Ok(())
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .get(&collection)
            .map(|docs| docs.iter().map(|(_, doc)| doc.clone()).collect())
            .unwrap_or_default())
    }

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .get(&collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, doc)| filter.matches(doc))
                    .map(|(_, doc)| doc.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, StoreError> {
        let state = self.state.read().await;
        Ok(state.documents.get(&collection).and_then(|docs| {
            docs.iter()
                .find(|(existing, _)| *existing == id)
                .map(|(_, doc)| doc.clone())
        }))
    }

    async fn create(&self, collection: Collection, id: Uuid, body: Value) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let MemoryState {
            documents,
            rejections,
        } = &mut *state;
        apply(
            documents,
            rejections,
            &WriteOp::Create {
                collection,
                id,
                body,
            },
        )
    }

    async fn update_fields(
        &self,
        collection: Collection,
        id: Uuid,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let MemoryState {
            documents,
            rejections,
        } = &mut *state;
        apply(
            documents,
            rejections,
            &WriteOp::Update {
                collection,
                id,
                fields,
            },
        )
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let MemoryState {
            documents,
            rejections,
        } = &mut *state;
        apply(documents, rejections, &WriteOp::Delete { collection, id })
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let mut staged = state.documents.clone();
        for op in batch.ops() {
            apply(&mut staged, &state.rejections, op)?;
        }
        state.documents = staged;
        Ok(())
    }
}
