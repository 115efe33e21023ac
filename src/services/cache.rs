//! Collection cache owned by the caller for the duration of one run
//! (a fan-out, a copy, a preview). Nothing is shared between runs.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::db::{decode, Collection, DocumentStore, StoreError};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.lock().map(|now| *now).unwrap_or_else(|e| *e.into_inner())
    }
}

struct Entry {
    fetched_at: DateTime<Utc>,
    documents: Vec<Value>,
}

pub struct RunCache<C: Clock = SystemClock> {
    clock: C,
    ttl: Duration,
    entries: Mutex<HashMap<Collection, Entry>>,
}

impl RunCache<SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(SystemClock, ttl)
    }
}

impl<C: Clock> RunCache<C> {
    pub fn with_clock(clock: C, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn cached(&self, collection: Collection) -> Option<Vec<Value>> {
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(&collection)?;
        if self.clock.now() - entry.fetched_at < self.ttl {
            Some(entry.documents.clone())
        } else {
            None
        }
    }

    /// Read a whole collection, hitting the store only when the cached copy
    /// is missing or older than the TTL.
    pub async fn list<S: DocumentStore>(
        &self,
        store: &S,
        collection: Collection,
    ) -> Result<Vec<Value>, StoreError> {
        if let Some(documents) = self.cached(collection) {
            return Ok(documents);
        }

        let documents = store.list(collection).await?;
        tracing::debug!("Cache refresh: {} ({} documents)", collection, documents.len());
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                collection,
                Entry {
                    fetched_at: self.clock.now(),
                    documents: documents.clone(),
                },
            );
        }
        Ok(documents)
    }

    pub async fn fetch_all<T: DeserializeOwned, S: DocumentStore>(
        &self,
        store: &S,
        collection: Collection,
    ) -> Result<Vec<T>, StoreError> {
        decode(self.list(store, collection).await?)
    }

    /// Drop a collection after this run wrote to it.
    pub fn invalidate(&self, collection: Collection) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&collection);
        }
    }
}
