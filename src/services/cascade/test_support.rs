//! Recording, fault-injecting store wrapper for cascade tests.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::dao::{
    models::{Collection, FieldFilter, Page, Record, RecordId},
    record_store::{RecordStore, memory::InMemoryRecordStore},
    storage::{StorageError, StorageResult},
};

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    List {
        collection: Collection,
        field: &'static str,
        value: String,
        page_token: Option<String>,
        limit: usize,
    },
    DeleteIssued {
        collection: Collection,
        id: RecordId,
    },
    DeleteSettled {
        collection: Collection,
        id: RecordId,
        ok: bool,
    },
    Update {
        collection: Collection,
        id: RecordId,
        fields: Map<String, Value>,
    },
}

#[derive(Clone, Default)]
pub struct RecordingStore {
    inner: InMemoryRecordStore,
    events: Arc<Mutex<Vec<StoreEvent>>>,
    failing_deletes: Arc<Mutex<HashSet<(Collection, RecordId)>>>,
    failing_lists: Arc<Mutex<HashSet<Collection>>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryRecordStore {
        &self.inner
    }

    pub fn seed(&self, collection: Collection, id: &str, fields: &[(&str, &str)]) {
        let record = fields
            .iter()
            .fold(Record::new(id), |record, (name, value)| {
                record.with_field(name, *value)
            });
        self.inner.insert(collection, record);
    }

    pub fn fail_delete_of(&self, collection: Collection, id: &str) {
        self.failing_deletes
            .lock()
            .unwrap()
            .insert((collection, id.to_owned()));
    }

    pub fn fail_lists_of(&self, collection: Collection) {
        self.failing_lists.lock().unwrap().insert(collection);
    }

    pub fn events(&self) -> Vec<StoreEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Deletes in the order they were issued.
    pub fn deletes(&self) -> Vec<(Collection, RecordId)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                StoreEvent::DeleteIssued { collection, id } => Some((collection, id)),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<(Collection, RecordId, Map<String, Value>)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                StoreEvent::Update {
                    collection,
                    id,
                    fields,
                } => Some((collection, id, fields)),
                _ => None,
            })
            .collect()
    }

    pub fn list_calls(&self, collection: Collection) -> Vec<StoreEvent> {
        self.events()
            .into_iter()
            .filter(|event| matches!(event, StoreEvent::List { collection: c, .. } if *c == collection))
            .collect()
    }

    pub fn position(&self, predicate: impl Fn(&StoreEvent) -> bool) -> Option<usize> {
        self.events().iter().position(predicate)
    }

    pub fn settled_at(&self, collection: Collection, id: &str) -> Option<usize> {
        self.position(|event| {
            matches!(event, StoreEvent::DeleteSettled { collection: c, id: i, .. } if *c == collection && i == id)
        })
    }

    pub fn issued_at(&self, collection: Collection, id: &str) -> Option<usize> {
        self.position(|event| {
            matches!(event, StoreEvent::DeleteIssued { collection: c, id: i } if *c == collection && i == id)
        })
    }

    fn push(&self, event: StoreEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl RecordStore for RecordingStore {
    fn list(
        &self,
        collection: Collection,
        filter: FieldFilter,
        page_token: Option<String>,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Page>> {
        let store = self.clone();
        Box::pin(async move {
            store.push(StoreEvent::List {
                collection,
                field: filter.field,
                value: filter.value.clone(),
                page_token: page_token.clone(),
                limit,
            });
            if store.failing_lists.lock().unwrap().contains(&collection) {
                return Err(StorageError::rejected(format!("injected list failure on `{collection}`")));
            }
            store.inner.list(collection, filter, page_token, limit).await
        })
    }

    fn delete(&self, collection: Collection, id: RecordId) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.push(StoreEvent::DeleteIssued {
                collection,
                id: id.clone(),
            });
            tokio::task::yield_now().await;

            let injected = store
                .failing_deletes
                .lock()
                .unwrap()
                .contains(&(collection, id.clone()));
            let outcome = if injected {
                Err(StorageError::rejected(format!("injected delete failure on `{id}`")))
            } else {
                store.inner.delete(collection, id.clone()).await
            };

            store.push(StoreEvent::DeleteSettled {
                collection,
                id,
                ok: outcome.is_ok(),
            });
            outcome
        })
    }

    fn update(
        &self,
        collection: Collection,
        id: RecordId,
        fields: Map<String, Value>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.push(StoreEvent::Update {
                collection,
                id: id.clone(),
                fields: fields.clone(),
            });
            store.inner.update(collection, id, fields).await
        })
    }

    fn find(
        &self,
        collection: Collection,
        id: RecordId,
    ) -> BoxFuture<'static, StorageResult<Option<Record>>> {
        self.inner.find(collection, id)
    }

    fn save(&self, collection: Collection, record: Record) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.save(collection, record)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}
