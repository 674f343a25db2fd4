//! Process-local record store used for development runs and tests.

use std::{collections::BTreeMap, ops::Bound, sync::Arc};

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::dao::{
    models::{Collection, FieldFilter, Page, Record, RecordId},
    record_store::{MAX_PAGE_SIZE, RecordStore},
    storage::{StorageError, StorageResult},
};

/// Record store keeping every collection in memory, ordered by record id.
///
/// Pages follow id order and the continuation token is the last id of the previous
/// page, so records created behind the cursor are not seen by a running listing.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    collections: Arc<DashMap<Collection, BTreeMap<RecordId, Record>>>,
}

impl InMemoryRecordStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record synchronously, replacing any record with the same id.
    pub fn insert(&self, collection: Collection, record: Record) {
        self.collections
            .entry(collection)
            .or_default()
            .insert(record.id.clone(), record);
    }

    /// Synchronous lookup.
    pub fn get(&self, collection: Collection, id: &str) -> Option<Record> {
        self.collections
            .get(&collection)
            .and_then(|entries| entries.get(id).cloned())
    }

    /// Number of records currently stored in `collection`.
    pub fn len(&self, collection: Collection) -> usize {
        self.collections
            .get(&collection)
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    /// Whether no collection holds any record.
    pub fn is_empty(&self) -> bool {
        self.collections.iter().all(|entry| entry.value().is_empty())
    }

    fn page(
        &self,
        collection: Collection,
        filter: &FieldFilter,
        page_token: Option<String>,
        limit: usize,
    ) -> Page {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let Some(entries) = self.collections.get(&collection) else {
            return Page::default();
        };

        let start = match page_token {
            Some(token) => Bound::Excluded(token),
            None => Bound::Unbounded,
        };
        let mut matching = entries
            .range::<RecordId, _>((start, Bound::Unbounded))
            .map(|(_, record)| record)
            .filter(|record| record.matches(filter));

        let records = matching.by_ref().take(limit).cloned().collect::<Vec<_>>();
        let next_page_token = if records.len() == limit && matching.next().is_some() {
            records.last().map(|record| record.id.clone())
        } else {
            None
        };

        Page {
            records,
            next_page_token,
        }
    }

    fn merge(
        &self,
        collection: Collection,
        id: &str,
        fields: Map<String, Value>,
    ) -> StorageResult<()> {
        let mut entries = self.collections.entry(collection).or_default();
        let record = entries.get_mut(id).ok_or_else(|| {
            StorageError::rejected(format!("record `{id}` not found in `{collection}`"))
        })?;
        record.fields.extend(fields);
        Ok(())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn list(
        &self,
        collection: Collection,
        filter: FieldFilter,
        page_token: Option<String>,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Page>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.page(collection, &filter, page_token, limit)) })
    }

    fn delete(&self, collection: Collection, id: RecordId) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            if let Some(mut entries) = store.collections.get_mut(&collection) {
                entries.remove(&id);
            }
            Ok(())
        })
    }

    fn update(
        &self,
        collection: Collection,
        id: RecordId,
        fields: Map<String, Value>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.merge(collection, &id, fields) })
    }

    fn find(
        &self,
        collection: Collection,
        id: RecordId,
    ) -> BoxFuture<'static, StorageResult<Option<Record>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.get(collection, &id)) })
    }

    fn save(&self, collection: Collection, record: Record) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.insert(collection, record);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
