pub mod backend;
#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::dao::models::{Collection, FieldFilter, Page, Record, RecordId};
use crate::dao::storage::StorageResult;

/// Largest page a single `list` call may return.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Abstraction over the schemaless persistence layer holding every collection.
///
/// Backends own their connection handles and hand out `'static` futures so callers
/// can drive several requests concurrently from a shared `Arc<dyn RecordStore>`.
pub trait RecordStore: Send + Sync {
    /// Return one page of records of `collection` matching `filter`.
    ///
    /// `limit` is capped at [`MAX_PAGE_SIZE`]. A `next_page_token` in the answer means
    /// more matching records may follow.
    fn list(
        &self,
        collection: Collection,
        filter: FieldFilter,
        page_token: Option<String>,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Page>>;
    /// Delete a record. Deleting an absent key succeeds.
    fn delete(&self, collection: Collection, id: RecordId) -> BoxFuture<'static, StorageResult<()>>;
    /// Merge `fields` into an existing record, leaving other fields untouched.
    fn update(
        &self,
        collection: Collection,
        id: RecordId,
        fields: Map<String, Value>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a single record by id.
    fn find(
        &self,
        collection: Collection,
        id: RecordId,
    ) -> BoxFuture<'static, StorageResult<Option<Record>>>;
    /// Insert or replace a whole record.
    fn save(&self, collection: Collection, record: Record) -> BoxFuture<'static, StorageResult<()>>;
    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Rebuild the underlying connection in place.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
