//! Weak-reference clearing: the referencing record survives, only the field is nulled.

use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    dao::{
        models::{Collection, Record},
        record_store::RecordStore,
        storage::StorageResult,
    },
    services::cascade::deleter::{BatchTally, settle_in_batches},
};

/// Set `field` of `record` to null with a partial update; every other field is kept.
pub async fn clear_reference(
    store: &dyn RecordStore,
    collection: Collection,
    record: &Record,
    field: &'static str,
) -> StorageResult<()> {
    let mut fields = Map::new();
    fields.insert(field.to_owned(), Value::Null);
    store.update(collection, record.id.clone(), fields).await
}

/// [`clear_reference`] over many records, batched and settle-all like deletions.
pub async fn clear_references(
    store: &dyn RecordStore,
    collection: Collection,
    records: &[Record],
    field: &'static str,
    batch_size: usize,
) -> BatchTally {
    let outcomes = settle_in_batches(records, batch_size, |record| {
        clear_reference(store, collection, record, field)
    })
    .await;

    let mut tally = BatchTally::default();
    for (record, outcome) in outcomes {
        match outcome {
            Ok(()) => tally.succeeded += 1,
            Err(err) => {
                tally.failed += 1;
                warn!(%collection, id = %record.id, field, error = %err, "reference clear failed");
            }
        }
    }
    tally
}
