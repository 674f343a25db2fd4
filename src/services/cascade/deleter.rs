//! Bounded, settle-all batch deletion.

use std::future::Future;

use futures::future::join_all;
use tracing::warn;

use crate::dao::{
    models::{Collection, Record},
    record_store::RecordStore,
    storage::StorageResult,
};

/// Outcome counters of a batch of independent writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTally {
    /// Writes that completed.
    pub succeeded: usize,
    /// Writes that returned an error.
    pub failed: usize,
}

/// Run `op` over `records` in consecutive chunks of `batch_size`.
///
/// All operations of a chunk run concurrently and are awaited whether they fail or
/// not; the next chunk starts only once the previous one settled, so at most
/// `batch_size` operations are in flight.
pub(crate) async fn settle_in_batches<'a, F, Fut>(
    records: &'a [Record],
    batch_size: usize,
    op: F,
) -> Vec<(&'a Record, StorageResult<()>)>
where
    F: Fn(&'a Record) -> Fut,
    Fut: Future<Output = StorageResult<()>>,
{
    let mut outcomes = Vec::with_capacity(records.len());
    for chunk in records.chunks(batch_size.max(1)) {
        let settled = join_all(chunk.iter().map(&op)).await;
        outcomes.extend(chunk.iter().zip(settled));
    }
    outcomes
}

/// Delete `records` from `collection`, never failing as a whole.
///
/// This is the single place where cleanup failures are swallowed: each failed delete
/// is logged and counted, and the caller carries on. Orphans left behind are inert
/// and unreachable once their parent is gone.
pub async fn best_effort_delete_all(
    store: &dyn RecordStore,
    collection: Collection,
    records: &[Record],
    batch_size: usize,
) -> BatchTally {
    let outcomes = settle_in_batches(records, batch_size, |record| {
        store.delete(collection, record.id.clone())
    })
    .await;

    let mut tally = BatchTally::default();
    for (record, outcome) in outcomes {
        match outcome {
            Ok(()) => tally.succeeded += 1,
            Err(err) => {
                tally.failed += 1;
                warn!(%collection, id = %record.id, error = %err, "dependent record delete failed");
            }
        }
    }
    tally
}
