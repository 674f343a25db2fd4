//! Exhaustive listing of a collection across continuation tokens.

use tracing::debug;

use crate::dao::{
    models::{Collection, FieldFilter, Record},
    record_store::{MAX_PAGE_SIZE, RecordStore},
    storage::{StorageError, StorageResult},
};

/// Fetch every record of `collection` matching `filter`, following continuation
/// tokens until the store reports no further page.
///
/// Each request asks for at most `page_size` records (capped at [`MAX_PAGE_SIZE`]).
/// The first failing page fails the whole listing; there is no retry.
pub async fn list_all(
    store: &dyn RecordStore,
    collection: Collection,
    filter: FieldFilter,
    page_size: usize,
) -> StorageResult<Vec<Record>> {
    let limit = page_size.clamp(1, MAX_PAGE_SIZE);
    let mut records = Vec::new();
    let mut page_token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = store
            .list(collection, filter.clone(), page_token.clone(), limit)
            .await?;
        pages += 1;
        records.extend(page.records);

        match page.next_page_token {
            Some(next) if page_token.as_deref() == Some(next.as_str()) => {
                return Err(StorageError::rejected(format!(
                    "listing `{collection}` returned the same continuation token twice"
                )));
            }
            Some(next) => page_token = Some(next),
            None => break,
        }
    }

    debug!(
        %collection,
        field = filter.field,
        value = %filter.value,
        pages,
        count = records.len(),
        "listed collection"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use futures::future::BoxFuture;
    use serde_json::{Map, Value};

    use super::*;
    use crate::{
        dao::models::{GAME_ID, Page, RecordId},
        services::cascade::test_support::{RecordingStore, StoreEvent},
    };

    #[tokio::test]
    async fn follows_continuation_tokens_until_exhausted() {
        let store = RecordingStore::new();
        for id in ["pt-1", "pt-2", "pt-3"] {
            store.seed(Collection::PlayTimeRecords, id, &[(GAME_ID, "g1")]);
        }
        store.seed(Collection::PlayTimeRecords, "pt-x", &[(GAME_ID, "g2")]);

        let records = list_all(
            &store,
            Collection::PlayTimeRecords,
            FieldFilter::eq(GAME_ID, "g1"),
            2,
        )
        .await
        .unwrap();

        let ids = records.iter().map(|r| r.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, ["pt-1", "pt-2", "pt-3"]);

        let lists = store.list_calls(Collection::PlayTimeRecords);
        assert_eq!(lists.len(), 2);
        assert_eq!(
            lists[0],
            StoreEvent::List {
                collection: Collection::PlayTimeRecords,
                field: GAME_ID,
                value: "g1".into(),
                page_token: None,
                limit: 2,
            }
        );
        assert!(matches!(
            &lists[1],
            StoreEvent::List { page_token: Some(token), .. } if token == "pt-2"
        ));
    }

    #[tokio::test]
    async fn caps_requests_at_store_maximum() {
        let store = RecordingStore::new();
        list_all(&store, Collection::Goals, FieldFilter::eq(GAME_ID, "g1"), 50_000)
            .await
            .unwrap();

        assert!(matches!(
            store.list_calls(Collection::Goals).as_slice(),
            [StoreEvent::List { limit: MAX_PAGE_SIZE, .. }]
        ));
    }

    #[tokio::test]
    async fn page_failure_fails_the_listing() {
        let store = RecordingStore::new();
        store.seed(Collection::Goals, "goal-1", &[(GAME_ID, "g1")]);
        store.fail_lists_of(Collection::Goals);

        let result = list_all(&store, Collection::Goals, FieldFilter::eq(GAME_ID, "g1"), 10).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn empty_collection_takes_one_call() {
        let store = RecordingStore::new();
        let records = list_all(&store, Collection::Substitutions, FieldFilter::eq(GAME_ID, "g1"), 10)
            .await
            .unwrap();
        assert!(records.is_empty());
        assert_eq!(store.list_calls(Collection::Substitutions).len(), 1);
    }

    /// Answers every page request with the same token.
    struct StuckStore;

    impl RecordStore for StuckStore {
        fn list(
            &self,
            _collection: Collection,
            _filter: FieldFilter,
            _page_token: Option<String>,
            _limit: usize,
        ) -> BoxFuture<'static, StorageResult<Page>> {
            Box::pin(async {
                Ok(Page {
                    records: vec![Record::new("r1")],
                    next_page_token: Some("again".into()),
                })
            })
        }

        fn delete(&self, _: Collection, _: RecordId) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn update(
            &self,
            _: Collection,
            _: RecordId,
            _: Map<String, Value>,
        ) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn find(&self, _: Collection, _: RecordId) -> BoxFuture<'static, StorageResult<Option<Record>>> {
            Box::pin(async { Ok(None) })
        }

        fn save(&self, _: Collection, _: Record) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn repeated_token_is_an_error() {
        let result = list_all(&StuckStore, Collection::Goals, FieldFilter::eq(GAME_ID, "g1"), 1).await;

        assert!(matches!(result, Err(StorageError::Rejected { .. })));
    }
}
