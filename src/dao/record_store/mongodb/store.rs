use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection as MongoCollection, Database,
    bson::{Document, doc},
    options::IndexOptions,
};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{MongoRecordDocument, doc_id, set_document},
};
use crate::dao::{
    models::{
        ASSIST_ID, Collection, FORMATION_ID, FieldFilter, GAME_ID, GAME_PLAN_ID, PLAYER_ID, Page,
        Record, RecordId, SCORER_ID, TEAM_ID,
    },
    record_store::{MAX_PAGE_SIZE, RecordStore},
    storage::StorageResult,
};

/// Foreign-key fields that cascades filter on, indexed at connection time.
const INDEXED_FIELDS: &[(Collection, &str)] = &[
    (Collection::Games, TEAM_ID),
    (Collection::TeamRosters, TEAM_ID),
    (Collection::TeamRosters, PLAYER_ID),
    (Collection::TeamInvitations, TEAM_ID),
    (Collection::PlayTimeRecords, GAME_ID),
    (Collection::PlayTimeRecords, PLAYER_ID),
    (Collection::Goals, GAME_ID),
    (Collection::Goals, SCORER_ID),
    (Collection::Goals, ASSIST_ID),
    (Collection::GameNotes, GAME_ID),
    (Collection::GameNotes, PLAYER_ID),
    (Collection::Substitutions, GAME_ID),
    (Collection::LineupAssignments, GAME_ID),
    (Collection::PlayerAvailabilities, GAME_ID),
    (Collection::PlayerAvailabilities, PLAYER_ID),
    (Collection::GamePlans, GAME_ID),
    (Collection::PlannedRotations, GAME_PLAN_ID),
    (Collection::FormationPositions, FORMATION_ID),
];

/// MongoDB-backed record store; each [`Collection`] maps to a Mongo collection of
/// the same name.
#[derive(Clone)]
pub struct MongoRecordStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: RwLock<Database>,
    config: MongoConfig,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.database.read().await.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (_client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        *self.database.write().await = database;
        Ok(())
    }
}

impl MongoRecordStore {
    /// Establish a connection to MongoDB and ensure foreign-key indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (_client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let store = Self {
            inner: Arc::new(MongoInner {
                database: RwLock::new(database),
                config,
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        for &(collection, field) in INDEXED_FIELDS {
            let mut keys = Document::new();
            keys.insert(field, 1);
            let index = mongodb::IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(format!("{}_{}_idx", collection.as_str(), field)))
                        .build(),
                )
                .build();

            self.collection(collection)
                .await
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    field,
                    source,
                })?;
        }
        Ok(())
    }

    async fn collection(&self, collection: Collection) -> MongoCollection<MongoRecordDocument> {
        let database = self.inner.database.read().await;
        database.collection::<MongoRecordDocument>(collection.as_str())
    }

    async fn list(
        &self,
        collection: Collection,
        filter: FieldFilter,
        page_token: Option<String>,
        limit: usize,
    ) -> MongoResult<Page> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let mut query = Document::new();
        query.insert(filter.field, filter.value.as_str());
        if let Some(token) = page_token {
            query.insert("_id", doc! { "$gt": token });
        }

        let list_error = |source: mongodb::error::Error| MongoDaoError::ListRecords {
            collection,
            field: filter.field,
            value: filter.value.clone(),
            source,
        };

        let documents: Vec<MongoRecordDocument> = self
            .collection(collection)
            .await
            .find(query)
            .sort(doc! { "_id": 1 })
            .limit(limit as i64)
            .await
            .map_err(list_error)?
            .try_collect()
            .await
            .map_err(list_error)?;

        // A full page may be followed by more matches; the next query resumes after
        // the last id seen.
        let next_page_token = if documents.len() == limit {
            documents.last().map(|document| document.id.clone())
        } else {
            None
        };

        Ok(Page {
            records: documents.into_iter().map(Record::from).collect(),
            next_page_token,
        })
    }

    async fn delete(&self, collection: Collection, id: RecordId) -> MongoResult<()> {
        self.collection(collection)
            .await
            .delete_one(doc_id(&id))
            .await
            .map_err(|source| MongoDaoError::DeleteRecord {
                collection,
                id,
                source,
            })?;
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        id: RecordId,
        fields: Map<String, Value>,
    ) -> MongoResult<()> {
        let update = set_document(&fields).map_err(|reason| MongoDaoError::EncodeFields {
            collection,
            id: id.clone(),
            reason,
        })?;
        let result = self
            .collection(collection)
            .await
            .update_one(doc_id(&id), update)
            .await
            .map_err(|source| MongoDaoError::UpdateRecord {
                collection,
                id: id.clone(),
                source,
            })?;

        if result.matched_count == 0 {
            return Err(MongoDaoError::MissingRecord { collection, id });
        }
        Ok(())
    }

    async fn find(&self, collection: Collection, id: RecordId) -> MongoResult<Option<Record>> {
        let document = self
            .collection(collection)
            .await
            .find_one(doc_id(&id))
            .await
            .map_err(|source| MongoDaoError::LoadRecord {
                collection,
                id,
                source,
            })?;
        Ok(document.map(Record::from))
    }

    async fn save(&self, collection: Collection, record: Record) -> MongoResult<()> {
        let id = record.id.clone();
        let document = MongoRecordDocument::from(record);
        self.collection(collection)
            .await
            .replace_one(doc_id(&id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveRecord {
                collection,
                id,
                source,
            })?;
        Ok(())
    }
}

impl RecordStore for MongoRecordStore {
    fn list(
        &self,
        collection: Collection,
        filter: FieldFilter,
        page_token: Option<String>,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Page>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list(collection, filter, page_token, limit)
                .await
                .map_err(Into::into)
        })
    }

    fn delete(&self, collection: Collection, id: RecordId) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete(collection, id).await.map_err(Into::into) })
    }

    fn update(
        &self,
        collection: Collection,
        id: RecordId,
        fields: Map<String, Value>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update(collection, id, fields)
                .await
                .map_err(Into::into)
        })
    }

    fn find(
        &self,
        collection: Collection,
        id: RecordId,
    ) -> BoxFuture<'static, StorageResult<Option<Record>>> {
        let store = self.clone();
        Box::pin(async move { store.find(collection, id).await.map_err(Into::into) })
    }

    fn save(&self, collection: Collection, record: Record) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save(collection, record).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
