use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::dao::{
    models::{Collection, FieldFilter, Page, Record, RecordId},
    record_store::{MAX_PAGE_SIZE, RecordStore},
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{CouchRecordDocument, FindRequest, FindResponse, RevisionOnly, record_doc_id},
};

const FIND: &str = "_find";

/// Record store backed by a single CouchDB database.
#[derive(Clone)]
pub struct CouchRecordStore {
    client: Client,
    database_url: Arc<Url>,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

impl CouchRecordStore {
    /// Establish a connection to CouchDB and ensure the database exists.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let store = Self::from_config(config)?;
        store.ensure_database().await?;
        Ok(store)
    }

    fn from_config(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let invalid_base = |reason: String| CouchDaoError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason,
        };
        let mut database_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|err| invalid_base(err.to_string()))?;
        database_url
            .path_segments_mut()
            .map_err(|()| invalid_base("URL cannot carry a path".into()))?
            .pop_if_empty()
            .push(&config.database);

        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        Ok(Self {
            client,
            database_url: Arc::new(database_url),
            database: Arc::from(config.database),
            auth,
        })
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    fn database_url(&self) -> Url {
        self.database_url.as_ref().clone()
    }

    /// URL of `segment` below the database, percent-encoded as a single path segment.
    fn document_url(&self, segment: &str) -> Url {
        let mut url = self.database_url();
        // The database URL was checked to be a base when the store was built.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(segment);
        }
        url
    }

    fn request(&self, method: Method, segment: &str) -> reqwest::RequestBuilder {
        self.with_auth(self.client.request(method, self.document_url(segment)))
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url();

        let response = self
            .with_auth(self.client.get(url.clone()))
            .send()
            .await
            .map_err(|source| CouchDaoError::DatabaseQuery {
                database: database.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .with_auth(self.client.put(url))
                    .send()
                    .await
                    .map_err(|source| CouchDaoError::DatabaseCreate {
                        database: database.clone(),
                        source,
                    })?;
                // 412: created concurrently by another instance.
                if create.status().is_success() || create.status() == StatusCode::PRECONDITION_FAILED
                {
                    Ok(())
                } else {
                    Err(CouchDaoError::DatabaseStatus {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::DatabaseStatus {
                database,
                status: other,
            }),
        }
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .request(Method::GET, doc_id)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json::<T>().await.map(Some).map_err(|source| {
                    CouchDaoError::DecodeResponse {
                        path: doc_id.to_string(),
                        source,
                    }
                })
            }
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn put_document<T>(&self, doc_id: &str, document: &T) -> CouchResult<()>
    where
        T: ?Sized + Serialize,
    {
        let response = self
            .request(Method::PUT, doc_id)
            .json(document)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(CouchDaoError::Conflict {
                doc_id: doc_id.to_string(),
            }),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn delete_document(&self, doc_id: &str) -> CouchResult<()> {
        let Some(current) = self.get_document::<RevisionOnly>(doc_id).await? else {
            return Ok(());
        };

        let response = self
            .request(Method::DELETE, doc_id)
            .query(&[("rev", current.rev.as_str())])
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: doc_id.to_string(),
                source,
            })?;

        match response.status() {
            // Gone between the revision read and the delete: same outcome.
            StatusCode::NOT_FOUND => Ok(()),
            StatusCode::CONFLICT => Err(CouchDaoError::Conflict {
                doc_id: doc_id.to_string(),
            }),
            status if status.is_success() => Ok(()),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn find_page(
        &self,
        collection: Collection,
        filter: FieldFilter,
        page_token: Option<String>,
        limit: usize,
    ) -> CouchResult<Page> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let mut query = FindRequest::new(collection, &filter, limit);
        query.bookmark = page_token;

        let response = self
            .request(Method::POST, FIND)
            .json(&query)
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: FIND.to_string(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: FIND.to_string(),
                status: response.status(),
            });
        }

        let payload = response.json::<FindResponse>().await.map_err(|source| {
            CouchDaoError::DecodeResponse {
                path: FIND.to_string(),
                source,
            }
        })?;

        // CouchDB always hands back a bookmark; only a full page can have a successor.
        let next_page_token = if payload.docs.len() == limit {
            payload.bookmark
        } else {
            None
        };

        let records = payload
            .docs
            .into_iter()
            .map(|doc| doc.try_into_record(collection))
            .collect::<CouchResult<Vec<_>>>()?;

        Ok(Page {
            records,
            next_page_token,
        })
    }

    async fn merge_document(
        &self,
        collection: Collection,
        id: RecordId,
        fields: Map<String, Value>,
    ) -> CouchResult<()> {
        let doc_id = record_doc_id(collection, &id);
        let mut document = self
            .get_document::<CouchRecordDocument>(&doc_id)
            .await?
            .ok_or_else(|| CouchDaoError::MissingDocument {
                doc_id: doc_id.clone(),
            })?;
        document.fields.extend(fields);
        self.put_document(&doc_id, &document).await
    }

    async fn save_record(&self, collection: Collection, record: Record) -> CouchResult<()> {
        let doc_id = record_doc_id(collection, &record.id);
        let rev = self
            .get_document::<RevisionOnly>(&doc_id)
            .await?
            .map(|current| current.rev);
        let document = CouchRecordDocument::from_record(collection, record, rev);
        self.put_document(&doc_id, &document).await
    }

    async fn find_record(&self, collection: Collection, id: RecordId) -> CouchResult<Option<Record>> {
        let doc_id = record_doc_id(collection, &id);
        self.get_document::<CouchRecordDocument>(&doc_id)
            .await?
            .map(|doc| doc.try_into_record(collection))
            .transpose()
    }
}

impl RecordStore for CouchRecordStore {
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
                .find_page(collection, filter, page_token, limit)
                .await
                .map_err(Into::into)
        })
    }

    fn delete(&self, collection: Collection, id: RecordId) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let doc_id = record_doc_id(collection, &id);
            store.delete_document(&doc_id).await.map_err(Into::into)
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
            store
                .merge_document(collection, id, fields)
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
        Box::pin(async move { store.find_record(collection, id).await.map_err(Into::into) })
    }

    fn save(&self, collection: Collection, record: Record) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_record(collection, record).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url();
            let builder = store.with_auth(store.client.get(url.clone()));

            let response = builder
                .send()
                .await
                .map_err(|source| CouchDaoError::RequestSend {
                    path: url.to_string(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url.to_string(),
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ensure_database().await.map_err(Into::into) })
    }
}
