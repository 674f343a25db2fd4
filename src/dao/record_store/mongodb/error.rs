use mongodb::error::Error as MongoError;
use thiserror::Error;

use crate::dao::models::{Collection, RecordId};

/// Result alias for MongoDB record store operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures raised while talking to MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index on `{field}` for collection `{collection}`")]
    EnsureIndex {
        collection: Collection,
        field: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to list `{collection}` where `{field}` = `{value}`")]
    ListRecords {
        collection: Collection,
        field: &'static str,
        value: RecordId,
        #[source]
        source: MongoError,
    },
    #[error("failed to load record `{id}` from `{collection}`")]
    LoadRecord {
        collection: Collection,
        id: RecordId,
        #[source]
        source: MongoError,
    },
    #[error("failed to save record `{id}` into `{collection}`")]
    SaveRecord {
        collection: Collection,
        id: RecordId,
        #[source]
        source: MongoError,
    },
    #[error("failed to update record `{id}` in `{collection}`")]
    UpdateRecord {
        collection: Collection,
        id: RecordId,
        #[source]
        source: MongoError,
    },
    #[error("fields for record `{id}` in `{collection}` have no BSON form: {reason}")]
    EncodeFields {
        collection: Collection,
        id: RecordId,
        reason: String,
    },
    #[error("record `{id}` not found in `{collection}`")]
    MissingRecord {
        collection: Collection,
        id: RecordId,
    },
    #[error("failed to delete record `{id}` from `{collection}`")]
    DeleteRecord {
        collection: Collection,
        id: RecordId,
        #[source]
        source: MongoError,
    },
}
