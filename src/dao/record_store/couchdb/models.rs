use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dao::{
    models::{Collection, FieldFilter, Record, RecordId},
    record_store::couchdb::error::{CouchDaoError, CouchResult},
};

pub const KEY_SEPARATOR: &str = "::";
pub const END_SUFFIX: &str = "\u{ffff}";

/// Every collection shares one CouchDB database; documents are namespaced by an
/// `<collection>::` id prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchRecordDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CouchRecordDocument {
    pub fn from_record(collection: Collection, record: Record, rev: Option<String>) -> Self {
        Self {
            id: record_doc_id(collection, &record.id),
            rev,
            fields: record.fields,
        }
    }

    pub fn try_into_record(self, collection: Collection) -> CouchResult<Record> {
        Ok(Record {
            id: extract_record_id(collection, &self.id)?,
            fields: self.fields,
        })
    }
}

/// Minimal projection used to read a document revision.
#[derive(Debug, Deserialize)]
pub struct RevisionOnly {
    #[serde(rename = "_rev")]
    pub rev: String,
}

/// Body of a Mango `_find` query.
#[derive(Debug, Serialize)]
pub struct FindRequest {
    pub selector: Map<String, Value>,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookmark: Option<String>,
}

impl FindRequest {
    /// Select documents of `collection` whose `filter.field` equals `filter.value`.
    pub fn new(collection: Collection, filter: &FieldFilter, limit: usize) -> Self {
        let prefix = collection_prefix(collection);
        let mut id_range = Map::new();
        id_range.insert("$gt".into(), Value::String(prefix.clone()));
        id_range.insert("$lt".into(), Value::String(format!("{prefix}{END_SUFFIX}")));

        let mut selector = Map::new();
        selector.insert("_id".into(), Value::Object(id_range));
        selector.insert(filter.field.into(), Value::String(filter.value.clone()));

        Self {
            selector,
            limit,
            bookmark: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FindResponse {
    pub docs: Vec<CouchRecordDocument>,
    #[serde(default)]
    pub bookmark: Option<String>,
}

pub fn collection_prefix(collection: Collection) -> String {
    format!("{}{}", collection.as_str(), KEY_SEPARATOR)
}

pub fn record_doc_id(collection: Collection, id: &str) -> String {
    format!("{}{}{}", collection.as_str(), KEY_SEPARATOR, id)
}

pub fn extract_record_id(collection: Collection, doc_id: &str) -> CouchResult<RecordId> {
    doc_id
        .strip_prefix(collection.as_str())
        .and_then(|rest| rest.strip_prefix(KEY_SEPARATOR))
        .map(str::to_owned)
        .ok_or_else(|| CouchDaoError::InvalidDocId {
            doc_id: doc_id.to_string(),
            expected: collection.as_str(),
        })
}
