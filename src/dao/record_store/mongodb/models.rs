use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dao::models::{Record, RecordId};

/// Shape of a record inside a MongoDB collection: the record id lives in `_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRecordDocument {
    #[serde(rename = "_id")]
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl From<Record> for MongoRecordDocument {
    fn from(value: Record) -> Self {
        Self {
            id: value.id,
            fields: value.fields,
        }
    }
}

impl From<MongoRecordDocument> for Record {
    fn from(value: MongoRecordDocument) -> Self {
        Self {
            id: value.id,
            fields: value.fields,
        }
    }
}

pub fn doc_id(id: &str) -> Document {
    doc! {"_id": id}
}

/// Build a `$set` update document out of partial JSON fields.
///
/// Fails when a value has no BSON counterpart, e.g. an unsigned integer above
/// `i64::MAX`.
pub fn set_document(fields: &Map<String, Value>) -> Result<Document, String> {
    let set = mongodb::bson::serialize_to_document(fields).map_err(|err| err.to_string())?;
    Ok(doc! {"$set": set})
}

#[cfg(test)]
mod tests {
    use mongodb::bson::Bson;
    use serde_json::json;

    use super::*;

    #[test]
    fn set_document_keeps_nulls_and_nesting() {
        let Value::Object(fields) = json!({"assistId": null, "minute": 42, "meta": {"half": 2}})
        else {
            unreachable!()
        };

        let update = set_document(&fields).unwrap();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get("assistId"), Some(&Bson::Null));
        assert_eq!(set.get("minute"), Some(&Bson::Int64(42)));
        assert_eq!(
            set.get_document("meta").unwrap().get("half"),
            Some(&Bson::Int64(2))
        );
    }

    #[test]
    fn set_document_refuses_unsigned_overflow() {
        let Value::Object(fields) = json!({"counter": u64::MAX}) else {
            unreachable!()
        };

        assert!(set_document(&fields).is_err());
    }
}
