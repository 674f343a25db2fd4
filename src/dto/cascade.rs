use std::{collections::BTreeMap, time::SystemTime};

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::Collection,
    dto::format_system_time,
    services::cascade::CascadeReport,
};

/// Outcome of a cascade delete as returned by the `DELETE` routes.
///
/// Dependent cleanup is best effort: a `200` only guarantees the root record is gone,
/// `failed` and `failed_listings` tell what was left behind.
#[derive(Debug, Serialize, ToSchema)]
pub struct CascadeReportResponse {
    /// Collection of the deleted root (`games`, `teams`, `players`, `formations`).
    pub root: String,
    /// Identifier of the deleted root.
    pub id: String,
    /// Records removed per collection, root included.
    pub deleted: BTreeMap<String, usize>,
    /// Deletes that failed per collection.
    pub failed: BTreeMap<String, usize>,
    /// Total records removed.
    pub total_deleted: usize,
    /// Goals kept with their `assistId` cleared.
    pub assists_cleared: usize,
    /// Goals whose `assistId` could not be cleared.
    pub assist_clear_failures: usize,
    /// Collections that could not be listed; their records were not examined.
    pub failed_listings: Vec<String>,
    /// RFC 3339 completion timestamp.
    pub finished_at: String,
}

impl From<CascadeReport> for CascadeReportResponse {
    fn from(report: CascadeReport) -> Self {
        Self {
            root: report.root.to_string(),
            id: report.root_id.clone(),
            total_deleted: report.total_deleted(),
            deleted: counts_by_name(&report.deleted),
            failed: counts_by_name(&report.failed),
            assists_cleared: report.assists_cleared,
            assist_clear_failures: report.assist_clear_failures,
            failed_listings: report
                .failed_listings
                .iter()
                .map(ToString::to_string)
                .collect(),
            finished_at: format_system_time(SystemTime::now()),
        }
    }
}

fn counts_by_name(counts: &BTreeMap<Collection, usize>) -> BTreeMap<String, usize> {
    counts
        .iter()
        .map(|(collection, count)| (collection.as_str().to_owned(), *count))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dao::{
            models::{GAME_ID, Record},
            record_store::memory::InMemoryRecordStore,
        },
        services::cascade::{CascadeService, CascadeSettings},
    };

    #[tokio::test]
    async fn report_is_keyed_by_collection_name() {
        let store = InMemoryRecordStore::new();
        store.insert(Collection::Games, Record::new("g1"));
        store.insert(
            Collection::GameNotes,
            Record::new("note-1").with_field(GAME_ID, "g1"),
        );
        let service = CascadeService::new(Arc::new(store), CascadeSettings::default());

        let report = service.delete_game_cascade("g1").await.unwrap();
        let response = CascadeReportResponse::from(report);

        assert_eq!(response.root, "games");
        assert_eq!(response.id, "g1");
        assert_eq!(response.total_deleted, 2);
        assert_eq!(response.deleted.get("gameNotes"), Some(&1));
        assert_eq!(response.deleted.get("games"), Some(&1));
        assert!(response.failed.is_empty());
        assert!(response.finished_at.contains('T'));
    }
}
