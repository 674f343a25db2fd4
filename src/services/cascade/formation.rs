use crate::dao::models::{Collection, FORMATION_ID, FieldFilter};

use super::{CascadeContext, CascadeError, CascadeReport};

/// Remove a formation and its positions.
///
/// Teams keep whatever `formationId` they hold; readers treat a formation that no
/// longer resolves as "no formation assigned".
pub(super) async fn delete_formation(
    ctx: &CascadeContext,
    formation_id: &str,
    report: &mut CascadeReport,
) -> Result<(), CascadeError> {
    let positions = ctx
        .list_all(
            Collection::FormationPositions,
            FieldFilter::eq(FORMATION_ID, formation_id),
        )
        .await;
    let positions = report.collect_listing(Collection::FormationPositions, positions);

    let positions_done = ctx
        .delete_all(Collection::FormationPositions, &positions)
        .await;
    report.record_deletes(Collection::FormationPositions, positions_done);

    ctx.delete_root(Collection::Formations, formation_id, report)
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        dao::models::{Collection, FORMATION_ID},
        services::cascade::{CascadeService, CascadeSettings, test_support::RecordingStore},
    };

    fn service(store: &RecordingStore, page_size: usize) -> CascadeService {
        CascadeService::new(
            Arc::new(store.clone()),
            CascadeSettings {
                batch_size: 3,
                page_size,
            },
        )
    }

    #[tokio::test]
    async fn formation_without_positions_issues_exactly_one_delete() {
        let store = RecordingStore::new();
        store.seed(Collection::Formations, "f1", &[]);

        service(&store, 100).delete_formation_cascade("f1").await.unwrap();

        assert_eq!(
            store.deletes(),
            vec![(Collection::Formations, "f1".to_owned())]
        );
    }

    #[tokio::test]
    async fn positions_across_pages_are_removed_before_the_formation() {
        let store = RecordingStore::new();
        store.seed(Collection::Formations, "f1", &[]);
        for slot in 0..11 {
            store.seed(
                Collection::FormationPositions,
                &format!("pos-{slot:02}"),
                &[(FORMATION_ID, "f1")],
            );
        }

        let report = service(&store, 4)
            .delete_formation_cascade("f1")
            .await
            .unwrap();

        assert_eq!(report.deleted_in(Collection::FormationPositions), 11);
        assert_eq!(store.list_calls(Collection::FormationPositions).len(), 3);
        assert_eq!(store.inner().len(Collection::FormationPositions), 0);

        let root_issued = store.issued_at(Collection::Formations, "f1").unwrap();
        let last_position = store
            .settled_at(Collection::FormationPositions, "pos-10")
            .unwrap();
        assert!(last_position < root_issued);
    }

    #[tokio::test]
    async fn teams_keep_their_dangling_formation_reference() {
        let store = RecordingStore::new();
        store.seed(Collection::Formations, "f1", &[]);
        store.seed(Collection::Teams, "t1", &[(FORMATION_ID, "f1")]);

        service(&store, 100).delete_formation_cascade("f1").await.unwrap();

        let team = store.inner().get(Collection::Teams, "t1").unwrap();
        assert_eq!(team.field_str(FORMATION_ID), Some("f1"));
        assert!(store.updates().is_empty());
    }

    #[tokio::test]
    async fn absent_formation_is_not_an_error() {
        let store = RecordingStore::new();

        let report = service(&store, 100)
            .delete_formation_cascade("missing")
            .await
            .unwrap();

        assert_eq!(report.deleted_in(Collection::Formations), 1);
    }
}
