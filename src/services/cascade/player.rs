use std::collections::HashSet;

use futures::join;

use crate::dao::models::{ASSIST_ID, Collection, FieldFilter, PLAYER_ID, SCORER_ID};

use super::{CascadeContext, CascadeError, CascadeReport};

/// Remove a player.
///
/// Goals the player scored are deleted with the player's other records. Goals the
/// player only assisted stay, with `assistId` cleared before any delete is issued.
pub(super) async fn delete_player(
    ctx: &CascadeContext,
    player_id: &str,
    report: &mut CascadeReport,
) -> Result<(), CascadeError> {
    let by_player =
        move |collection| ctx.list_all(collection, FieldFilter::eq(PLAYER_ID, player_id));
    let (rosters, play_time, notes, availability, scored, assisted) = join!(
        by_player(Collection::TeamRosters),
        by_player(Collection::PlayTimeRecords),
        by_player(Collection::GameNotes),
        by_player(Collection::PlayerAvailabilities),
        ctx.list_all(Collection::Goals, FieldFilter::eq(SCORER_ID, player_id)),
        ctx.list_all(Collection::Goals, FieldFilter::eq(ASSIST_ID, player_id)),
    );
    let rosters = report.collect_listing(Collection::TeamRosters, rosters);
    let play_time = report.collect_listing(Collection::PlayTimeRecords, play_time);
    let notes = report.collect_listing(Collection::GameNotes, notes);
    let availability = report.collect_listing(Collection::PlayerAvailabilities, availability);
    let scored = report.collect_listing(Collection::Goals, scored);
    let mut assisted = report.collect_listing(Collection::Goals, assisted);

    // A goal scored and assisted by the same player is going away anyway.
    let scored_ids = scored
        .iter()
        .map(|goal| goal.id.as_str())
        .collect::<HashSet<_>>();
    assisted.retain(|goal| !scored_ids.contains(goal.id.as_str()));

    let cleared = ctx.clear_all(Collection::Goals, &assisted, ASSIST_ID).await;
    report.record_cleared(cleared);

    let (rosters_done, play_time_done, notes_done, availability_done, scored_done) = join!(
        ctx.delete_all(Collection::TeamRosters, &rosters),
        ctx.delete_all(Collection::PlayTimeRecords, &play_time),
        ctx.delete_all(Collection::GameNotes, &notes),
        ctx.delete_all(Collection::PlayerAvailabilities, &availability),
        ctx.delete_all(Collection::Goals, &scored),
    );
    report.record_deletes(Collection::TeamRosters, rosters_done);
    report.record_deletes(Collection::PlayTimeRecords, play_time_done);
    report.record_deletes(Collection::GameNotes, notes_done);
    report.record_deletes(Collection::PlayerAvailabilities, availability_done);
    report.record_deletes(Collection::Goals, scored_done);

    ctx.delete_root(Collection::Players, player_id, report).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;

    use crate::{
        dao::models::{ASSIST_ID, Collection, GAME_ID, PLAYER_ID, SCORER_ID, TEAM_ID},
        services::cascade::{
            CascadeService, CascadeSettings,
            test_support::{RecordingStore, StoreEvent},
        },
    };

    fn service(store: &RecordingStore) -> CascadeService {
        CascadeService::new(Arc::new(store.clone()), CascadeSettings::default())
    }

    fn seed_player(store: &RecordingStore) {
        store.seed(Collection::Players, "p1", &[]);
        store.seed(Collection::TeamRosters, "roster-1", &[(TEAM_ID, "t1"), (PLAYER_ID, "p1")]);
        store.seed(Collection::PlayTimeRecords, "pt-1", &[(GAME_ID, "g1"), (PLAYER_ID, "p1")]);
        store.seed(Collection::GameNotes, "note-1", &[(GAME_ID, "g1"), (PLAYER_ID, "p1")]);
        store.seed(Collection::PlayerAvailabilities, "avail-1", &[(PLAYER_ID, "p1")]);
        store.seed(
            Collection::Goals,
            "goal-scored",
            &[(GAME_ID, "g1"), (SCORER_ID, "p1"), (ASSIST_ID, "p2")],
        );
        store.seed(
            Collection::Goals,
            "goal-assisted",
            &[(GAME_ID, "g1"), (SCORER_ID, "p2"), (ASSIST_ID, "p1")],
        );
        store.seed(Collection::Players, "p2", &[]);
        store.seed(Collection::PlayTimeRecords, "pt-2", &[(GAME_ID, "g1"), (PLAYER_ID, "p2")]);
    }

    #[tokio::test]
    async fn player_without_children_issues_exactly_one_delete() {
        let store = RecordingStore::new();
        store.seed(Collection::Players, "p1", &[]);

        service(&store).delete_player_cascade("p1").await.unwrap();

        assert_eq!(store.deletes(), vec![(Collection::Players, "p1".to_owned())]);
        assert!(store.updates().is_empty());
    }

    #[tokio::test]
    async fn assisted_goal_is_updated_never_deleted() {
        let store = RecordingStore::new();
        seed_player(&store);

        let report = service(&store).delete_player_cascade("p1").await.unwrap();

        let updates = store.updates();
        assert_eq!(updates.len(), 1);
        let (collection, id, fields) = &updates[0];
        assert_eq!(*collection, Collection::Goals);
        assert_eq!(id, "goal-assisted");
        assert_eq!(fields.get(ASSIST_ID), Some(&Value::Null));
        assert_eq!(fields.len(), 1);
        assert!(
            !store
                .deletes()
                .iter()
                .any(|(_, id)| id == "goal-assisted")
        );

        let goal = store.inner().get(Collection::Goals, "goal-assisted").unwrap();
        assert_eq!(goal.fields.get(ASSIST_ID), Some(&Value::Null));
        assert_eq!(goal.field_str(SCORER_ID), Some("p2"));
        assert_eq!(report.assists_cleared, 1);
    }

    #[tokio::test]
    async fn scored_goal_is_deleted_never_updated() {
        let store = RecordingStore::new();
        seed_player(&store);

        let report = service(&store).delete_player_cascade("p1").await.unwrap();

        assert!(
            store
                .deletes()
                .contains(&(Collection::Goals, "goal-scored".to_owned()))
        );
        assert!(!store.updates().iter().any(|(_, id, _)| id == "goal-scored"));
        assert!(store.inner().get(Collection::Goals, "goal-scored").is_none());
        assert_eq!(report.deleted_in(Collection::Goals), 1);
    }

    #[tokio::test]
    async fn own_assist_on_own_goal_is_only_deleted() {
        let store = RecordingStore::new();
        store.seed(Collection::Players, "p1", &[]);
        store.seed(Collection::Goals, "solo", &[(SCORER_ID, "p1"), (ASSIST_ID, "p1")]);

        let report = service(&store).delete_player_cascade("p1").await.unwrap();

        assert!(store.updates().is_empty());
        assert_eq!(report.deleted_in(Collection::Goals), 1);
        assert_eq!(report.assists_cleared, 0);
    }

    #[tokio::test]
    async fn removes_player_records_and_keeps_teammates() {
        let store = RecordingStore::new();
        seed_player(&store);

        let report = service(&store).delete_player_cascade("p1").await.unwrap();

        let inner = store.inner();
        assert!(inner.get(Collection::Players, "p1").is_none());
        assert!(inner.get(Collection::Players, "p2").is_some());
        assert!(inner.get(Collection::PlayTimeRecords, "pt-2").is_some());
        assert_eq!(inner.len(Collection::TeamRosters), 0);
        assert_eq!(inner.len(Collection::GameNotes), 0);
        assert_eq!(inner.len(Collection::PlayerAvailabilities), 0);
        assert_eq!(
            store.deletes().last(),
            Some(&(Collection::Players, "p1".to_owned()))
        );
        assert_eq!(report.total_deleted(), 6);
    }

    #[tokio::test]
    async fn assist_clears_happen_before_any_delete() {
        let store = RecordingStore::new();
        seed_player(&store);

        service(&store).delete_player_cascade("p1").await.unwrap();

        let first_delete = store
            .position(|event| matches!(event, StoreEvent::DeleteIssued { .. }))
            .unwrap();
        let update = store
            .position(|event| matches!(event, StoreEvent::Update { .. }))
            .unwrap();
        assert!(update < first_delete);
    }

    #[tokio::test]
    async fn one_failing_delete_still_removes_the_player() {
        let store = RecordingStore::new();
        seed_player(&store);
        store.fail_delete_of(Collection::GameNotes, "note-1");

        let report = service(&store).delete_player_cascade("p1").await.unwrap();

        assert_eq!(report.failed.get(&Collection::GameNotes), Some(&1));
        assert!(store.inner().get(Collection::Players, "p1").is_none());
    }
}
