use futures::{future::join_all, join};
use tracing::debug;

use crate::dao::models::{Collection, FieldFilter, GAME_ID, GAME_PLAN_ID};

use super::{CascadeContext, CascadeError, CascadeReport};

/// Remove a game and everything it owns.
///
/// Order: list all game-owned collections, list the rotations of every game plan,
/// delete rotations together with the other leaf collections, then the game plans,
/// then the game record.
pub(super) async fn delete_game(
    ctx: &CascadeContext,
    game_id: &str,
    report: &mut CascadeReport,
) -> Result<(), CascadeError> {
    let by_game = move |collection| ctx.list_all(collection, FieldFilter::eq(GAME_ID, game_id));
    let (play_time, goals, notes, substitutions, lineups, availability, plans) = join!(
        by_game(Collection::PlayTimeRecords),
        by_game(Collection::Goals),
        by_game(Collection::GameNotes),
        by_game(Collection::Substitutions),
        by_game(Collection::LineupAssignments),
        by_game(Collection::PlayerAvailabilities),
        by_game(Collection::GamePlans),
    );

    let play_time = report.collect_listing(Collection::PlayTimeRecords, play_time);
    let goals = report.collect_listing(Collection::Goals, goals);
    let notes = report.collect_listing(Collection::GameNotes, notes);
    let substitutions = report.collect_listing(Collection::Substitutions, substitutions);
    let lineups = report.collect_listing(Collection::LineupAssignments, lineups);
    let availability = report.collect_listing(Collection::PlayerAvailabilities, availability);
    let plans = report.collect_listing(Collection::GamePlans, plans);

    let rotation_listings = join_all(plans.iter().map(|plan| {
        ctx.list_all(
            Collection::PlannedRotations,
            FieldFilter::eq(GAME_PLAN_ID, plan.id.as_str()),
        )
    }))
    .await;
    let mut rotations = Vec::new();
    for listing in rotation_listings {
        rotations.extend(report.collect_listing(Collection::PlannedRotations, listing));
    }

    debug!(
        game_id,
        rotations = rotations.len(),
        plans = plans.len(),
        "game dependents discovered"
    );

    let (
        rotations_done,
        play_time_done,
        goals_done,
        notes_done,
        substitutions_done,
        lineups_done,
        availability_done,
    ) = join!(
        ctx.delete_all(Collection::PlannedRotations, &rotations),
        ctx.delete_all(Collection::PlayTimeRecords, &play_time),
        ctx.delete_all(Collection::Goals, &goals),
        ctx.delete_all(Collection::GameNotes, &notes),
        ctx.delete_all(Collection::Substitutions, &substitutions),
        ctx.delete_all(Collection::LineupAssignments, &lineups),
        ctx.delete_all(Collection::PlayerAvailabilities, &availability),
    );
    report.record_deletes(Collection::PlannedRotations, rotations_done);
    report.record_deletes(Collection::PlayTimeRecords, play_time_done);
    report.record_deletes(Collection::Goals, goals_done);
    report.record_deletes(Collection::GameNotes, notes_done);
    report.record_deletes(Collection::Substitutions, substitutions_done);
    report.record_deletes(Collection::LineupAssignments, lineups_done);
    report.record_deletes(Collection::PlayerAvailabilities, availability_done);

    // Plans outlive their rotations.
    let plans_done = ctx.delete_all(Collection::GamePlans, &plans).await;
    report.record_deletes(Collection::GamePlans, plans_done);

    ctx.delete_root(Collection::Games, game_id, report).await
}
