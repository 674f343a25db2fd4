use futures::join;
use tracing::warn;

use crate::dao::models::{Collection, FieldFilter, TEAM_ID};

use super::{CascadeContext, CascadeError, CascadeReport, game};

/// Remove a team: each owned game is fully cascaded, one at a time, then rosters and
/// invitations, then the team record.
pub(super) async fn delete_team(
    ctx: &CascadeContext,
    team_id: &str,
    report: &mut CascadeReport,
) -> Result<(), CascadeError> {
    let by_team = move |collection| ctx.list_all(collection, FieldFilter::eq(TEAM_ID, team_id));
    let (games, rosters, invitations) = join!(
        by_team(Collection::Games),
        by_team(Collection::TeamRosters),
        by_team(Collection::TeamInvitations),
    );
    let games = report.collect_listing(Collection::Games, games);
    let rosters = report.collect_listing(Collection::TeamRosters, rosters);
    let invitations = report.collect_listing(Collection::TeamInvitations, invitations);

    for owned in &games {
        if let Err(err) = game::delete_game(ctx, &owned.id, report).await {
            warn!(team_id, game_id = %owned.id, error = %err, "owned game survived its cascade");
        }
    }

    let (rosters_done, invitations_done) = join!(
        ctx.delete_all(Collection::TeamRosters, &rosters),
        ctx.delete_all(Collection::TeamInvitations, &invitations),
    );
    report.record_deletes(Collection::TeamRosters, rosters_done);
    report.record_deletes(Collection::TeamInvitations, invitations_done);

    ctx.delete_root(Collection::Teams, team_id, report).await
}
