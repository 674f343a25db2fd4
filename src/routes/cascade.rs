use axum::{
    Json, Router,
    extract::{Path, State},
    routing::delete,
};
use validator::Validate;

use crate::{
    dto::{cascade::CascadeReportResponse, validation::RecordIdPath},
    error::AppError,
    services::deletion_service,
    state::SharedState,
};

/// Cascade delete endpoints, one per root entity type.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/teams/{id}", delete(delete_team))
        .route("/games/{id}", delete(delete_game))
        .route("/players/{id}", delete(delete_player))
        .route("/formations/{id}", delete(delete_formation))
}

/// Delete a team with its games, rosters and invitations.
#[utoipa::path(
    delete,
    path = "/teams/{id}",
    tag = "cascade",
    params(("id" = String, Path, description = "Team identifier")),
    responses(
        (status = 200, description = "Team removed", body = CascadeReportResponse),
        (status = 400, description = "Malformed identifier"),
        (status = 409, description = "Store refused to delete the team record"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn delete_team(
    State(state): State<SharedState>,
    Path(path): Path<RecordIdPath>,
) -> Result<Json<CascadeReportResponse>, AppError> {
    path.validate()?;
    Ok(Json(deletion_service::delete_team(&state, &path.id).await?))
}

/// Delete a game with every record it owns.
#[utoipa::path(
    delete,
    path = "/games/{id}",
    tag = "cascade",
    params(("id" = String, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "Game removed", body = CascadeReportResponse),
        (status = 400, description = "Malformed identifier"),
        (status = 409, description = "Store refused to delete the game record"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    Path(path): Path<RecordIdPath>,
) -> Result<Json<CascadeReportResponse>, AppError> {
    path.validate()?;
    Ok(Json(deletion_service::delete_game(&state, &path.id).await?))
}

/// Delete a player; goals it assisted are kept with the assist cleared.
#[utoipa::path(
    delete,
    path = "/players/{id}",
    tag = "cascade",
    params(("id" = String, Path, description = "Player identifier")),
    responses(
        (status = 200, description = "Player removed", body = CascadeReportResponse),
        (status = 400, description = "Malformed identifier"),
        (status = 409, description = "Store refused to delete the player record"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn delete_player(
    State(state): State<SharedState>,
    Path(path): Path<RecordIdPath>,
) -> Result<Json<CascadeReportResponse>, AppError> {
    path.validate()?;
    Ok(Json(deletion_service::delete_player(&state, &path.id).await?))
}

/// Delete a formation and its positions.
#[utoipa::path(
    delete,
    path = "/formations/{id}",
    tag = "cascade",
    params(("id" = String, Path, description = "Formation identifier")),
    responses(
        (status = 200, description = "Formation removed", body = CascadeReportResponse),
        (status = 400, description = "Malformed identifier"),
        (status = 409, description = "Store refused to delete the formation record"),
        (status = 503, description = "Storage unavailable")
    )
)]
pub async fn delete_formation(
    State(state): State<SharedState>,
    Path(path): Path<RecordIdPath>,
) -> Result<Json<CascadeReportResponse>, AppError> {
    path.validate()?;
    Ok(Json(
        deletion_service::delete_formation(&state, &path.id).await?,
    ))
}
