use tracing::debug;

use crate::{dto::cascade::CascadeReportResponse, error::ServiceError, state::SharedState};

/// Remove a team, its games with everything they own, its rosters and invitations.
pub async fn delete_team(state: &SharedState, id: &str) -> Result<CascadeReportResponse, ServiceError> {
    let cascade = state.cascade_service().await?;
    debug!(team_id = id, "team cascade requested");
    Ok(cascade.delete_team_cascade(id).await?.into())
}

/// Remove a game and every record it owns.
pub async fn delete_game(state: &SharedState, id: &str) -> Result<CascadeReportResponse, ServiceError> {
    let cascade = state.cascade_service().await?;
    debug!(game_id = id, "game cascade requested");
    Ok(cascade.delete_game_cascade(id).await?.into())
}

/// Remove a player, keeping goals it only assisted.
pub async fn delete_player(
    state: &SharedState,
    id: &str,
) -> Result<CascadeReportResponse, ServiceError> {
    let cascade = state.cascade_service().await?;
    debug!(player_id = id, "player cascade requested");
    Ok(cascade.delete_player_cascade(id).await?.into())
}

/// Remove a formation and its positions.
pub async fn delete_formation(
    state: &SharedState,
    id: &str,
) -> Result<CascadeReportResponse, ServiceError> {
    let cascade = state.cascade_service().await?;
    debug!(formation_id = id, "formation cascade requested");
    Ok(cascade.delete_formation_cascade(id).await?.into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{Collection, FORMATION_ID, Record},
            record_store::memory::InMemoryRecordStore,
        },
        state::AppState,
    };

    #[tokio::test]
    async fn degraded_state_refuses_cascades() {
        let state = AppState::new(&AppConfig::default());

        let err = delete_team(&state, "t1").await.unwrap_err();

        assert!(matches!(err, ServiceError::Degraded));
    }

    #[tokio::test]
    async fn runs_cascade_against_installed_store() {
        let state = AppState::new(&AppConfig::default());
        let store = InMemoryRecordStore::new();
        store.insert(Collection::Formations, Record::new("f1"));
        store.insert(
            Collection::FormationPositions,
            Record::new("pos-1").with_field(FORMATION_ID, "f1"),
        );
        state.install_record_store(Arc::new(store.clone())).await;

        let response = delete_formation(&state, "f1").await.unwrap();

        assert_eq!(response.root, "formations");
        assert_eq!(response.total_deleted, 2);
        assert!(store.get(Collection::Formations, "f1").is_none());
    }
}
