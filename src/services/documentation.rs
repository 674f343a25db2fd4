use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Sideline Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::cascade::delete_team,
        crate::routes::cascade::delete_game,
        crate::routes::cascade::delete_player,
        crate::routes::cascade::delete_formation,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::cascade::CascadeReportResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "cascade", description = "Cascade deletion of root entities and their dependents"),
    )
)]
pub struct ApiDoc;
