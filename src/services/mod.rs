/// Cascade deletion engine.
pub mod cascade;
/// Cascade entry points used by the HTTP layer.
pub mod deletion_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
