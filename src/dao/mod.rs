/// Record model shared by every storage backend.
pub mod models;
/// Record store abstraction and its backends.
pub mod record_store;
/// Storage abstraction layer for database operations.
pub mod storage;
