/// Match record storage backends.
pub mod match_store;
/// Persisted match model.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
