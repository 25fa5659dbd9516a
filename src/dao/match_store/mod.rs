#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;

use crate::dao::{
    models::MatchEntity,
    storage::{StorageResult, WriteOutcome},
};

/// Abstraction over the persistence layer for match records.
///
/// Every mutation after the initial insert goes through
/// [`MatchStore::replace_match`], which only succeeds while the stored record
/// still carries `expected_version`.
pub trait MatchStore: Send + Sync {
    /// Short backend name reported by the health endpoint.
    fn backend_name(&self) -> &'static str;
    /// Persist a new record, failing with `Duplicate` when the code is taken.
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Load the record stored under `code`.
    fn find_match(&self, code: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Compare-and-swap on the record version.
    fn replace_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>>;
    /// Cheap liveness check used by the supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Rebuild the underlying connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
