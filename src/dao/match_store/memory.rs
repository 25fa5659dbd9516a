//! Process-local store, used when no database is configured and by the tests.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;

use crate::dao::{
    match_store::MatchStore,
    models::MatchEntity,
    storage::{StorageError, StorageResult, WriteOutcome},
};

/// [`MatchStore`] backed by a concurrent map; the shard lock makes each
/// conditional write atomic.
#[derive(Clone, Default)]
pub struct MemoryMatchStore {
    matches: Arc<DashMap<String, MatchEntity>>,
}

impl MemoryMatchStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored matches.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

impl MatchStore for MemoryMatchStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            match store.matches.entry(entity.code.clone()) {
                Entry::Occupied(_) => Err(StorageError::Duplicate { code: entity.code }),
                Entry::Vacant(slot) => {
                    slot.insert(entity);
                    Ok(())
                }
            }
        })
    }

    fn find_match(&self, code: String) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.matches.get(&code).map(|entry| entry.value().clone())) })
    }

    fn replace_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<WriteOutcome>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(mut current) = store.matches.get_mut(&entity.code) else {
                return Ok(WriteOutcome::Conflict);
            };
            if current.version != expected_version {
                return Ok(WriteOutcome::Conflict);
            }
            *current = entity;
            Ok(WriteOutcome::Written)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
