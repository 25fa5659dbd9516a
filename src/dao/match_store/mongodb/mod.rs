mod config;
mod connection;
mod error;
mod models;
mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoMatchStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::DuplicateMatch { code } => StorageError::Duplicate { code },
            MongoDaoError::Corrupted { code, reason } => StorageError::Corrupted { code, reason },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
