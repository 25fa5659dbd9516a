use mongodb::error::Error as MongoError;
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB did not answer after {attempts} ping(s)")]
    Unreachable {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("match `{code}` already exists")]
    DuplicateMatch { code: String },
    #[error("failed to insert match `{code}`")]
    InsertMatch {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load match `{code}`")]
    LoadMatch {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to replace match `{code}`")]
    ReplaceMatch {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("stored match `{code}` is corrupted: {reason}")]
    Corrupted { code: String, reason: String },
}
