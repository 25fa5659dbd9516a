use std::{env, time::Duration};

use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DATABASE: &str = "versus";
const DEFAULT_CONNECT_ATTEMPTS: u32 = 10;
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for the MongoDB match store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    /// Pings tried before a connection attempt is reported as failed.
    pub connect_attempts: u32,
}

impl MongoConfig {
    /// Read `MONGO_URI` (required), `MONGO_DB` and `MONGO_CONNECT_ATTEMPTS`.
    pub fn from_env() -> MongoResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MongoResult<Self> {
        let uri = lookup("MONGO_URI").ok_or(MongoDaoError::MissingEnvVar { var: "MONGO_URI" })?;
        let database = lookup("MONGO_DB")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_owned());
        let connect_attempts = lookup("MONGO_CONNECT_ATTEMPTS")
            .and_then(|raw| raw.parse::<u32>().ok())
            .filter(|attempts| *attempts > 0)
            .unwrap_or(DEFAULT_CONNECT_ATTEMPTS);

        Ok(Self {
            uri,
            database,
            connect_attempts,
        })
    }

    /// Parse the URI into driver options tagged with this service's name.
    pub async fn client_options(&self) -> MongoResult<ClientOptions> {
        let mut options =
            ClientOptions::parse(&self.uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: self.uri.clone(),
                    source,
                })?;
        options.app_name = Some("versus-back".to_owned());
        options
            .server_selection_timeout
            .get_or_insert(SERVER_SELECTION_TIMEOUT);
        Ok(options)
    }
}
