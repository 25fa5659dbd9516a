//! Application-level configuration loading: engine rules and generator settings.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

use crate::state::modes::EngineRules;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/versus.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "VERSUS_BACK_CONFIG_PATH";
/// Environment variable that overrides the generator base URL.
const GENERATOR_URL_ENV: &str = "GENERATOR_URL";
const DEFAULT_GENERATOR_URL: &str = "http://localhost:8090";
const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_FANOUT_CAPACITY: usize = 32;

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// Where and how long to wait for the content generator.
pub struct GeneratorSettings {
    /// Root URL of the generator service.
    pub base_url: String,
    /// Upper bound for a single generator or scorer call.
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "timeoutMs")]
    pub timeout: Duration,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GENERATOR_URL.to_owned(),
            timeout: DEFAULT_GENERATOR_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Constants used by the mode engines.
    pub rules: EngineRules,
    /// Generator client settings.
    pub generator: GeneratorSettings,
    /// Buffered events per match channel before slow subscribers lag.
    pub fanout_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rules: EngineRules::default(),
            generator: GeneratorSettings::default(),
            fanout_capacity: DEFAULT_FANOUT_CAPACITY,
        }
    }
}

impl AppConfig {
    /// Load the configuration from disk, falling back to the built-in defaults,
    /// then apply environment overrides.
    pub fn load() -> Self {
        let mut config = Self::from_file(&resolve_config_path());
        if let Some(url) = env::var(GENERATOR_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            info!(%url, "generator URL overridden from environment");
            config.generator.base_url = url;
        }
        config
    }

    fn from_file(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        elimination_questions = config.rules.elimination_questions,
                        buzz_questions = config.rules.buzz_questions,
                        "loaded versus configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document; absent keys keep their defaults.
    pub fn parse(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str(contents)
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
