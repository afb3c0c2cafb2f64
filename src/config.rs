use crate::cache::DEFAULT_CACHE_TTL;
use crate::error::ConfigError;
use crate::poller::{PollerConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PORT: u16 = 8888;
const DEFAULT_NODE_NAME: &str = "vn-stock-advisor";
const DEFAULT_ENVIRONMENT: &str = "development";

// Credentials for the crew job API
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrewConfig {
    pub url: String,
    pub bearer_token: String,
}

// YAML-serializable configuration structure
#[derive(Serialize, Deserialize, Debug)]
pub struct ConfigYaml {
    pub node_name: Option<String>,
    pub crew: CrewConfig,
    pub max_attempts: Option<u32>,
    pub poll_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
    pub environment: Option<String>,
    pub port: Option<u16>,
}

// Holds application-wide settings
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub node_name: String,
    pub crew: CrewConfig,
    pub poller: PollerConfig,
    pub request_timeout: Duration,
    pub cache_ttl: Duration,
    pub environment: String,
    pub port: u16,
}

impl AppConfig {
    // Load configuration from YAML file or environment variables
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(config_file) = env::var("CONFIG_FILE") {
            Self::from_yaml(&config_file)
        } else {
            Self::from_env()
        }
    }

    pub fn from_yaml(file_path: &str) -> Result<Self, ConfigError> {
        let yaml_content = fs::read_to_string(file_path).map_err(|source| ConfigError::Read {
            path: file_path.to_string(),
            source,
        })?;
        Self::from_yaml_str(&yaml_content)
    }

    pub fn from_yaml_str(yaml_content: &str) -> Result<Self, ConfigError> {
        let yaml_config: ConfigYaml = serde_yaml::from_str(yaml_content)?;

        if yaml_config.crew.url.trim().is_empty() {
            return Err(ConfigError::Missing("crew.url"));
        }
        if yaml_config.crew.bearer_token.trim().is_empty() {
            return Err(ConfigError::Missing("crew.bearer_token"));
        }

        Ok(Self {
            node_name: yaml_config.node_name.unwrap_or_else(|| DEFAULT_NODE_NAME.to_string()),
            crew: CrewConfig {
                url: yaml_config.crew.url.trim_end_matches('/').to_string(),
                bearer_token: yaml_config.crew.bearer_token,
            },
            poller: PollerConfig {
                max_attempts: yaml_config.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
                poll_interval: yaml_config
                    .poll_interval_secs
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_POLL_INTERVAL),
            },
            request_timeout: Duration::from_secs(
                yaml_config.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            ),
            cache_ttl: yaml_config
                .cache_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_CACHE_TTL),
            environment: yaml_config.environment.unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
            port: yaml_config.port.unwrap_or(DEFAULT_PORT),
        })
    }

    // Load all configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let parsed_u64 = |key: &str, default: u64| {
            lookup(key).and_then(|s| s.parse().ok()).unwrap_or(default)
        };

        let crew = CrewConfig {
            url: required("CREW_URL")?.trim_end_matches('/').to_string(),
            bearer_token: required("BEARER_TOKEN")?,
        };

        let max_attempts = lookup("MAX_ATTEMPTS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);

        let poll_interval_secs = parsed_u64("POLL_INTERVAL", DEFAULT_POLL_INTERVAL.as_secs());
        let request_timeout_secs = parsed_u64("REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT_SECS);
        let cache_ttl_secs = parsed_u64("CACHE_TTL", DEFAULT_CACHE_TTL.as_secs()); // Default to 1 hour

        let port = lookup("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let node_name = lookup("NODE_NAME").unwrap_or_else(|| DEFAULT_NODE_NAME.to_string());
        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        Ok(Self {
            node_name,
            crew,
            poller: PollerConfig {
                max_attempts,
                poll_interval: Duration::from_secs(poll_interval_secs),
            },
            request_timeout: Duration::from_secs(request_timeout_secs),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            environment,
            port,
        })
    }
}
