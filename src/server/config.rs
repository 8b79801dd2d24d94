use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub replica_database_url: Option<String>,
    pub http_addr: String,
    pub parser_endpoint: String,
    pub event_webhook_url: Option<String>,
    pub db_max_connections: u32,
    pub log_dir: String,
    pub bootstrap_schema: bool,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    database_url: Option<String>,
    replica_database_url: Option<String>,
    http_addr: Option<String>,
    parser_endpoint: Option<String>,
    event_webhook_url: Option<String>,
    db_max_connections: Option<u32>,
    log_dir: Option<String>,
    bootstrap_schema: Option<bool>,
}

fn default_http_addr() -> String {
    "0.0.0.0:4005".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

impl PartialServerConfig {
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let display = path.display().to_string();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_u32 = |key: &'static str| -> Result<Option<u32>, ConfigError> {
            lookup(key)
                .map(|value| value.parse().map_err(|_| ConfigError::Invalid { key, value }))
                .transpose()
        };
        let parse_bool = |key: &'static str| -> Result<Option<bool>, ConfigError> {
            lookup(key)
                .map(|value| match value.to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" => Ok(true),
                    "0" | "false" | "no" => Ok(false),
                    _ => Err(ConfigError::Invalid { key, value }),
                })
                .transpose()
        };
        Ok(Self {
            database_url: lookup("DATABASE_URL"),
            replica_database_url: lookup("REPLICA_DATABASE_URL"),
            http_addr: lookup("HTTP_ADDR"),
            parser_endpoint: lookup("PARSER_ENDPOINT"),
            event_webhook_url: lookup("EVENT_WEBHOOK_URL"),
            db_max_connections: parse_u32("DB_MAX_CONNECTIONS")?,
            log_dir: lookup("LOG_DIR"),
            bootstrap_schema: parse_bool("BOOTSTRAP_SCHEMA")?,
        })
    }
}

impl ServerConfig {
    /// Loads configuration from an optional TOML file, then lets environment
    /// variables (including a `.env` file) override it.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path) => PartialServerConfig::from_file(Path::new(path))?,
            None => PartialServerConfig::default(),
        };
        let env_config = PartialServerConfig::from_lookup(|key| env::var(key).ok())?;

        Self::merge(env_config, file_config)
    }

    fn merge(
        env_config: PartialServerConfig,
        file_config: PartialServerConfig,
    ) -> Result<Self, ConfigError> {
        Ok(ServerConfig {
            database_url: env_config
                .database_url
                .or(file_config.database_url)
                .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            replica_database_url: env_config
                .replica_database_url
                .or(file_config.replica_database_url),
            http_addr: env_config
                .http_addr
                .or(file_config.http_addr)
                .unwrap_or_else(default_http_addr),
            parser_endpoint: env_config
                .parser_endpoint
                .or(file_config.parser_endpoint)
                .ok_or(ConfigError::Missing("PARSER_ENDPOINT"))?,
            event_webhook_url: env_config
                .event_webhook_url
                .or(file_config.event_webhook_url),
            db_max_connections: env_config
                .db_max_connections
                .or(file_config.db_max_connections)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            log_dir: env_config
                .log_dir
                .or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            bootstrap_schema: env_config
                .bootstrap_schema
                .or(file_config.bootstrap_schema)
                .unwrap_or(false),
        })
    }
}
