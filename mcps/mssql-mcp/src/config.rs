//! Configuration for the MSSQL MCP Server
//!
//! Credentials come only from the process environment and are resolved once
//! at startup. Non-credential tuning (timeouts, TLS, row limits) comes from an
//! optional TOML file:
//!
//! 1. `MSSQL_MCP_CONFIG_PATH` environment variable
//! 2. `~/.binks/mssql.toml`
//! 3. Defaults
//!
//! `MSSQL_READ_LIMIT` overrides `limits.default_read_limit`.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const ENV_DRIVER: &str = "MSSQL_DRIVER";
pub const ENV_HOST: &str = "MSSQL_HOST";
pub const ENV_USER: &str = "MSSQL_USER";
pub const ENV_PASSWORD: &str = "MSSQL_PASSWORD";
pub const ENV_DATABASE: &str = "MSSQL_DATABASE";

pub const ENV_CONFIG_PATH: &str = "MSSQL_MCP_CONFIG_PATH";
pub const ENV_READ_LIMIT: &str = "MSSQL_READ_LIMIT";

/// A string that never shows up in `Debug` output or logs
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for handing to the driver only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Connection parameters resolved from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Driver name as configured; informational, the wire protocol is always TDS
    pub driver: String,
    /// Server host, optionally with `,port` or `:port`
    pub host: String,
    pub user: String,
    pub password: Secret,
    pub database: String,
}

impl ConnectionConfig {
    /// Read the five `MSSQL_*` variables from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve through an arbitrary lookup; values are trimmed and must be non-empty
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String, ConfigError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingField(key))
        };

        Ok(Self {
            driver: required(ENV_DRIVER)?,
            host: required(ENV_HOST)?,
            user: required(ENV_USER)?,
            password: Secret::new(required(ENV_PASSWORD)?),
            database: required(ENV_DATABASE)?,
        })
    }
}

/// Tuning loaded from the optional settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub connection: ConnectionSettings,
    #[serde(default)]
    pub limits: LimitSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionSettings {
    /// TCP port when `MSSQL_HOST` does not carry one
    /// Default: 1433
    #[serde(default = "default_port")]
    pub port: u16,

    /// Require TLS for the whole session
    /// Default: true
    #[serde(default = "default_true")]
    pub encrypt: bool,

    /// Accept any server certificate (self-signed dev servers)
    /// Default: false
    #[serde(default)]
    pub trust_server_certificate: bool,

    /// Default: 15
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Default: 30
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LimitSettings {
    /// Row cap for `read_table` when the caller gives no limit
    /// Default: 1000
    #[serde(default = "default_read_limit")]
    pub default_read_limit: usize,

    /// Row cap for a single `execute_query` result set
    /// Default: 10000
    #[serde(default = "default_max_result_rows")]
    pub max_result_rows: usize,
}

fn default_port() -> u16 {
    1433
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    15
}

fn default_query_timeout() -> u64 {
    30
}

fn default_read_limit() -> usize {
    1000
}

fn default_max_result_rows() -> usize {
    10_000
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            encrypt: default_true(),
            trust_server_certificate: false,
            connect_timeout_secs: default_connect_timeout(),
            query_timeout_secs: default_query_timeout(),
        }
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            default_read_limit: default_read_limit(),
            max_result_rows: default_max_result_rows(),
        }
    }
}

impl Settings {
    /// Load settings from the standard location, or defaults when there is none
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
            let path = PathBuf::from(path);
            tracing::info!("Loading settings from {}={}", ENV_CONFIG_PATH, path.display());
            return Self::from_file(&path);
        }

        match dirs::home_dir().map(|home| home.join(".binks").join("mssql.toml")) {
            Some(path) if path.exists() => {
                tracing::info!("Loading settings from {}", path.display());
                Self::from_file(&path)
            }
            _ => {
                tracing::info!("No settings file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Settings = toml::from_str(&content).map_err(|e| ConfigError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        settings.validate()?;
        Ok(settings)
    }

    /// Apply `MSSQL_READ_LIMIT`, if set
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_READ_LIMIT) {
            self.limits.default_read_limit = parse_positive(ENV_READ_LIMIT, &raw)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.default_read_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "limits.default_read_limit",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.limits.max_result_rows == 0 {
            return Err(ConfigError::Invalid {
                field: "limits.max_result_rows",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_positive(field: &'static str, raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid {
            field,
            reason: format!("expected a positive integer, got {:?}", raw),
        }),
    }
}

/// Everything the server needs, fixed for the lifetime of the process
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub connection: ConnectionConfig,
    pub settings: Settings,
}

impl ServerConfig {
    /// Resolve credentials and settings; called once at startup
    pub fn resolve() -> Result<Self, ConfigError> {
        let connection = ConnectionConfig::from_env()?;
        let mut settings = Settings::load()?;
        settings.apply_overrides(|key| std::env::var(key).ok())?;

        Ok(Self {
            connection,
            settings,
        })
    }
}
