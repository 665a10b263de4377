use std::env;

use crate::repo::Tables;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Appended to both table names; `_test` selects the isolated test dataset.
    pub table_suffix: String,
    pub cors_origins: Vec<String>,
    pub run_migrations: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            None => 5,
            Some(v) => v.parse().map_err(|_| ConfigError::Invalid { name: "DB_MAX_CONNECTIONS", value: v.clone() })?,
        };
        let table_suffix = get("BOARD_TABLE_SUFFIX").unwrap_or_default();
        // the suffix ends up inside SQL identifiers
        if !table_suffix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
            return Err(ConfigError::Invalid { name: "BOARD_TABLE_SUFFIX", value: table_suffix });
        }
        let cors_origins = get("CORS_ORIGINS")
            .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
            .unwrap_or_else(|| vec!["http://localhost:3000".to_string()]);
        Ok(Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            database_url: get("DATABASE_URL"),
            db_max_connections,
            table_suffix,
            cors_origins,
            run_migrations: get("RUN_MIGRATIONS").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false),
        })
    }

    pub fn tables(&self) -> Tables {
        Tables::with_suffix(&self.table_suffix)
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url.as_deref().ok_or(ConfigError::Missing("DATABASE_URL"))
    }
}
