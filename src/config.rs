//! Configuration loading and management.
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//!
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. `.nlq-gate.toml` in current directory
//! 4. `~/.config/nlq-gate/config.toml`
//! 5. Default values
//!
//! # Configuration File Format
//!
//! ```toml
//! [gate]
//! namespace = "via_test"
//! tables = ["companies", "stints", "persons_large"]
//! max_limit = 50
//!
//! [backend]
//! url = "http://localhost:8123"
//! timeout_ms = 10000
//! user = "default"             # optional
//! password = "..."             # optional, or CLICKHOUSE_PASSWORD
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `NLQ_DB_NAME` | Namespace all tables must live in |
//! | `NLQ_TABLES` | Comma-separated queryable tables |
//! | `NLQ_MAX_LIMIT` | Maximum row limit |
//! | `CLICKHOUSE_HTTP_BASE` | Backend HTTP base URL |
//! | `CLICKHOUSE_TIMEOUT_MS` | Request timeout in milliseconds |
//! | `CLICKHOUSE_USER` | Backend user |
//! | `CLICKHOUSE_PASSWORD` | Backend password |

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration
};

use regex::Regex;
use serde::Deserialize;

use crate::error::{AppResult, config_error};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("valid regex"));

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gate:    GateConfig,
    #[serde(default)]
    pub backend: BackendConfig
}

/// Gate policy: what may be queried and how many rows may come back
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GateConfig {
    /// Database every table reference must be qualified with
    pub namespace: String,
    /// Designated queryable tables (unqualified)
    pub tables:    Vec<String>,
    /// Upper bound enforced on every LIMIT clause
    pub max_limit: u64
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            namespace: String::from("via_test"),
            tables:    vec![
                String::from("companies"),
                String::from("stints"),
                String::from("persons_large"),
            ],
            max_limit: 50
        }
    }
}

impl GateConfig {
    /// Whether `table` is one of the designated queryable tables
    pub fn is_designated(&self, table: &str) -> bool {
        self.tables.iter().any(|t| t == table)
    }

    /// Lowercase identifiers and reject values the scanner cannot match
    pub fn validate(mut self) -> AppResult<Self> {
        self.namespace = self.namespace.trim().to_ascii_lowercase();
        if !IDENTIFIER.is_match(&self.namespace) {
            return Err(config_error(format!(
                "Invalid namespace '{}': expected a plain identifier",
                self.namespace
            )));
        }
        let mut tables = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            let table = table.trim().to_ascii_lowercase();
            if !IDENTIFIER.is_match(&table) {
                return Err(config_error(format!(
                    "Invalid table name '{}': expected a plain identifier",
                    table
                )));
            }
            if !tables.contains(&table) {
                tables.push(table);
            }
        }
        self.tables = tables;
        if self.max_limit == 0 {
            return Err(config_error("max_limit must be greater than zero"));
        }
        Ok(self)
    }
}

/// Backend connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url:        String,
    pub timeout_ms: u64,
    pub user:       Option<String>,
    pub password:   Option<String>
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url:        String::from("http://localhost:8123"),
            timeout_ms: 10_000,
            user:       None,
            password:   None
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Config file in current directory (.nlq-gate.toml)
    /// 3. Config file in home directory (~/.config/nlq-gate/config.toml)
    /// 4. Default values
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("nlq-gate")
                .join("config.toml");
            if home_config.exists() {
                config = Self::read_file(&home_config)?;
            }
        }

        let local_config = PathBuf::from(".nlq-gate.toml");
        if local_config.exists() {
            config = Self::read_file(&local_config)?;
        }

        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| config_error(format!("Invalid config file: {}", e)))
    }

    fn read_file(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| config_error(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Override values from environment-style lookups
    pub fn apply_env<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>
    {
        if let Some(namespace) = lookup("NLQ_DB_NAME") {
            self.gate.namespace = namespace;
        }
        if let Some(tables) = lookup("NLQ_TABLES") {
            self.gate.tables = tables
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(limit) = lookup("NLQ_MAX_LIMIT") {
            self.gate.max_limit = limit
                .trim()
                .parse()
                .map_err(|e| config_error(format!("Invalid NLQ_MAX_LIMIT '{}': {}", limit, e)))?;
        }
        if let Some(url) = lookup("CLICKHOUSE_HTTP_BASE") {
            self.backend.url = url;
        }
        if let Some(timeout) = lookup("CLICKHOUSE_TIMEOUT_MS") {
            self.backend.timeout_ms = timeout.trim().parse().map_err(|e| {
                config_error(format!("Invalid CLICKHOUSE_TIMEOUT_MS '{}': {}", timeout, e))
            })?;
        }
        if let Some(user) = lookup("CLICKHOUSE_USER") {
            self.backend.user = Some(user);
        }
        if let Some(password) = lookup("CLICKHOUSE_PASSWORD") {
            self.backend.password = Some(password);
        }
        Ok(())
    }
}
