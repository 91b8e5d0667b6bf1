//! Schema allowlist and the process-wide cache holding it.
//!
//! The allowlist maps every designated table to the set of its column names,
//! all lowercased. It is built by introspecting ClickHouse `system.columns`
//! for the configured namespace, or read from a TOML file for offline checks.
//!
//! The cache is fail-closed: a failed load leaves it empty, and an empty
//! allowlist makes the gate reject every query. A reload swaps in a whole new
//! [`SchemaAllowlist`]; validations already holding a snapshot keep seeing the
//! previous one.
//!
//! # Example
//!
//! ```
//! use nlq_sql_gate::schema::{SchemaAllowlist, SchemaCache};
//!
//! let designated = vec!["companies".to_string()];
//! let allowlist = SchemaAllowlist::from_columns(
//!     &designated,
//!     [("Companies", "Name"), ("companies", "company_id"), ("secrets", "key")]
//! );
//!
//! assert!(allowlist.has_column("companies", "name"));
//! assert!(!allowlist.contains_table("secrets"));
//!
//! let cache = SchemaCache::new();
//! assert!(cache.snapshot().is_empty());
//! cache.replace(allowlist);
//! assert_eq!(cache.snapshot().len(), 1);
//! ```

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, RwLock}
};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    backend::BackendClient,
    config::GateConfig,
    error::{AppResult, allowlist_parse_error, schema_load_error}
};

/// Designated tables and their permitted columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaAllowlist {
    tables: BTreeMap<CompactString, BTreeSet<CompactString>>
}

#[derive(Deserialize)]
struct AllowlistFile {
    #[serde(default)]
    tables: BTreeMap<String, Vec<String>>
}

impl SchemaAllowlist {
    /// Build from `(table, column)` pairs, keeping only designated tables.
    ///
    /// Identifiers are lowercased. A designated table without any pair is
    /// absent from the result.
    pub fn from_columns<I, T, C>(designated: &[String], pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, C)>,
        T: AsRef<str>,
        C: AsRef<str>
    {
        let mut tables: BTreeMap<CompactString, BTreeSet<CompactString>> = BTreeMap::new();
        for (table, column) in pairs {
            let table = table.as_ref().trim().to_ascii_lowercase();
            if !designated.iter().any(|d| d.eq_ignore_ascii_case(&table)) {
                continue;
            }
            tables
                .entry(CompactString::from(table))
                .or_default()
                .insert(CompactString::from(column.as_ref().trim().to_ascii_lowercase()));
        }
        Self {
            tables
        }
    }

    /// Parse an allowlist file:
    ///
    /// ```toml
    /// [tables]
    /// companies = ["company_id_64", "name"]
    /// ```
    pub fn from_toml_str(path: &str, content: &str, designated: &[String]) -> AppResult<Self> {
        let file: AllowlistFile =
            toml::from_str(content).map_err(|e| allowlist_parse_error(path, e.to_string()))?;
        let pairs = file
            .tables
            .iter()
            .flat_map(|(table, columns)| columns.iter().map(move |c| (table, c)));
        Ok(Self::from_columns(designated, pairs))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn columns(&self, table: &str) -> Option<&BTreeSet<CompactString>> {
        self.tables.get(table)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(table)
            .is_some_and(|columns| columns.contains(column))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|t| t.as_str())
    }
}

/// Owner of the current allowlist snapshot.
#[derive(Debug, Default)]
pub struct SchemaCache {
    current: RwLock<Arc<SchemaAllowlist>>
}

impl SchemaCache {
    /// Create an empty (reject-everything) cache
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allowlist(allowlist: SchemaAllowlist) -> Self {
        Self {
            current: RwLock::new(Arc::new(allowlist))
        }
    }

    /// Current allowlist. A poisoned lock yields the empty allowlist.
    pub fn snapshot(&self) -> Arc<SchemaAllowlist> {
        self.current
            .read()
            .map(|guard| Arc::clone(&guard))
            .unwrap_or_else(|_| Arc::new(SchemaAllowlist::default()))
    }

    /// Swap in a complete new allowlist
    pub fn replace(&self, allowlist: SchemaAllowlist) {
        let next = Arc::new(allowlist);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next
        }
    }

    /// Drop the allowlist so every query is rejected
    pub fn clear(&self) {
        self.replace(SchemaAllowlist::default());
    }

    /// Introspect the backend and replace the allowlist.
    ///
    /// On failure the cache is cleared and the error returned.
    pub async fn reload(&self, client: &BackendClient, policy: &GateConfig) -> AppResult<usize> {
        match load(client, policy).await {
            Ok(allowlist) => {
                let count = allowlist.len();
                self.replace(allowlist);
                tracing::info!(table_count = count, "Schema allowlist loaded");
                Ok(count)
            }
            Err(e) => {
                self.clear();
                tracing::error!(error = %e, "Schema allowlist load failed; rejecting all queries");
                Err(e)
            }
        }
    }
}

/// Metadata query listing the columns of every designated table.
pub fn introspection_query(policy: &GateConfig) -> String {
    let tables = policy
        .tables
        .iter()
        .map(|t| format!("'{}'", escape_literal(t)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT table, name FROM system.columns WHERE database = '{}' AND table IN ({}) FORMAT JSONEachRow",
        escape_literal(&policy.namespace),
        tables
    )
}

/// Build the allowlist from backend metadata.
pub async fn load(client: &BackendClient, policy: &GateConfig) -> AppResult<SchemaAllowlist> {
    if policy.tables.is_empty() {
        return Ok(SchemaAllowlist::default());
    }
    let rows = client
        .fetch_rows(&introspection_query(policy))
        .await
        .map_err(|e| schema_load_error(e.to_string()))?;
    let mut pairs = Vec::with_capacity(rows.len());
    for row in &rows {
        match (row.get("table"), row.get("name")) {
            (Some(Value::String(table)), Some(Value::String(name))) => {
                pairs.push((table.as_str(), name.as_str()));
            }
            _ => {
                return Err(schema_load_error(
                    "metadata row without string 'table' and 'name' fields"
                ));
            }
        }
    }
    Ok(SchemaAllowlist::from_columns(&policy.tables, pairs))
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
