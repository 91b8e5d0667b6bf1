//! The validation pipeline.
//!
//! [`SqlGate`] owns the gate policy and a shared [`SchemaCache`]. Preparing a
//! query runs, in order:
//!
//! 1. [`normalize`](crate::lexer::normalize): terminators, comments, literal
//!    blinding
//! 2. [`Validator`]: shape, denylist, namespace, tables, columns, ambiguity
//! 3. [`Canonicalizer`]: row limit and output format
//!
//! Every step returns a [`Rejection`] on failure; nothing panics on bad input.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use nlq_sql_gate::{
//!     config::GateConfig,
//!     gate::SqlGate,
//!     rejection::RejectKind,
//!     schema::{SchemaAllowlist, SchemaCache}
//! };
//!
//! let policy = GateConfig {
//!     namespace: "ns".into(),
//!     tables:    vec!["companies".into()],
//!     max_limit: 50
//! };
//! let allowlist = SchemaAllowlist::from_columns(&policy.tables, [("companies", "name")]);
//! let gate = SqlGate::new(policy, Arc::new(SchemaCache::with_allowlist(allowlist)));
//!
//! let query = gate.prepare("SELECT name FROM ns.companies LIMIT 10").unwrap();
//! assert_eq!(query.as_str(), "SELECT name FROM ns.companies LIMIT 10 FORMAT JSONEachRow");
//!
//! let err = gate.prepare("DELETE FROM ns.companies").unwrap_err();
//! assert_eq!(err.kind(), RejectKind::NotSelect);
//! ```

use std::sync::Arc;

use crate::{
    backend::{BackendClient, Row},
    canonical::{CanonicalQuery, Canonicalizer},
    config::GateConfig,
    error::AppResult,
    lexer::normalize,
    rejection::Rejection,
    schema::SchemaCache,
    validator::Validator
};

/// Validates, rewrites and optionally executes model-generated SQL.
#[derive(Debug, Clone)]
pub struct SqlGate {
    policy: GateConfig,
    cache:  Arc<SchemaCache>
}

impl SqlGate {
    pub fn new(policy: GateConfig, cache: Arc<SchemaCache>) -> Self {
        Self {
            policy,
            cache
        }
    }

    pub fn policy(&self) -> &GateConfig {
        &self.policy
    }

    pub fn cache(&self) -> &Arc<SchemaCache> {
        &self.cache
    }

    /// Validate raw SQL and produce its canonical form.
    ///
    /// Uses one allowlist snapshot for the whole validation, so a concurrent
    /// reload cannot be observed halfway.
    pub fn prepare(&self, raw: &str) -> Result<CanonicalQuery, Rejection> {
        let result = self.prepare_inner(raw);
        match &result {
            Ok(query) => tracing::debug!(sql = %query, "Query accepted"),
            Err(rejection) => tracing::info!(
                kind = %rejection.kind(),
                reason = %rejection,
                "Query rejected"
            )
        }
        result
    }

    fn prepare_inner(&self, raw: &str) -> Result<CanonicalQuery, Rejection> {
        let normalized = normalize(raw)?;
        let allowlist = self.cache.snapshot();
        let tables = Validator::new(&self.policy, &allowlist).validate(&normalized.blinded)?;
        let sql = Canonicalizer::new(self.policy.max_limit).apply(&normalized);
        Ok(CanonicalQuery::new(sql, tables.referenced.into_iter().collect()))
    }

    /// Prepare and then execute against the backend.
    pub async fn execute(&self, client: &BackendClient, raw: &str) -> Result<Vec<Row>, Rejection> {
        let query = self.prepare(raw)?;
        client.execute(&query).await.inspect_err(|rejection| {
            tracing::info!(kind = %rejection.kind(), reason = %rejection, "Backend rejected query");
        })
    }

    /// Reload the allowlist from backend metadata.
    pub async fn reload(&self, client: &BackendClient) -> AppResult<usize> {
        self.cache.reload(client, &self.policy).await
    }
}
