//! ClickHouse HTTP execution adapter.
//!
//! Sends a canonical query as a plain-text POST body and decodes the
//! `JSONEachRow` response, one JSON object per line. Backend errors are
//! classified into the same [`Rejection`] taxonomy the validator uses, which
//! backs up the lexical checks when they miss something.
//!
//! There is no retry: a timeout or transport failure is returned to the
//! caller as [`Rejection::BackendError`].
//!
//! # Example
//!
//! ```
//! use nlq_sql_gate::{backend::decode_rows, rejection::RejectKind};
//!
//! let rows = decode_rows("{\"name\":\"Acme\"}\n\n{\"name\":\"Globex\"}\n").unwrap();
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[1]["name"], "Globex");
//!
//! let err = decode_rows("{\"name\":").unwrap_err();
//! assert_eq!(err.kind(), RejectKind::BackendError);
//! ```

use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};

use crate::{
    canonical::CanonicalQuery,
    config::BackendConfig,
    error::{AppResult, describe_transport_error, http_error, truncate_message},
    rejection::Rejection
};

/// One decoded result row.
pub type Row = Map<String, Value>;

static MISSING_COLUMNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)missing columns:\s*'([^']+)'").expect("valid regex"));

static UNKNOWN_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)unknown (?:expression )?identifier[:\s]+[`'\x22]?([\w.]+)").expect("valid regex")
});

static NO_SUCH_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)there(?:'s| is) no column [`'\x22]?([\w.]+)").expect("valid regex")
});

static UNKNOWN_TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)table [`'\x22]?([\w.]+)[`'\x22]? (?:doesn't|does not) exist").expect("valid regex")
});

/// HTTP client bound to one backend endpoint.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client:   reqwest::Client,
    endpoint: String,
    user:     Option<String>,
    password: Option<String>
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(http_error)?;
        Ok(Self {
            client,
            endpoint: format!("{}/", config.url.trim_end_matches('/')),
            user: config.user.clone(),
            password: config.password.clone()
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute a validated query and decode its rows.
    pub async fn execute(&self, query: &CanonicalQuery) -> Result<Vec<Row>, Rejection> {
        self.fetch_rows(query.as_str()).await
    }

    /// Execute SQL that has not gone through the gate.
    ///
    /// Only used for metadata introspection, which reads `system.columns`.
    pub(crate) async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>, Rejection> {
        let body = self.post(sql).await?;
        decode_rows(&body).inspect_err(|e| {
            tracing::warn!(
                audit = true,
                error = %e,
                "Backend response could not be decoded; possible validator gap"
            );
        })
    }

    async fn post(&self, sql: &str) -> Result<String, Rejection> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(sql.to_owned());
        if let Some(user) = &self.user {
            request = request.header("X-ClickHouse-User", user);
        }
        if let Some(password) = &self.password {
            request = request.header("X-ClickHouse-Key", password);
        }
        let response = request.send().await.map_err(|e| {
            let message = describe_transport_error(&e);
            tracing::warn!(error = %message, "Backend request failed");
            Rejection::backend(message)
        })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Rejection::backend(describe_transport_error(&e)))?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Backend rejected query");
            return Err(classify_backend_error(&text));
        }
        Ok(text)
    }
}

/// Decode a `JSONEachRow` body. Blank lines are skipped; any malformed line
/// fails the whole response.
pub fn decode_rows(body: &str) -> Result<Vec<Row>, Rejection> {
    let mut rows = Vec::new();
    for (index, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(row)) => rows.push(row),
            Ok(_) => {
                return Err(Rejection::backend(format!(
                    "Failed to parse backend response: line {} is not a JSON object",
                    index + 1
                )));
            }
            Err(e) => {
                return Err(Rejection::backend(format!(
                    "Failed to parse backend response: line {}: {}",
                    index + 1,
                    e
                )));
            }
        }
    }
    Ok(rows)
}

/// Map a backend error message onto the rejection taxonomy.
pub fn classify_backend_error(message: &str) -> Rejection {
    let lower = message.to_ascii_lowercase();
    let column = MISSING_COLUMNS
        .captures(message)
        .or_else(|| UNKNOWN_IDENTIFIER.captures(message))
        .or_else(|| NO_SUCH_COLUMN.captures(message))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());
    if column.is_some()
        || lower.contains("unknown_identifier")
        || lower.contains("no_such_column")
        || lower.contains("unknown identifier")
    {
        return Rejection::UnknownColumn {
            column: column.unwrap_or_else(|| String::from("unknown"))
        };
    }
    let table = UNKNOWN_TABLE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| unqualified(m.as_str()).to_string());
    if table.is_some() || lower.contains("unknown_table") || lower.contains("unknown table") {
        return Rejection::UnknownTable {
            table: table.unwrap_or_else(|| String::from("unknown"))
        };
    }
    Rejection::backend(truncate_message(message))
}

fn unqualified(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
