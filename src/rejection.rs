//! Rejection taxonomy shared by every stage of the gate.
//!
//! A [`Rejection`] is a terminal, user-facing outcome: the candidate query
//! will not be executed. Each variant carries the single identifier that
//! caused it, so callers can explain the failure without exposing the rest
//! of the allowlist.
//!
//! # Example
//!
//! ```
//! use nlq_sql_gate::rejection::{RejectKind, Rejection};
//!
//! let rejection = Rejection::UnknownTable {
//!     table: "salaries".into()
//! };
//!
//! assert_eq!(rejection.kind(), RejectKind::UnknownTable);
//! assert_eq!(rejection.kind().code(), "unknown_table");
//! assert!(rejection.to_string().contains("salaries"));
//! ```

use std::fmt;

use masterror::{AppError, Error};
use serde::Serialize;

/// Why a candidate query was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    /// Input is blank after trimming comments and terminators
    #[error("Query must not be empty")]
    EmptyQuery,
    /// Not a single SELECT statement
    #[error("Only SELECT queries are allowed: {reason}")]
    NotSelect { reason: String },
    /// A mutate or administrative keyword appeared outside string literals
    #[error("Query contains disallowed keyword '{keyword}'")]
    DeniedKeyword { keyword: String },
    /// A table source is missing the required namespace prefix
    #[error("Queries must reference tables under the '{namespace}.' namespace (found '{found}')")]
    WrongNamespace { namespace: String, found: String },
    /// Referenced table is not in the allowlist
    #[error("Table not in allowlist: {table}")]
    UnknownTable { table: String },
    /// Allowlist has no column schema for the table (or nothing loaded at all)
    #[error("Schema unavailable for table '{table}'; retry after the schema is reloaded")]
    SchemaUnavailable { table: String },
    /// Qualified column reference does not exist in its resolved table
    #[error("Column not in allowlist: {column}")]
    UnknownColumn { column: String },
    /// Unqualified column while more than one table is in scope
    #[error("Ambiguous column '{column}': qualify it with a table alias")]
    AmbiguousColumn { column: String },
    /// Backend refused or failed the canonical query
    #[error("Backend error: {message}")]
    BackendError { message: String }
}

/// Field-less discriminant of [`Rejection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RejectKind {
    EmptyQuery,
    NotSelect,
    DeniedKeyword,
    WrongNamespace,
    UnknownTable,
    SchemaUnavailable,
    UnknownColumn,
    AmbiguousColumn,
    BackendError
}

impl RejectKind {
    /// Stable snake_case code, identical to the serialized `kind` tag.
    pub fn code(self) -> &'static str {
        match self {
            Self::EmptyQuery => "empty_query",
            Self::NotSelect => "not_select",
            Self::DeniedKeyword => "denied_keyword",
            Self::WrongNamespace => "wrong_namespace",
            Self::UnknownTable => "unknown_table",
            Self::SchemaUnavailable => "schema_unavailable",
            Self::UnknownColumn => "unknown_column",
            Self::AmbiguousColumn => "ambiguous_column",
            Self::BackendError => "backend_error"
        }
    }
}

impl fmt::Display for RejectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Rejection {
    pub fn kind(&self) -> RejectKind {
        match self {
            Self::EmptyQuery => RejectKind::EmptyQuery,
            Self::NotSelect {
                ..
            } => RejectKind::NotSelect,
            Self::DeniedKeyword {
                ..
            } => RejectKind::DeniedKeyword,
            Self::WrongNamespace {
                ..
            } => RejectKind::WrongNamespace,
            Self::UnknownTable {
                ..
            } => RejectKind::UnknownTable,
            Self::SchemaUnavailable {
                ..
            } => RejectKind::SchemaUnavailable,
            Self::UnknownColumn {
                ..
            } => RejectKind::UnknownColumn,
            Self::AmbiguousColumn {
                ..
            } => RejectKind::AmbiguousColumn,
            Self::BackendError {
                ..
            } => RejectKind::BackendError
        }
    }

    /// The identifier the rejection is about, if it names one.
    pub fn offending(&self) -> Option<&str> {
        match self {
            Self::DeniedKeyword {
                keyword
            } => Some(keyword),
            Self::WrongNamespace {
                found, ..
            } => Some(found),
            Self::UnknownTable {
                table
            }
            | Self::SchemaUnavailable {
                table
            } => Some(table),
            Self::UnknownColumn {
                column
            }
            | Self::AmbiguousColumn {
                column
            } => Some(column),
            Self::EmptyQuery
            | Self::NotSelect {
                ..
            }
            | Self::BackendError {
                ..
            } => None
        }
    }

    pub(crate) fn not_select(reason: impl Into<String>) -> Self {
        Self::NotSelect {
            reason: reason.into()
        }
    }

    pub(crate) fn backend(message: impl Into<String>) -> Self {
        Self::BackendError {
            message: message.into()
        }
    }
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::BackendError {
                ..
            } => AppError::service(rejection.to_string()),
            other => AppError::bad_request(other.to_string())
        }
    }
}
