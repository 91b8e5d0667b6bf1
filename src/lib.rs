//! # NLQ SQL Gate
//!
//! Schema-allowlist gatekeeper for model-generated SQL.
//!
//! A natural-language query interface lets a language model write SELECT
//! statements against ClickHouse. Nothing the model writes is trusted: every
//! candidate goes through this gate, which either rejects it with a
//! structured [`Rejection`](rejection::Rejection) or rewrites it into a
//! canonical query that
//!
//! - reads only designated tables under one database namespace,
//! - names only allowlisted columns,
//! - carries a `LIMIT` no larger than the configured maximum,
//! - ends with `FORMAT JSONEachRow`.
//!
//! The gate is lexical. It never parses SQL into an AST; it blinds string
//! literals and scans the remaining text. Anything it cannot vouch for is
//! rejected, and the backend's own errors are mapped onto the same rejection
//! kinds.
//!
//! # Quick Start
//!
//! ```bash
//! # Offline check against an allowlist file
//! nlq-sql-gate check --allowlist allowlist.toml -q "SELECT name FROM via_test.companies"
//!
//! # Introspect the backend, validate and execute
//! export CLICKHOUSE_HTTP_BASE=http://localhost:8123
//! nlq-sql-gate run -q "SELECT name FROM via_test.companies LIMIT 5" -o json
//!
//! # Show the loaded allowlist
//! nlq-sql-gate schema
//! ```
//!
//! # Library Use
//!
//! ```
//! use std::sync::Arc;
//!
//! use nlq_sql_gate::{
//!     config::GateConfig,
//!     gate::SqlGate,
//!     rejection::Rejection,
//!     schema::{SchemaAllowlist, SchemaCache}
//! };
//!
//! let policy = GateConfig::default();
//! let allowlist = SchemaAllowlist::from_columns(&policy.tables, [
//!     ("companies", "company_id_64"),
//!     ("companies", "name"),
//!     ("persons_large", "person_id_64"),
//!     ("persons_large", "full_name")
//! ]);
//! let gate = SqlGate::new(policy, Arc::new(SchemaCache::with_allowlist(allowlist)));
//!
//! let err = gate
//!     .prepare("SELECT name FROM via_test.companies c JOIN via_test.persons_large p ON 1 = 1")
//!     .unwrap_err();
//! assert_eq!(err, Rejection::AmbiguousColumn {
//!     column: "name".into()
//! });
//! ```
//!
//! # Modules
//!
//! | Module | Role |
//! |--------|------|
//! | [`lexer`] | Terminators, comments, literal blinding |
//! | [`validator`] | Ordered structural checks |
//! | [`canonical`] | Row limit and output format rewrite |
//! | [`schema`] | Allowlist and its fail-closed cache |
//! | [`backend`] | ClickHouse HTTP adapter |
//! | [`gate`] | The pipeline tying them together |

pub mod app;
pub mod backend;
pub mod canonical;
pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod lexer;
pub mod output;
pub mod rejection;
pub mod schema;
pub mod validator;
