//! Structural validation of blinded SQL against the schema allowlist.
//!
//! The validator is a deliberately lexical gate. It never builds an AST;
//! instead it runs an ordered series of checks over the literal-blinded text
//! and the **first failing check** decides the [`Rejection`]:
//!
//! | Step | Check | Rejection |
//! |------|-------|-----------|
//! | 1 | Statement starts with `SELECT` | `NotSelect` |
//! | 2 | No denylisted keyword or table-reading function | `DeniedKeyword` |
//! | 3 | Every FROM/JOIN source and `IN` table operand is `<namespace>.<table>` or a subquery | `WrongNamespace` |
//! | 4 | Table/alias extraction | - |
//! | 5 | Every referenced table is allowlisted with a loaded schema | `UnknownTable`, `SchemaUnavailable` |
//! | 6 | Every `alias.column` resolves to an allowlisted column | `UnknownColumn` |
//! | 7 | No bare column name while several tables are in scope | `AmbiguousColumn` |
//!
//! Validation is pure: it reads one immutable [`SchemaAllowlist`] snapshot and
//! performs no I/O, so any number of threads may validate concurrently.
//!
//! # Example
//!
//! ```
//! use nlq_sql_gate::{
//!     config::GateConfig, lexer::normalize, schema::SchemaAllowlist, validator::Validator
//! };
//!
//! let policy = GateConfig {
//!     namespace: "ns".into(),
//!     tables:    vec!["companies".into()],
//!     max_limit: 50
//! };
//! let allowlist = SchemaAllowlist::from_columns(
//!     &policy.tables,
//!     [("companies", "name"), ("companies", "company_id")]
//! );
//!
//! let normalized = normalize("SELECT c.name FROM ns.companies c").unwrap();
//! let tables = Validator::new(&policy, &allowlist)
//!     .validate(&normalized.blinded)
//!     .unwrap();
//!
//! assert_eq!(tables.aliases.get("c").map(|t| t.as_str()), Some("companies"));
//! ```

pub mod keywords;
pub mod scan;

use compact_str::CompactString;
use indexmap::{IndexMap, IndexSet};
use scan::{SourceKind, TableSource};

use crate::{config::GateConfig, rejection::Rejection, schema::SchemaAllowlist};

/// Alias (or bare table name) to unqualified table name, scoped to one query.
pub type AliasMap = IndexMap<CompactString, CompactString>;

/// Tables found in one query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTables {
    /// Alias and table-name resolution for qualified column references
    pub aliases:    AliasMap,
    /// Unqualified table names in order of first appearance
    pub referenced: IndexSet<CompactString>
}

/// Validator bound to a policy and one allowlist snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    policy:    &'a GateConfig,
    allowlist: &'a SchemaAllowlist
}

impl<'a> Validator<'a> {
    pub fn new(policy: &'a GateConfig, allowlist: &'a SchemaAllowlist) -> Self {
        Self {
            policy,
            allowlist
        }
    }

    /// Run every check over blinded SQL.
    ///
    /// # Errors
    ///
    /// The [`Rejection`] of the first failing check.
    pub fn validate(&self, blinded: &str) -> Result<QueryTables, Rejection> {
        let text = blinded.to_ascii_lowercase();
        check_shape(&text)?;
        check_keywords(&text)?;
        let sources = self.check_namespace(&text)?;
        let tables = self.extract_tables(&text, &sources);
        self.check_tables(&tables)?;
        self.check_qualified_columns(&text, &tables)?;
        self.check_ambiguity(&text, &tables)?;
        Ok(tables)
    }

    fn namespace(&self) -> &str {
        &self.policy.namespace
    }

    fn check_namespace(&self, text: &str) -> Result<Vec<TableSource>, Rejection> {
        let namespace = self.namespace();
        for operand in scan::in_operands(text) {
            match &operand.kind {
                SourceKind::Subquery | SourceKind::Other { .. } => {}
                SourceKind::Function {
                    name
                } if keywords::IN_VALUE_FUNCTIONS.contains(&name.as_str()) => {}
                SourceKind::Qualified {
                    namespace: qualifier,
                    ..
                } if qualifier == namespace => {}
                _ => return Err(self.wrong_namespace(&operand))
            }
        }
        let sources = scan::table_sources(text);
        let Some(first) = sources.first() else {
            return Ok(sources);
        };
        let has_prefix = scan::qualified_refs(text)
            .iter()
            .any(|r| r.left == namespace);
        if !has_prefix {
            return Err(self.wrong_namespace(first));
        }
        for source in &sources {
            match &source.kind {
                SourceKind::Subquery => {}
                SourceKind::Qualified {
                    namespace: qualifier,
                    ..
                } if qualifier == namespace => {}
                _ => return Err(self.wrong_namespace(source))
            }
        }
        Ok(sources)
    }

    fn wrong_namespace(&self, source: &TableSource) -> Rejection {
        Rejection::WrongNamespace {
            namespace: self.policy.namespace.clone(),
            found:     source.describe()
        }
    }

    fn extract_tables(&self, text: &str, sources: &[TableSource]) -> QueryTables {
        let mut tables = QueryTables::default();
        for source in sources {
            if let SourceKind::Qualified {
                table, ..
            } = &source.kind
            {
                let table = CompactString::from(table.as_str());
                tables.aliases.insert(table.clone(), table.clone());
                if let Some(alias) = &source.alias {
                    tables.aliases.insert(CompactString::from(alias.as_str()), table);
                }
            }
        }
        for reference in scan::qualified_refs(text) {
            if reference.left == self.namespace() {
                tables.referenced.insert(reference.right.into());
            }
        }
        tables
    }

    fn check_tables(&self, tables: &QueryTables) -> Result<(), Rejection> {
        if self.allowlist.is_empty() {
            let table = tables
                .referenced
                .first()
                .map(|t| t.to_string())
                .unwrap_or_else(|| String::from("*"));
            return Err(Rejection::SchemaUnavailable {
                table
            });
        }
        for table in &tables.referenced {
            match self.allowlist.columns(table) {
                Some(columns) if !columns.is_empty() => {}
                Some(_) => {
                    return Err(Rejection::SchemaUnavailable {
                        table: table.to_string()
                    });
                }
                None if self.policy.is_designated(table) => {
                    return Err(Rejection::SchemaUnavailable {
                        table: table.to_string()
                    });
                }
                None => {
                    return Err(Rejection::UnknownTable {
                        table: table.to_string()
                    });
                }
            }
        }
        Ok(())
    }

    fn resolve(&self, tables: &QueryTables, name: &str) -> Option<CompactString> {
        tables.aliases.get(name).cloned().or_else(|| {
            self.allowlist
                .contains_table(name)
                .then(|| CompactString::from(name))
        })
    }

    fn check_qualified_columns(&self, text: &str, tables: &QueryTables) -> Result<(), Rejection> {
        for reference in scan::qualified_refs(text) {
            if reference.left == self.namespace() {
                continue;
            }
            let Some(table) = self.resolve(tables, reference.left) else {
                continue;
            };
            if !self.allowlist.has_column(&table, reference.right) {
                return Err(Rejection::UnknownColumn {
                    column: format!("{}.{}", reference.left, reference.right)
                });
            }
        }
        Ok(())
    }

    fn check_ambiguity(&self, text: &str, tables: &QueryTables) -> Result<(), Rejection> {
        if tables.referenced.len() < 2 {
            return Ok(());
        }
        let in_scope: Vec<_> = tables
            .referenced
            .iter()
            .filter_map(|table| self.allowlist.columns(table))
            .collect();
        for token in scan::bare_identifiers(text) {
            if keywords::is_keyword(token)
                || token == self.namespace()
                || tables.aliases.contains_key(token)
                || self.allowlist.contains_table(token)
            {
                continue;
            }
            if in_scope.iter().any(|columns| columns.contains(token)) {
                return Err(Rejection::AmbiguousColumn {
                    column: token.to_string()
                });
            }
        }
        Ok(())
    }
}

fn check_shape(text: &str) -> Result<(), Rejection> {
    if scan::starts_with_select(text) {
        Ok(())
    } else {
        Err(Rejection::not_select("statement must start with SELECT"))
    }
}

fn check_keywords(text: &str) -> Result<(), Rejection> {
    match scan::find_denied_keyword(text).or_else(|| scan::find_denied_function(text)) {
        Some(keyword) => Err(Rejection::DeniedKeyword {
            keyword: keyword.to_string()
        }),
        None => Ok(())
    }
}
