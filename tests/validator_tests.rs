use nlq_sql_gate::{
    config::GateConfig,
    lexer::normalize,
    rejection::{RejectKind, Rejection},
    schema::SchemaAllowlist,
    validator::{QueryTables, Validator}
};

fn policy() -> GateConfig {
    GateConfig {
        namespace: "ns".into(),
        tables:    vec![
            "companies".into(),
            "stints".into(),
            "persons".into(),
            "pending".into(),
        ],
        max_limit: 50
    }
}

fn allowlist() -> SchemaAllowlist {
    SchemaAllowlist::from_columns(&policy().tables, [
        ("companies", "company_id"),
        ("companies", "name"),
        ("stints", "person_id"),
        ("stints", "company_id"),
        ("stints", "title"),
        ("persons", "id"),
        ("persons", "full_name")
    ])
}

fn validate(sql: &str) -> Result<QueryTables, Rejection> {
    let normalized = normalize(sql)?;
    Validator::new(&policy(), &allowlist()).validate(&normalized.blinded)
}

fn kind(sql: &str) -> RejectKind {
    validate(sql).unwrap_err().kind()
}

#[test]
fn test_single_table_accepted() {
    let tables = validate("SELECT name FROM ns.companies LIMIT 10").unwrap();
    assert!(tables.referenced.contains("companies"));
}

#[test]
fn test_qualified_join_accepted() {
    let tables = validate(
        "SELECT p.full_name, s.title FROM ns.stints s JOIN ns.persons p ON p.id = s.person_id"
    )
    .unwrap();
    assert_eq!(tables.referenced.len(), 2);
    assert_eq!(tables.aliases.get("s").map(|t| t.as_str()), Some("stints"));
    assert_eq!(tables.aliases.get("p").map(|t| t.as_str()), Some("persons"));
}

#[test]
fn test_bare_column_in_join_is_ambiguous() {
    let err = validate(
        "SELECT full_name FROM ns.stints s JOIN ns.persons p ON p.id = s.person_id"
    )
    .unwrap_err();
    assert_eq!(err, Rejection::AmbiguousColumn {
        column: "full_name".into()
    });
}

#[test]
fn test_update_is_not_select() {
    assert_eq!(kind("UPDATE ns.companies SET name='x'"), RejectKind::NotSelect);
}

#[test]
fn test_non_select_statements() {
    for sql in [
        "INSERT INTO ns.companies VALUES (1)",
        "  with x as (select 1) select * from x",
        "SHOW TABLES",
        "DESCRIBE ns.companies"
    ] {
        assert_eq!(kind(sql), RejectKind::NotSelect, "{}", sql);
    }
}

#[test]
fn test_lowercase_select_accepted() {
    assert!(validate("select name from ns.companies;").is_ok());
}

#[test]
fn test_denied_keyword_outside_literal() {
    let err = validate("SELECT name FROM ns.companies WHERE name IN (SELECT name FROM system.tables)")
        .unwrap_err();
    assert_eq!(err, Rejection::DeniedKeyword {
        keyword: "system".into()
    });
}

#[test]
fn test_denied_keyword_inside_literal_accepted() {
    assert!(validate("SELECT name FROM ns.companies WHERE name = 'Drop Table Inc'").is_ok());
    assert!(validate("SELECT name FROM ns.companies WHERE name = 'delete; insert'").is_ok());
}

#[test]
fn test_denied_keyword_whole_word_only() {
    assert!(validate("SELECT c.name AS updated_name FROM ns.companies c").is_ok());
}

#[test]
fn test_comment_cannot_hide_keyword() {
    assert!(validate("SELECT name FROM ns.companies -- drop later").is_ok());
    assert_eq!(
        kind("SELECT name FROM ns.companies /* x */ SETTINGS max_threads = 1 /* y */ FORMAT TSV INTO OUTFILE 'a'"),
        RejectKind::DeniedKeyword
    );
}

#[test]
fn test_missing_namespace() {
    let err = validate("SELECT name FROM companies").unwrap_err();
    assert_eq!(err, Rejection::WrongNamespace {
        namespace: "ns".into(),
        found:     "companies".into()
    });
}

#[test]
fn test_cross_namespace_source_rejected() {
    let err = validate("SELECT c.name FROM ns.companies c JOIN other.secrets s ON 1 = 1").unwrap_err();
    assert_eq!(err, Rejection::WrongNamespace {
        namespace: "ns".into(),
        found:     "other.secrets".into()
    });
}

#[test]
fn test_table_function_rejected() {
    assert_eq!(
        kind("SELECT * FROM url('http://x', CSV) WHERE ns.companies.name = ''"),
        RejectKind::WrongNamespace
    );
}

#[test]
fn test_subquery_source_accepted() {
    assert!(validate("SELECT x.name FROM (SELECT c.name FROM ns.companies c) x").is_ok());
}

#[test]
fn test_extract_from_is_not_a_source() {
    assert!(validate("SELECT extract(year FROM now()) FROM ns.companies").is_ok());
}

#[test]
fn test_unknown_table() {
    let err = validate("SELECT salary FROM ns.payroll").unwrap_err();
    assert_eq!(err, Rejection::UnknownTable {
        table: "payroll".into()
    });
}

#[test]
fn test_designated_table_without_schema_unavailable() {
    let err = validate("SELECT x FROM ns.pending").unwrap_err();
    assert_eq!(err, Rejection::SchemaUnavailable {
        table: "pending".into()
    });
}

#[test]
fn test_empty_allowlist_rejects_everything() {
    let empty = SchemaAllowlist::default();
    let policy = policy();
    let validator = Validator::new(&policy, &empty);
    let normalized = normalize("SELECT name FROM ns.companies").unwrap();
    assert_eq!(
        validator.validate(&normalized.blinded).unwrap_err(),
        Rejection::SchemaUnavailable {
            table: "companies".into()
        }
    );
    let normalized = normalize("SELECT 1").unwrap();
    assert_eq!(
        validator.validate(&normalized.blinded).unwrap_err().kind(),
        RejectKind::SchemaUnavailable
    );
}

#[test]
fn test_unknown_qualified_column() {
    let err = validate("SELECT c.salary FROM ns.companies c").unwrap_err();
    assert_eq!(err, Rejection::UnknownColumn {
        column: "c.salary".into()
    });
}

#[test]
fn test_table_name_as_qualifier() {
    assert!(validate("SELECT companies.name FROM ns.companies").is_ok());
    assert_eq!(kind("SELECT companies.ceo FROM ns.companies"), RejectKind::UnknownColumn);
}

#[test]
fn test_fully_qualified_column() {
    assert!(validate("SELECT ns.companies.name FROM ns.companies").is_ok());
    assert_eq!(
        kind("SELECT ns.companies.ceo FROM ns.companies"),
        RejectKind::UnknownColumn
    );
}

#[test]
fn test_identifiers_are_case_insensitive() {
    assert!(validate("SELECT C.Name FROM NS.Companies C").is_ok());
}

#[test]
fn test_bare_columns_single_table_not_ambiguous() {
    assert!(validate("SELECT name, company_id FROM ns.companies WHERE name != ''").is_ok());
}

#[test]
fn test_backtick_quoted_columns_checked() {
    assert_eq!(
        kind("SELECT `p`.`salary` FROM ns.persons p"),
        RejectKind::UnknownColumn
    );
}

#[test]
fn test_in_operand_outside_namespace_rejected() {
    let err = validate("SELECT name FROM ns.companies WHERE name IN other.secrets").unwrap_err();
    assert_eq!(err, Rejection::WrongNamespace {
        namespace: "ns".into(),
        found:     "other.secrets".into()
    });
    assert_eq!(
        kind("SELECT name FROM ns.companies WHERE name GLOBAL NOT IN secrets"),
        RejectKind::WrongNamespace
    );
    assert_eq!(kind("SELECT 1 WHERE 1 IN other.t"), RejectKind::WrongNamespace);
}

#[test]
fn test_in_operand_inside_namespace_accepted() {
    assert!(validate("SELECT name FROM ns.companies WHERE name IN ns.persons").is_ok());
    assert!(validate("SELECT name FROM ns.companies WHERE name IN ('a', 'b')").is_ok());
    assert!(validate("SELECT name FROM ns.companies WHERE name IN tuple('a', 'b')").is_ok());
    assert!(validate("SELECT position(name IN 'x') FROM ns.companies").is_ok());
}

#[test]
fn test_table_reading_functions_denied() {
    let err = validate("SELECT joinGet('other.secrets', 'v', name) FROM ns.companies").unwrap_err();
    assert_eq!(err, Rejection::DeniedKeyword {
        keyword: "joinget".into()
    });
    assert_eq!(
        kind("SELECT dictGetString('users', 'password', toUInt64(1)) FROM ns.companies"),
        RejectKind::DeniedKeyword
    );
}

#[test]
fn test_settings_clause_denied() {
    assert_eq!(
        kind("SELECT name FROM ns.companies SETTINGS max_result_rows = 0"),
        RejectKind::DeniedKeyword
    );
}
