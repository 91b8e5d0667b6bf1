// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use nlq_sql_gate::{config::GateConfig, schema::{SchemaAllowlist, introspection_query}};

fn designated() -> Vec<String> {
    vec!["companies".to_string(), "stints".to_string()]
}

#[test]
fn test_from_columns_lowercases() {
    let allowlist = SchemaAllowlist::from_columns(&designated(), [("Companies", " Name ")]);
    assert!(allowlist.has_column("companies", "name"));
}

#[test]
fn test_from_columns_drops_undesignated_tables() {
    let allowlist =
        SchemaAllowlist::from_columns(&designated(), [("companies", "name"), ("secrets", "key")]);
    assert_eq!(allowlist.len(), 1);
    assert!(!allowlist.contains_table("secrets"));
}

#[test]
fn test_from_toml() {
    let content = r#"
[tables]
companies = ["company_id", "name"]
stints = ["person_id", "title"]
"#;
    let allowlist = SchemaAllowlist::from_toml_str("allowlist.toml", content, &designated()).unwrap();
    assert_eq!(allowlist.len(), 2);
    assert!(allowlist.has_column("stints", "title"));
    assert!(!allowlist.has_column("stints", "name"));
}

#[test]
fn test_from_toml_empty_file() {
    let allowlist = SchemaAllowlist::from_toml_str("allowlist.toml", "", &designated()).unwrap();
    assert!(allowlist.is_empty());
}

#[test]
fn test_from_toml_invalid() {
    let result = SchemaAllowlist::from_toml_str("bad.toml", "[tables\n", &designated());
    assert!(result.is_err());
    let wrong_type = SchemaAllowlist::from_toml_str("bad.toml", "tables = 3", &designated());
    assert!(wrong_type.is_err());
}

#[test]
fn test_table_names_sorted() {
    let allowlist =
        SchemaAllowlist::from_columns(&designated(), [("stints", "title"), ("companies", "name")]);
    let names: Vec<&str> = allowlist.table_names().collect();
    assert_eq!(names, ["companies", "stints"]);
}

#[test]
fn test_serializes_as_table_map() {
    let allowlist = SchemaAllowlist::from_columns(&designated(), [
        ("companies", "name"),
        ("companies", "company_id")
    ]);
    let json = serde_json::to_value(&allowlist).unwrap();
    assert_eq!(json["tables"]["companies"], serde_json::json!(["company_id", "name"]));
}

#[test]
fn test_introspection_query_uses_policy() {
    let policy = GateConfig {
        namespace: "analytics".into(),
        tables:    vec!["orders".into()],
        max_limit: 10
    };
    assert_eq!(
        introspection_query(&policy),
        "SELECT table, name FROM system.columns WHERE database = 'analytics' AND table IN ('orders') FORMAT JSONEachRow"
    );
}
