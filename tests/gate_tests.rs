use std::{sync::Arc, thread};

use nlq_sql_gate::{
    config::GateConfig,
    gate::SqlGate,
    rejection::{RejectKind, Rejection},
    schema::{SchemaAllowlist, SchemaCache}
};

fn policy() -> GateConfig {
    GateConfig {
        namespace: "ns".into(),
        tables:    vec!["companies".into(), "stints".into(), "persons".into()],
        max_limit: 50
    }
}

fn full_allowlist() -> SchemaAllowlist {
    SchemaAllowlist::from_columns(&policy().tables, [
        ("companies", "name"),
        ("companies", "company_id"),
        ("stints", "person_id"),
        ("stints", "title"),
        ("persons", "id"),
        ("persons", "full_name")
    ])
}

fn gate() -> SqlGate {
    SqlGate::new(policy(), Arc::new(SchemaCache::with_allowlist(full_allowlist())))
}

#[test]
fn test_scenario_single_table() {
    let query = gate().prepare("SELECT name FROM ns.companies LIMIT 10").unwrap();
    assert!(query.as_str().ends_with("LIMIT 10 FORMAT JSONEachRow"));
}

#[test]
fn test_scenario_qualified_join() {
    let query = gate()
        .prepare(
            "SELECT p.full_name, s.title FROM ns.stints s JOIN ns.persons p ON p.id = s.person_id"
        )
        .unwrap();
    assert_eq!(
        query.as_str(),
        "SELECT p.full_name, s.title FROM ns.stints s JOIN ns.persons p ON p.id = s.person_id LIMIT 50 FORMAT JSONEachRow"
    );
}

#[test]
fn test_scenario_ambiguous_join() {
    let err = gate()
        .prepare("SELECT full_name FROM ns.stints s JOIN ns.persons p ON p.id = s.person_id")
        .unwrap_err();
    assert_eq!(err.kind(), RejectKind::AmbiguousColumn);
}

#[test]
fn test_scenario_update() {
    let err = gate().prepare("UPDATE ns.companies SET name='x'").unwrap_err();
    assert_eq!(err.kind(), RejectKind::NotSelect);
}

#[test]
fn test_empty_query() {
    assert_eq!(gate().prepare("  ;; ").unwrap_err(), Rejection::EmptyQuery);
}

#[test]
fn test_limit_capped_through_gate() {
    let query = gate().prepare("SELECT name FROM ns.companies LIMIT 500").unwrap();
    assert_eq!(query.as_str(), "SELECT name FROM ns.companies LIMIT 50 FORMAT JSONEachRow");
}

#[test]
fn test_fresh_cache_rejects_until_loaded() {
    let gate = SqlGate::new(policy(), Arc::new(SchemaCache::new()));
    let sql = "SELECT name FROM ns.companies";
    assert_eq!(gate.prepare(sql).unwrap_err().kind(), RejectKind::SchemaUnavailable);

    gate.cache().replace(full_allowlist());
    assert!(gate.prepare(sql).is_ok());
}

#[test]
fn test_reload_replaces_instead_of_merging() {
    let gate = gate();
    let only_persons =
        SchemaAllowlist::from_columns(&policy().tables, [("persons", "id"), ("persons", "full_name")]);
    gate.cache().replace(only_persons);

    let err = gate.prepare("SELECT name FROM ns.companies").unwrap_err();
    assert_eq!(err, Rejection::SchemaUnavailable {
        table: "companies".into()
    });
    assert!(gate.prepare("SELECT full_name FROM ns.persons").is_ok());
}

#[test]
fn test_concurrent_prepare_during_replace() {
    let gate = Arc::new(gate());
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                for _ in 0..200 {
                    match gate.prepare("SELECT c.name FROM ns.companies c") {
                        Ok(query) => assert!(query.as_str().ends_with("FORMAT JSONEachRow")),
                        Err(err) => assert_eq!(err.kind(), RejectKind::SchemaUnavailable)
                    }
                }
            })
        })
        .collect();
    for i in 0..200 {
        if i % 2 == 0 {
            gate.cache().clear();
        } else {
            gate.cache().replace(full_allowlist());
        }
    }
    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn test_rejection_names_only_offending_item() {
    let err = gate().prepare("SELECT c.salary FROM ns.companies c").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("c.salary"));
    assert!(!message.contains("company_id"));
}

#[test]
fn test_escaped_backtick_cannot_hide_system_table() {
    let err = gate()
        .prepare(
            r"SELECT name AS `a\`' FROM system.users FORMAT JSONEachRow -- ' FROM ns.companies"
        )
        .unwrap_err();
    assert_eq!(err.kind(), RejectKind::NotSelect);
}

#[test]
fn test_hash_comment_cannot_swallow_limit() {
    let query = gate()
        .prepare("SELECT name FROM ns.companies FORMAT JSONEachRow # x")
        .unwrap();
    assert_eq!(query.as_str(), "SELECT name FROM ns.companies LIMIT 50 FORMAT JSONEachRow");
}

#[test]
fn test_heredoc_rejected() {
    let err = gate()
        .prepare("SELECT name FROM ns.companies WHERE name = $$x$$")
        .unwrap_err();
    assert_eq!(err.kind(), RejectKind::NotSelect);
}

#[test]
fn test_limit_expression_capped() {
    let query = gate()
        .prepare("SELECT name FROM ns.companies LIMIT 1 * 100000")
        .unwrap();
    assert_eq!(query.as_str(), "SELECT name FROM ns.companies LIMIT 50 FORMAT JSONEachRow");
    let query = gate().prepare("SELECT name FROM ns.companies LIMIT (500)").unwrap();
    assert_eq!(query.as_str(), "SELECT name FROM ns.companies LIMIT 50 FORMAT JSONEachRow");
}

#[test]
fn test_union_bounded_as_a_whole() {
    let query = gate()
        .prepare("SELECT name FROM ns.companies LIMIT 5 UNION ALL SELECT name FROM ns.companies")
        .unwrap();
    assert!(query.as_str().starts_with("SELECT * FROM (SELECT name FROM ns.companies LIMIT 5"));
    assert!(query.as_str().ends_with(") LIMIT 50 FORMAT JSONEachRow"));
}
