use std::path::PathBuf;

use config_reconcile_core::{parse, write};
use pfsense_reconcile::compile::Action;
use pfsense_reconcile::gateway::SnapshotGateway;
use pfsense_reconcile::group::{GroupSpec, UserGroup};
use pfsense_reconcile::reconcile::Reconciler;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn snapshot() -> SnapshotGateway {
    SnapshotGateway::open(&fixture("fixtures/pfsense-min.xml")).expect("open fixture")
}

fn staff(privileges: &[&str]) -> GroupSpec {
    GroupSpec {
        name: Some("Staff".to_string()),
        description: Some("Help desk".to_string()),
        privileges: Some(privileges.iter().map(ToString::to_string).collect()),
        ..GroupSpec::default()
    }
}

fn group(spec: &GroupSpec) -> UserGroup {
    UserGroup::from_spec(spec).expect("valid group")
}

fn find<'a>(entities: &'a [Value], name: &str) -> Option<&'a Value> {
    entities.iter().find(|entity| entity["name"] == json!(name))
}

#[test]
fn created_group_takes_next_gid() {
    let mut gateway = snapshot();
    let outcome = Reconciler::new(&mut gateway)
        .reconcile(&group(&staff(&["page-dashboard-all", "page-help-all"])))
        .expect("create");

    assert_eq!(outcome.action, Action::Create);
    assert!(outcome.script.contains("$group['gid'] = '2000';"));
    assert!(outcome.script.contains("$config['system']['nextgid']++;"));
    assert!(!outcome.script.contains("mark_subsystem_dirty"));

    let entities = outcome.entities.expect("entities");
    let created = find(&entities, "Staff").expect("created group");
    assert_eq!(created["gid"], json!("2000"));
    assert_eq!(created["scope"], json!("remote"));
    assert_eq!(
        created["priv"],
        json!(["page-dashboard-all", "page-help-all"])
    );
    assert_eq!(gateway.tree().section("system").counter("nextgid"), Some(2001));
}

#[test]
fn privilege_order_and_duplicates_do_not_matter() {
    let mut gateway = snapshot();
    Reconciler::new(&mut gateway)
        .reconcile(&group(&staff(&["page-dashboard-all", "page-help-all"])))
        .expect("create");

    let shuffled = staff(&["page-help-all", "page-dashboard-all", "page-help-all"]);
    let outcome = Reconciler::new(&mut gateway)
        .reconcile(&group(&shuffled))
        .expect("second run");
    assert!(!outcome.changed);
    assert_eq!(outcome.action, Action::None);
}

#[test]
fn narrowing_privileges_is_an_update() {
    let mut gateway = snapshot();
    Reconciler::new(&mut gateway)
        .reconcile(&group(&staff(&["page-dashboard-all", "page-help-all"])))
        .expect("create");

    let outcome = Reconciler::new(&mut gateway)
        .reconcile(&group(&staff(&["page-help-all"])))
        .expect("update");
    assert_eq!(outcome.action, Action::Update);
    assert_eq!(outcome.changed_fields, vec!["priv".to_string()]);

    let entities = outcome.entities.expect("entities");
    assert_eq!(
        find(&entities, "Staff").expect("group")["priv"],
        json!(["page-help-all"])
    );
}

#[test]
fn gid_is_never_rewritten() {
    let mut gateway = snapshot();
    Reconciler::new(&mut gateway)
        .reconcile(&group(&staff(&["page-help-all"])))
        .expect("create");

    let renamed = GroupSpec {
        description: Some("Support staff".to_string()),
        scope: Some("local".to_string()),
        ..staff(&["page-help-all"])
    };
    let outcome = Reconciler::new(&mut gateway)
        .reconcile(&group(&renamed))
        .expect("update");

    assert_eq!(outcome.action, Action::Update);
    assert!(!outcome.script.contains("gid"));
    let entities = outcome.entities.expect("entities");
    assert_eq!(find(&entities, "Staff").expect("group")["gid"], json!("2000"));
    assert_eq!(gateway.tree().section("system").counter("nextgid"), Some(2001));
}

#[test]
fn existing_group_with_single_privilege_matches() {
    let mut gateway = snapshot();
    let admins = GroupSpec {
        name: Some("admins".to_string()),
        description: Some("System Administrators".to_string()),
        scope: Some("local".to_string()),
        privileges: Some(vec!["page-all".to_string()]),
        ..GroupSpec::default()
    };
    let outcome = Reconciler::new(&mut gateway)
        .reconcile(&group(&admins))
        .expect("reconcile");

    // Only the scope differs: the fixture has the built-in `system` scope.
    assert_eq!(outcome.changed_fields, vec!["scope".to_string()]);
}

#[test]
fn absent_group_is_removed() {
    let mut gateway = snapshot();
    Reconciler::new(&mut gateway)
        .reconcile(&group(&staff(&["page-help-all"])))
        .expect("create");

    let gone = GroupSpec {
        state: Some("absent".to_string()),
        ..staff(&["page-help-all"])
    };
    let outcome = Reconciler::new(&mut gateway)
        .reconcile(&group(&gone))
        .expect("remove");
    assert_eq!(outcome.action, Action::Delete);
    let entities = outcome.entities.expect("entities");
    assert!(find(&entities, "Staff").is_none());
    assert!(find(&entities, "admins").is_some());

    let again = Reconciler::new(&mut gateway)
        .reconcile(&group(&gone))
        .expect("second run");
    assert!(!again.changed);
}

#[test]
fn empty_privileges_stay_converged_after_save() {
    let mut gateway = snapshot();
    let first = Reconciler::new(&mut gateway)
        .reconcile(&group(&staff(&[])))
        .expect("create");
    assert_eq!(first.action, Action::Create);

    // An empty list is not written to config.xml at all.
    let bytes = write(gateway.tree()).expect("write");
    let mut reloaded = SnapshotGateway::from_tree(parse(&bytes).expect("reparse"));
    let entities = reloaded.tree().section("system");
    let saved = entities
        .record_values("group")
        .expect("groups")
        .into_iter()
        .find(|entity| entity["name"] == json!("Staff"))
        .expect("saved group");
    assert!(saved.get("priv").is_none());

    let second = Reconciler::new(&mut reloaded)
        .reconcile(&group(&staff(&[])))
        .expect("second run");
    assert_eq!(second.action, Action::None);
    assert!(second.changed_fields.is_empty());
}
