use config_reconcile_core::{ChangeSet, Literal, Position, Script, Statement};
use serde::Serialize;

use crate::entity::{State, Target};

/// What a compiled script does to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
    None,
}

/// Compile a change set into a mutation script.
///
/// | state   | position | changes | result                       |
/// |---------|----------|---------|------------------------------|
/// | present | none     | any     | create and append            |
/// | present | some     | yes     | guarded field assignments    |
/// | present | some     | no      | empty                        |
/// | absent  | some     | -       | guarded removal              |
/// | absent  | none     | -       | empty                        |
///
/// `extras` are the system-generated statements for a create. Every
/// non-empty script ends with a persist directive and, when the target has
/// one, a dirty-subsystem directive.
pub fn compile(
    target: &Target,
    key: &str,
    position: Option<Position>,
    state: State,
    changes: &ChangeSet,
    extras: Vec<Statement>,
) -> (Action, Script) {
    let (action, mut script) = match (state, position) {
        (State::Present, None) => (Action::Create, create(target, changes, extras)),
        (State::Present, Some(position)) if changes.any_change() => {
            (Action::Update, update(target, key, position, changes))
        }
        (State::Absent, Some(position)) => (Action::Delete, delete(target, key, position)),
        (State::Present, Some(_)) | (State::Absent, None) => (Action::None, Script::new()),
    };

    if !script.is_empty() {
        script.push(Statement::Persist {
            description: persist_description(action, target, key),
        });
        if let Some(subsystem) = target.dirty_subsystem {
            script.push(Statement::MarkDirty {
                subsystem: subsystem.to_string(),
            });
        }
    }

    (action, script)
}

fn create(target: &Target, changes: &ChangeSet, extras: Vec<Statement>) -> Script {
    let var = target.local.to_string();
    let mut script = Script::new();
    script.push(Statement::NewLocal { var: var.clone() });
    for change in &changes.changes {
        if let Some(value) = Literal::from_field(&change.value) {
            script.push(Statement::SetLocal {
                var: var.clone(),
                field: change.field.clone(),
                value,
            });
        }
    }
    script.extend(extras);
    script.push(Statement::EnsureSequence {
        path: target.list_path(),
    });
    script.push(Statement::Append {
        path: target.list_path(),
        var,
    });
    script
}

fn update(target: &Target, key: &str, position: Position, changes: &ChangeSet) -> Script {
    let path = target.list_path();
    let mut script = Script::new();
    script.push(guard(target, key, position));
    for change in &changes.changes {
        let statement = match Literal::from_field(&change.value) {
            Some(value) => Statement::SetField {
                path: path.clone(),
                position,
                field: change.field.clone(),
                value,
            },
            None => Statement::UnsetField {
                path: path.clone(),
                position,
                field: change.field.clone(),
            },
        };
        script.push(statement);
    }
    script
}

fn delete(target: &Target, key: &str, position: Position) -> Script {
    let mut script = Script::new();
    script.push(guard(target, key, position));
    script.push(Statement::Remove {
        path: target.list_path(),
        position,
    });
    script
}

fn guard(target: &Target, key: &str, position: Position) -> Statement {
    Statement::Guard {
        path: target.list_path(),
        position,
        field: target.key_field.to_string(),
        expected: key.to_string(),
    }
}

fn persist_description(action: Action, target: &Target, key: &str) -> String {
    let verb = match action {
        Action::Create => "added",
        Action::Update => "updated",
        Action::Delete => "removed",
        Action::None => "checked",
    };
    format!("pfsense-reconcile: {verb} {} {key}", target.kind)
}

#[cfg(test)]
mod tests {
    use config_reconcile_core::{diff, DesiredField, FieldValue, Literal, Position, Statement};
    use pretty_assertions::assert_eq;

    use super::{compile, Action};
    use crate::entity::{Entity, State};
    use crate::group::UserGroup;
    use crate::rule::FilterRule;

    #[test]
    fn update_assigns_only_changed_fields() {
        let desired = vec![
            DesiredField::text("type", "block"),
            DesiredField::text("interface", "lan"),
        ];
        let current = serde_json::json!({"type": "pass", "interface": "lan", "tracker": "9"});
        let changes = diff(&desired, current.as_object());

        let (action, script) = compile(
            &FilterRule::TARGET,
            "9",
            Some(Position(4)),
            State::Present,
            &changes,
            Vec::new(),
        );

        assert_eq!(action, Action::Update);
        let path = FilterRule::TARGET.list_path();
        assert_eq!(
            script.statements(),
            &[
                Statement::Guard {
                    path: path.clone(),
                    position: Position(4),
                    field: "tracker".to_string(),
                    expected: "9".to_string(),
                },
                Statement::SetField {
                    path,
                    position: Position(4),
                    field: "type".to_string(),
                    value: Literal::Text("block".to_string()),
                },
                Statement::Persist {
                    description: "pfsense-reconcile: updated rule 9".to_string(),
                },
                Statement::MarkDirty {
                    subsystem: "filter".to_string(),
                },
            ]
        );
    }

    #[test]
    fn removal_values_become_unset_statements() {
        let desired = vec![DesiredField::new("icmptype", FieldValue::Unset)];
        let current = serde_json::json!({"icmptype": "echoreq"});
        let changes = diff(&desired, current.as_object());
        let (_, script) = compile(
            &FilterRule::TARGET,
            "9",
            Some(Position(0)),
            State::Present,
            &changes,
            Vec::new(),
        );
        assert!(script.statements().contains(&Statement::UnsetField {
            path: FilterRule::TARGET.list_path(),
            position: Position(0),
            field: "icmptype".to_string(),
        }));
    }

    #[test]
    fn unchanged_present_entity_compiles_to_nothing() {
        let (action, script) = compile(
            &UserGroup::TARGET,
            "Staff",
            Some(Position(2)),
            State::Present,
            &Default::default(),
            Vec::new(),
        );
        assert_eq!(action, Action::None);
        assert!(script.is_empty());
    }

    #[test]
    fn absent_and_missing_compiles_to_nothing() {
        let (action, script) = compile(
            &UserGroup::TARGET,
            "Staff",
            None,
            State::Absent,
            &Default::default(),
            Vec::new(),
        );
        assert_eq!(action, Action::None);
        assert!(script.is_empty());
    }

    #[test]
    fn delete_is_a_single_guarded_removal() {
        let (action, script) = compile(
            &UserGroup::TARGET,
            "Staff",
            Some(Position(2)),
            State::Absent,
            &Default::default(),
            Vec::new(),
        );
        assert_eq!(action, Action::Delete);
        let removals = script
            .statements()
            .iter()
            .filter(|s| matches!(s, Statement::Remove { .. }))
            .count();
        assert_eq!(removals, 1);
        // Groups do not mark a subsystem dirty.
        assert!(!script
            .statements()
            .iter()
            .any(|s| matches!(s, Statement::MarkDirty { .. })));
    }

    #[test]
    fn create_appends_after_extras() {
        let desired = vec![DesiredField::text("name", "Staff")];
        let changes = diff(&desired, None);
        let extras = vec![Statement::SetLocal {
            var: "group".to_string(),
            field: "gid".to_string(),
            value: Literal::Text("2000".to_string()),
        }];
        let (action, script) = compile(
            &UserGroup::TARGET,
            "Staff",
            None,
            State::Present,
            &changes,
            extras,
        );
        assert_eq!(action, Action::Create);
        let rendered = script.render();
        let gid_at = rendered.find("$group['gid']").expect("gid assigned");
        let append_at = rendered
            .find("$config['system']['group'][] = $group;")
            .expect("appended");
        assert!(gid_at < append_at);
        assert!(rendered.ends_with("write_config('pfsense-reconcile: added group Staff');\n"));
    }
}
