use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::diff::result::{ChangeSet, DesiredField, FieldChange, FieldValue};
use crate::document::{scalar_text, Record};

/// Diff desired fields against the current record.
///
/// With `current = None` the entity does not exist yet and every field that
/// carries a value is reported as changed. Removal values (`Unset`,
/// `Flag(false)`) are dropped in that case since a fresh record has no such
/// field. Fields not listed in `desired` are never reported.
pub fn diff(desired: &[DesiredField], current: Option<&Record>) -> ChangeSet {
    let changes = desired
        .iter()
        .filter_map(|field| match current {
            None => creation_change(field),
            Some(record) => field_change(field, record.get(&field.name)),
        })
        .collect();
    ChangeSet { changes }
}

fn creation_change(field: &DesiredField) -> Option<FieldChange> {
    if field.value.is_removal() {
        return None;
    }
    let sub_keys = match &field.value {
        FieldValue::Map(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    };
    Some(FieldChange {
        field: field.name.clone(),
        value: field.value.clone(),
        sub_keys,
    })
}

fn field_change(field: &DesiredField, current: Option<&Value>) -> Option<FieldChange> {
    // `null` is what the appliance reports for a key that was assigned nothing.
    let current = current.filter(|value| !value.is_null());

    let sub_keys = match &field.value {
        FieldValue::Text(wanted) => {
            let same = current.and_then(scalar_text).as_deref() == Some(wanted.as_str());
            if same {
                return None;
            }
            Vec::new()
        }
        FieldValue::Flag(wanted) => {
            if flag_present(current) == *wanted {
                return None;
            }
            Vec::new()
        }
        FieldValue::Set(wanted) => {
            // An empty sequence is not written to config.xml, so it reads back as missing.
            if current.map(token_set).unwrap_or_default() == *wanted {
                return None;
            }
            Vec::new()
        }
        FieldValue::Map(wanted) => {
            let differing = differing_sub_keys(wanted, current);
            if differing.is_empty() {
                return None;
            }
            differing
        }
        FieldValue::Unset => {
            current?;
            Vec::new()
        }
    };

    Some(FieldChange {
        field: field.name.clone(),
        value: field.value.clone(),
        sub_keys,
    })
}

/// A flag counts as set when present with anything but an explicit `false`.
fn flag_present(current: Option<&Value>) -> bool {
    !matches!(current, None | Some(Value::Bool(false)))
}

fn token_set(value: &Value) -> BTreeSet<String> {
    let tokens: Vec<String> = match value {
        Value::Array(items) => items.iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    };
    tokens.into_iter().filter(|token| !token.is_empty()).collect()
}

fn differing_sub_keys(wanted: &BTreeMap<String, String>, current: Option<&Value>) -> Vec<String> {
    let current = current.and_then(Value::as_object);
    wanted
        .iter()
        .filter(|(key, value)| {
            let existing = current
                .and_then(|map| map.get(key.as_str()))
                .and_then(scalar_text);
            existing.as_deref() != Some(value.as_str())
        })
        .map(|(key, _)| key.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::{json, Value};

    use super::diff;
    use crate::diff::result::{DesiredField, FieldValue};

    fn record(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().expect("object")
    }

    fn address(pairs: &[(&str, &str)]) -> FieldValue {
        FieldValue::Map(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn numeric_current_value_equals_text() {
        let current = record(json!({"tracker": 1542170888}));
        let desired = vec![DesiredField::text("tracker", "1542170888")];
        assert!(!diff(&desired, Some(&current)).any_change());
    }

    #[test]
    fn missing_scalar_is_a_change() {
        let current = record(json!({"type": "pass"}));
        let desired = vec![DesiredField::text("descr", "web")];
        let changes = diff(&desired, Some(&current));
        assert_eq!(changes.changed_names(), vec!["descr".to_string()]);
    }

    #[test]
    fn set_comparison_ignores_order_and_duplicates() {
        let current = record(json!({"priv": ["b", "a", "a"]}));
        let desired = vec![DesiredField::new("priv", FieldValue::set(["a", "b"]))];
        assert!(!diff(&desired, Some(&current)).any_change());

        let narrower = record(json!({"priv": ["a"]}));
        assert!(diff(&desired, Some(&narrower)).any_change());
    }

    #[test]
    fn single_string_counts_as_one_token_set() {
        let current = record(json!({"priv": "page-all"}));
        let desired = vec![DesiredField::new("priv", FieldValue::set(["page-all"]))];
        assert!(!diff(&desired, Some(&current)).any_change());
    }

    #[test]
    fn missing_or_blank_set_equals_empty_set() {
        let desired = vec![DesiredField::new("priv", FieldValue::set(Vec::<String>::new()))];
        assert!(!diff(&desired, Some(&record(json!({"name": "Staff"})))).any_change());
        assert!(!diff(&desired, Some(&record(json!({"priv": null})))).any_change());
        assert!(!diff(&desired, Some(&record(json!({"priv": ""})))).any_change());

        let nonempty = vec![DesiredField::new("priv", FieldValue::set(["page-all"]))];
        assert!(diff(&nonempty, Some(&record(json!({"name": "Staff"})))).any_change());
    }

    #[test]
    fn mapping_reports_differing_sub_keys_only() {
        let current = record(json!({"destination": {"network": "(self)", "port": 80}}));
        let desired = vec![DesiredField::new(
            "destination",
            address(&[("network", "(self)"), ("port", "443")]),
        )];
        let changes = diff(&desired, Some(&current));
        assert_eq!(changes.changed_names(), vec!["destination.port".to_string()]);
    }

    #[test]
    fn extra_current_sub_keys_are_ignored() {
        let current = record(json!({"source": {"any": "", "not": ""}}));
        let desired = vec![DesiredField::new("source", address(&[("any", "")]))];
        assert!(!diff(&desired, Some(&current)).any_change());
    }

    #[test]
    fn unset_changes_only_when_present() {
        let desired = vec![DesiredField::new("icmptype", FieldValue::Unset)];
        let with = record(json!({"icmptype": "echoreq"}));
        let without = record(json!({"protocol": "tcp"}));
        let null = record(json!({"icmptype": null}));
        assert!(diff(&desired, Some(&with)).any_change());
        assert!(!diff(&desired, Some(&without)).any_change());
        assert!(!diff(&desired, Some(&null)).any_change());
    }

    #[test]
    fn flags_compare_presence() {
        let on = vec![DesiredField::new("disabled", FieldValue::Flag(true))];
        let off = vec![DesiredField::new("disabled", FieldValue::Flag(false))];
        let present = record(json!({"disabled": ""}));
        let absent = record(json!({}));

        assert!(!diff(&on, Some(&present)).any_change());
        assert!(diff(&on, Some(&absent)).any_change());
        assert!(diff(&off, Some(&present)).any_change());
        assert!(!diff(&off, Some(&absent)).any_change());
    }

    #[test]
    fn creation_reports_every_valued_field() {
        let desired = vec![
            DesiredField::text("type", "pass"),
            DesiredField::new("icmptype", FieldValue::Unset),
            DesiredField::new("quick", FieldValue::Flag(false)),
            DesiredField::new("source", address(&[("any", "")])),
        ];
        let changes = diff(&desired, None);
        assert_eq!(
            changes.changed_names(),
            vec!["type".to_string(), "source.any".to_string()]
        );
    }

    #[test]
    fn undeclared_fields_are_left_alone() {
        let current = record(json!({"type": "pass", "gateway": "WAN_DHCP"}));
        let desired = vec![DesiredField::text("type", "pass")];
        assert!(!diff(&desired, Some(&current)).any_change());
    }
}
