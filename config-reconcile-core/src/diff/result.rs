use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

/// Desired value of one declared field, tagged with its comparison kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Scalar compared by its textual form.
    Text(String),
    /// Presence flag: `true` means the field must exist, `false` that it must not.
    Flag(bool),
    /// Unordered set of tokens.
    Set(BTreeSet<String>),
    /// Nested mapping compared sub-key by sub-key.
    Map(BTreeMap<String, String>),
    /// The field must not exist.
    Unset,
}

impl FieldValue {
    /// Build a set value, collapsing duplicates.
    pub fn set<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Set(tokens.into_iter().map(Into::into).collect())
    }

    /// Whether this value removes the field rather than writing it.
    pub fn is_removal(&self) -> bool {
        matches!(self, Self::Unset | Self::Flag(false))
    }
}

/// A declared field of a desired entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DesiredField {
    pub name: String,
    pub value: FieldValue,
}

impl DesiredField {
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, FieldValue::Text(value.into()))
    }
}

/// One field whose desired value differs from the current record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub value: FieldValue,
    /// Sub-keys that differ, for mapping fields.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_keys: Vec<String>,
}

/// Ordered set of changed fields produced by [`diff`](crate::diff::diff).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ChangeSet {
    pub changes: Vec<FieldChange>,
}

impl ChangeSet {
    pub fn any_change(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Look up the change recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&FieldChange> {
        self.changes.iter().find(|change| change.field == field)
    }

    /// Human-readable names of changed fields (`type`, `source.network`, ...).
    pub fn changed_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for change in &self.changes {
            if change.sub_keys.is_empty() {
                names.push(change.field.clone());
            } else {
                names.extend(
                    change
                        .sub_keys
                        .iter()
                        .map(|key| format!("{}.{key}", change.field)),
                );
            }
        }
        names
    }
}
