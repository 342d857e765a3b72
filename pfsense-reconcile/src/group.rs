//! User groups.
//!
//! Groups live in `$config['system']['group']` and are addressed by name.
//! The numeric `gid` is never declared by the caller: it is taken from
//! `$config['system']['nextgid']` when the group is created, the counter is
//! bumped in the same script, and it is never written again.

use std::collections::BTreeSet;

use config_reconcile_core::{ConfigPath, DesiredField, Document, FieldValue, Literal, Statement};
use serde::Deserialize;

use crate::entity::{required_choice, required_key, Entity, State, Target};
use crate::error::ReconcileError;

pub const SCOPES: &[&str] = &["local", "remote"];

/// Group parameters as written in a manifest, before validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSpec {
    pub state: Option<String>,
    pub name: Option<String>,
    pub scope: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "priv")]
    pub privileges: Option<Vec<String>>,
}

/// A validated user group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserGroup {
    pub state: State,
    pub name: String,
    pub scope: String,
    pub description: String,
    pub privileges: BTreeSet<String>,
}

impl UserGroup {
    /// Validate manifest parameters and apply defaults.
    pub fn from_spec(spec: &GroupSpec) -> Result<Self, ReconcileError> {
        let state = State::parse(spec.state.as_deref())?;
        let name = required_key("name", spec.name.clone())?;
        let privileges = spec
            .privileges
            .clone()
            .ok_or_else(|| ReconcileError::Missing("priv".to_string()))?;

        Ok(Self {
            state,
            name,
            scope: required_choice("scope", spec.scope.as_deref(), "remote", SCOPES)?,
            description: spec.description.clone().unwrap_or_default(),
            privileges: privileges.into_iter().collect(),
        })
    }
}

impl Entity for UserGroup {
    const TARGET: Target = Target {
        kind: "group",
        section: "system",
        list: "group",
        key_field: "name",
        local: "group",
        dirty_subsystem: None,
    };

    fn key(&self) -> &str {
        &self.name
    }

    fn state(&self) -> State {
        self.state
    }

    fn desired_fields(&self) -> Vec<DesiredField> {
        vec![
            DesiredField::text("name", &self.name),
            DesiredField::text("description", &self.description),
            DesiredField::text("scope", &self.scope),
            DesiredField::new("priv", FieldValue::Set(self.privileges.clone())),
        ]
    }

    fn creation_extras(&self, document: &Document) -> Result<Vec<Statement>, ReconcileError> {
        let gid = document
            .counter("nextgid")
            .ok_or_else(|| ReconcileError::Parse {
                reason: "system section has no numeric nextgid counter".to_string(),
                payload: document
                    .root()
                    .get("nextgid")
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            })?;

        Ok(vec![
            Statement::SetLocal {
                var: Self::TARGET.local.to_string(),
                field: "gid".to_string(),
                value: Literal::Text(gid.to_string()),
            },
            Statement::Increment {
                path: ConfigPath::new([Self::TARGET.section, "nextgid"]),
            },
        ])
    }
}
