//! Entity kinds managed by the reconciler and their shared parameter helpers.

use std::fmt::{self, Display, Formatter};

use config_reconcile_core::{ConfigPath, DesiredField, Document, Statement};
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// Desired lifecycle of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    Present,
    Absent,
}

impl State {
    /// Parse the `state` parameter; missing means `present`.
    pub fn parse(raw: Option<&str>) -> Result<Self, ReconcileError> {
        match raw.map(str::trim) {
            None | Some("present") => Ok(Self::Present),
            Some("absent") => Ok(Self::Absent),
            Some(other) => Err(ReconcileError::State(other.to_string())),
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => write!(f, "present"),
            Self::Absent => write!(f, "absent"),
        }
    }
}

/// Where an entity kind lives in the configuration and how it is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    /// Human name of the kind, used in reports.
    pub kind: &'static str,
    /// Top-level section read from the appliance.
    pub section: &'static str,
    /// Sequence inside the section holding the records.
    pub list: &'static str,
    /// Natural key field.
    pub key_field: &'static str,
    /// Name of the local record variable used when creating.
    pub local: &'static str,
    /// Subsystem to mark dirty after a change, if any.
    pub dirty_subsystem: Option<&'static str>,
}

impl Target {
    /// Console path of the record sequence.
    pub fn list_path(&self) -> ConfigPath {
        ConfigPath::new([self.section, self.list])
    }
}

/// A desired entity that can be reconciled against a section document.
pub trait Entity {
    const TARGET: Target;

    /// Natural key value.
    fn key(&self) -> &str;

    fn state(&self) -> State;

    /// Declared fields in the order they are written.
    fn desired_fields(&self) -> Vec<DesiredField>;

    /// System-generated statements added when the entity is created.
    fn creation_extras(&self, _document: &Document) -> Result<Vec<Statement>, ReconcileError> {
        Ok(Vec::new())
    }
}

/// A scalar parameter as written in a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Check an enumerated parameter, falling back to `default` when missing.
pub(crate) fn choice(
    field: &str,
    value: Option<&str>,
    default: Option<&str>,
    allowed: &[&str],
) -> Result<Option<String>, ReconcileError> {
    let Some(value) = value.or(default) else {
        return Ok(None);
    };
    if allowed.contains(&value) {
        return Ok(Some(value.to_string()));
    }
    Err(ReconcileError::Validation {
        field: field.to_string(),
        value: value.to_string(),
        allowed: allowed.iter().map(ToString::to_string).collect(),
    })
}

/// Like [`choice`] for parameters that always resolve to a value.
pub(crate) fn required_choice(
    field: &str,
    value: Option<&str>,
    default: &str,
    allowed: &[&str],
) -> Result<String, ReconcileError> {
    choice(field, value, Some(default), allowed).map(|v| v.unwrap_or_else(|| default.to_string()))
}

/// Natural keys must be present and non-blank.
pub(crate) fn required_key(field: &str, value: Option<String>) -> Result<String, ReconcileError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ReconcileError::Missing(field.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{choice, State};
    use crate::error::ReconcileError;

    #[test]
    fn state_defaults_to_present() {
        assert_eq!(State::parse(None).expect("state"), State::Present);
        assert_eq!(State::parse(Some("absent")).expect("state"), State::Absent);
    }

    #[test]
    fn unknown_state_is_rejected() {
        assert!(matches!(
            State::parse(Some("gone")),
            Err(ReconcileError::State(value)) if value == "gone"
        ));
    }

    #[test]
    fn choice_reports_allowed_values() {
        let err = choice("direction", Some("sideways"), None, &["any", "in", "out"])
            .expect_err("invalid");
        assert_eq!(
            err.to_string(),
            "invalid value 'sideways' for direction; expected one of: any, in, out"
        );
    }

    #[test]
    fn missing_optional_choice_stays_missing() {
        assert_eq!(choice("protocol", None, None, &["tcp"]).expect("ok"), None);
    }
}
