use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::diff::FieldValue;
use crate::document::Position;

/// Path of a node below the console's `$config` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigPath(Vec<String>);

impl ConfigPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl Display for ConfigPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// A value written by a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    Text(String),
    Bool(bool),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl Literal {
    /// Literal written for a desired field, or `None` when the field is removed.
    pub fn from_field(value: &FieldValue) -> Option<Self> {
        match value {
            FieldValue::Text(text) => Some(Self::Text(text.clone())),
            FieldValue::Flag(true) => Some(Self::Bool(true)),
            FieldValue::Set(tokens) => Some(Self::List(tokens.iter().cloned().collect())),
            FieldValue::Map(map) => Some(Self::Map(map.clone())),
            FieldValue::Flag(false) | FieldValue::Unset => None,
        }
    }
}

/// One mutation statement, rendered to console syntax by
/// [`render`](crate::script::render).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Statement {
    /// Start a fresh local record.
    NewLocal { var: String },
    /// Assign a field of a local record.
    SetLocal {
        var: String,
        field: String,
        value: Literal,
    },
    /// Require that the record at `position` still carries `expected` in `field`.
    Guard {
        path: ConfigPath,
        position: Position,
        field: String,
        expected: String,
    },
    /// Assign a field directly on an existing record.
    SetField {
        path: ConfigPath,
        position: Position,
        field: String,
        value: Literal,
    },
    /// Remove a field from an existing record.
    UnsetField {
        path: ConfigPath,
        position: Position,
        field: String,
    },
    /// Make sure `path` exists and is a sequence.
    EnsureSequence { path: ConfigPath },
    /// Append a local record to the sequence at `path`.
    Append { path: ConfigPath, var: String },
    /// Remove the record at `position`.
    Remove { path: ConfigPath, position: Position },
    /// Increment a numeric counter.
    Increment { path: ConfigPath },
    /// Persist the running configuration.
    Persist { description: String },
    /// Flag a subsystem for reload.
    MarkDirty { subsystem: String },
}

impl Statement {
    pub fn is_guard(&self) -> bool {
        matches!(self, Self::Guard { .. })
    }
}
