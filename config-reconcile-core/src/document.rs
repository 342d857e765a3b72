use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// A single entity record: field name -> value.
pub type Record = Map<String, Value>;

/// Key of a record inside its section sequence.
///
/// This is the key the appliance itself uses, not an ordinal. Once a record
/// has been removed the remaining keys keep their values, so positions can
/// have holes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position(pub usize);

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised while reading records out of a document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    /// A sequence entry was not a mapping.
    #[error("entry {position} of '{list}' is not a record")]
    NotARecord { list: String, position: Position },
    /// A keyed sequence mixed integer and non-integer keys.
    #[error("'{list}' has non-integer key '{key}'")]
    BadKey { list: String, key: String },
    /// The sequence node had a scalar value.
    #[error("'{list}' is not a sequence of records")]
    NotASequence { list: String },
}

/// Typed view over one top-level configuration section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    root: Value,
}

impl Document {
    /// Wrap a decoded section subtree.
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Raw section subtree.
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Return the records of sequence `list` in document order.
    ///
    /// Accepts every shape the appliance emits for a sequence: missing,
    /// `null` or `""` (empty), a plain array, an object keyed by integers
    /// (array with holes), or a single collapsed record.
    pub fn records(&self, list: &str) -> Result<Vec<(Position, &Record)>, DocumentError> {
        let Some(node) = self.root.get(list) else {
            return Ok(Vec::new());
        };
        let entries = sequence_entries(list, node)?;

        entries
            .into_iter()
            .map(|(position, value)| match value {
                Value::Object(record) => Ok((position, record)),
                _ => Err(DocumentError::NotARecord {
                    list: list.to_string(),
                    position,
                }),
            })
            .collect()
    }

    /// Clone the records of `list` as plain values, for reporting.
    pub fn record_values(&self, list: &str) -> Result<Vec<Value>, DocumentError> {
        Ok(self
            .records(list)?
            .into_iter()
            .map(|(_, record)| Value::Object(record.clone()))
            .collect())
    }

    /// Read a numeric counter such as `nextgid`. Textual numbers are accepted.
    pub fn counter(&self, name: &str) -> Option<u64> {
        match self.root.get(name)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// Enumerate the entries of a sequence node together with their positions.
pub fn sequence_entries<'a>(
    list: &str,
    node: &'a Value,
) -> Result<Vec<(Position, &'a Value)>, DocumentError> {
    match node {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::Array(items) => Ok(items
            .iter()
            .enumerate()
            .map(|(idx, item)| (Position(idx), item))
            .collect()),
        Value::Object(map) => {
            if map.is_empty() {
                return Ok(Vec::new());
            }
            let integer_keys = map.keys().filter(|k| k.parse::<usize>().is_ok()).count();
            if integer_keys == 0 {
                // Single record collapsed in place of a one-element sequence.
                return Ok(vec![(Position(0), node)]);
            }
            map.iter()
                .map(|(key, value)| {
                    key.parse::<usize>()
                        .map(|idx| (Position(idx), value))
                        .map_err(|_| DocumentError::BadKey {
                            list: list.to_string(),
                            key: key.clone(),
                        })
                })
                .collect()
        }
        _ => Err(DocumentError::NotASequence {
            list: list.to_string(),
        }),
    }
}

/// Coerce a scalar value to the textual form used for comparisons.
///
/// Returns `None` for `null`, sequences and mappings.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
