//! In-memory execution of a [`Script`] against a configuration root.
//!
//! The interpreter follows the console's array semantics closely enough for
//! offline snapshots and tests:
//!
//! - removing a record leaves the remaining keys untouched, so a sequence
//!   with a hole becomes an integer-keyed mapping (as `json_encode` shows it);
//! - appending uses the largest existing key plus one;
//! - a keyed mapping whose keys are `0..n` again collapses back to a sequence;
//! - incrementing a missing counter yields 1, a textual counter is parsed.

use std::collections::HashMap;

use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::document::{scalar_text, sequence_entries, Position};
use crate::script::{ConfigPath, Literal, Script, Statement, STALE_SENTINEL};

/// Errors raised while executing statements in memory.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApplyError {
    /// A path segment crossed a scalar value.
    #[error("path {0} does not address a mapping")]
    NotAMapping(String),
    /// A statement referenced a local that was never created.
    #[error("local record ${0} was not initialised")]
    UnknownLocal(String),
    /// The addressed record does not exist.
    #[error("no record at {path}[{position}]")]
    MissingRecord { path: String, position: Position },
    /// A counter held a non-numeric value.
    #[error("counter {0} is not numeric")]
    NotNumeric(String),
}

/// Result of executing a script in memory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Applied {
    /// A guard failed and nothing was changed.
    pub stale: bool,
    /// Persist descriptions, in execution order.
    pub persisted: Vec<String>,
    /// Subsystems flagged for reload.
    pub dirty: Vec<String>,
}

impl Applied {
    /// Console output equivalent to what the real shell would print.
    pub fn stdout(&self) -> String {
        if self.stale {
            format!("\n{STALE_SENTINEL}\n")
        } else {
            String::new()
        }
    }
}

/// Execute `script` against `root`, the whole configuration mapping.
///
/// Guards are checked first; if any fails the root is left untouched.
pub fn apply_script(root: &mut Value, script: &Script) -> Result<Applied, ApplyError> {
    let mut applied = Applied::default();

    for statement in script.statements() {
        if let Statement::Guard {
            path,
            position,
            field,
            expected,
        } = statement
        {
            if !guard_holds(root, path, *position, field, expected) {
                applied.stale = true;
                return Ok(applied);
            }
        }
    }

    let mut locals: HashMap<String, Map<String, Value>> = HashMap::new();
    for statement in script.statements() {
        match statement {
            Statement::Guard { .. } => {}
            Statement::NewLocal { var } => {
                locals.insert(var.clone(), Map::new());
            }
            Statement::SetLocal { var, field, value } => {
                let local = locals
                    .get_mut(var)
                    .ok_or_else(|| ApplyError::UnknownLocal(var.clone()))?;
                local.insert(field.clone(), literal_value(value));
            }
            Statement::SetField {
                path,
                position,
                field,
                value,
            } => {
                record_mut(root, path, *position)?.insert(field.clone(), literal_value(value));
            }
            Statement::UnsetField {
                path,
                position,
                field,
            } => {
                record_mut(root, path, *position)?.shift_remove(field);
            }
            Statement::EnsureSequence { path } => {
                let node = node_mut(root, path)?;
                if is_empty_sequence(node) {
                    *node = Value::Array(Vec::new());
                }
            }
            Statement::Append { path, var } => {
                let local = locals
                    .get(var)
                    .cloned()
                    .ok_or_else(|| ApplyError::UnknownLocal(var.clone()))?;
                append(node_mut(root, path)?, Value::Object(local), path)?;
            }
            Statement::Remove { path, position } => {
                remove(node_mut(root, path)?, *position, path)?;
            }
            Statement::Increment { path } => {
                let node = node_mut(root, path)?;
                *node = Value::Number(Number::from(increment(node, path)?));
            }
            Statement::Persist { description } => applied.persisted.push(description.clone()),
            Statement::MarkDirty { subsystem } => applied.dirty.push(subsystem.clone()),
        }
    }

    Ok(applied)
}

fn guard_holds(
    root: &Value,
    path: &ConfigPath,
    position: Position,
    field: &str,
    expected: &str,
) -> bool {
    let Some(node) = node_ref(root, path) else {
        return false;
    };
    let list = path.to_string();
    let Ok(entries) = sequence_entries(&list, node) else {
        return false;
    };
    entries
        .into_iter()
        .find(|(p, _)| *p == position)
        .and_then(|(_, record)| record.get(field))
        .and_then(scalar_text)
        .is_some_and(|value| value == expected)
}

fn node_ref<'a>(root: &'a Value, path: &ConfigPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| node.get(segment.as_str()))
}

/// Walk `path`, creating intermediate mappings the way PHP autovivifies them.
fn node_mut<'a>(root: &'a mut Value, path: &ConfigPath) -> Result<&'a mut Value, ApplyError> {
    let mut node = root;
    for segment in path.segments() {
        if is_empty_sequence(node) {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return Err(ApplyError::NotAMapping(path.to_string()));
        };
        node = map.entry(segment.clone()).or_insert(Value::Null);
    }
    Ok(node)
}

fn record_mut<'a>(
    root: &'a mut Value,
    path: &ConfigPath,
    position: Position,
) -> Result<&'a mut Map<String, Value>, ApplyError> {
    let missing = || ApplyError::MissingRecord {
        path: path.to_string(),
        position,
    };
    let record = match node_mut(root, path)? {
        Value::Array(items) => items.get_mut(position.0),
        Value::Object(map) => {
            if is_keyed_sequence(map) {
                map.get_mut(&position.0.to_string())
            } else if position.0 == 0 {
                // Single collapsed record.
                return Ok(map);
            } else {
                None
            }
        }
        _ => None,
    };
    record.and_then(Value::as_object_mut).ok_or_else(missing)
}

fn append(node: &mut Value, record: Value, path: &ConfigPath) -> Result<(), ApplyError> {
    match node {
        Value::Array(items) => items.push(record),
        Value::Object(map) if is_keyed_sequence(map) => {
            let next = map
                .keys()
                .filter_map(|key| key.parse::<usize>().ok())
                .max()
                .map_or(0, |max| max + 1);
            map.insert(next.to_string(), record);
            collapse_if_dense(node);
        }
        Value::Object(map) if !map.is_empty() => {
            // Single collapsed record: promote to a two-element sequence.
            let first = Value::Object(std::mem::take(map));
            *node = Value::Array(vec![first, record]);
        }
        other if is_empty_sequence(other) => *other = Value::Array(vec![record]),
        _ => return Err(ApplyError::NotAMapping(path.to_string())),
    }
    Ok(())
}

fn remove(node: &mut Value, position: Position, path: &ConfigPath) -> Result<(), ApplyError> {
    match node {
        Value::Array(items) => {
            let idx = position.0;
            if idx + 1 == items.len() {
                items.pop();
            } else if idx < items.len() {
                let keyed: Map<String, Value> = items
                    .drain(..)
                    .enumerate()
                    .filter(|(i, _)| *i != idx)
                    .map(|(i, item)| (i.to_string(), item))
                    .collect();
                *node = Value::Object(keyed);
            }
        }
        Value::Object(map) if is_keyed_sequence(map) => {
            map.shift_remove(&position.0.to_string());
            collapse_if_dense(node);
        }
        Value::Object(_) if position.0 == 0 => *node = Value::Array(Vec::new()),
        Value::Object(_) => {}
        other if is_empty_sequence(other) => {}
        _ => return Err(ApplyError::NotAMapping(path.to_string())),
    }
    Ok(())
}

fn increment(node: &Value, path: &ConfigPath) -> Result<u64, ApplyError> {
    let current = match node {
        Value::Null => 0,
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| ApplyError::NotNumeric(path.to_string()))?,
        Value::String(s) if s.trim().is_empty() => 0,
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| ApplyError::NotNumeric(path.to_string()))?,
        _ => return Err(ApplyError::NotNumeric(path.to_string())),
    };
    Ok(current + 1)
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Text(text) => Value::String(text.clone()),
        Literal::Bool(flag) => Value::Bool(*flag),
        Literal::List(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        Literal::Map(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        ),
    }
}

fn is_empty_sequence(node: &Value) -> bool {
    match node {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn is_keyed_sequence(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|key| key.parse::<usize>().is_ok())
}

fn collapse_if_dense(node: &mut Value) {
    let Value::Object(map) = node else {
        return;
    };
    let dense = map
        .keys()
        .enumerate()
        .all(|(idx, key)| key.parse::<usize>().ok() == Some(idx));
    if dense {
        let items = std::mem::take(map).into_iter().map(|(_, v)| v).collect();
        *node = Value::Array(items);
    }
}
