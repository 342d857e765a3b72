//! Field-level diffing of a desired entity against its current record.

pub mod engine;
pub mod result;

pub use engine::diff;
pub use result::{ChangeSet, DesiredField, FieldChange, FieldValue};
