//! Typed diffing and mutation-script synthesis for nested configuration
//! documents, plus `config.xml` snapshot decoding for offline use.

pub mod apply;
pub mod diff;
pub mod document;
pub mod locate;
pub mod parser;
pub mod script;
pub mod tree;
pub mod writer;

pub use apply::{apply_script, Applied, ApplyError};
pub use diff::{diff, ChangeSet, DesiredField, FieldChange, FieldValue};
pub use document::{scalar_text, Document, DocumentError, Position, Record};
pub use locate::{locate, Located};
pub use parser::{parse, parse_file, ParseError};
pub use script::{render, ConfigPath, Literal, Script, Statement, STALE_SENTINEL};
pub use tree::ConfigTree;
pub use writer::{write, write_file, WriteError};
