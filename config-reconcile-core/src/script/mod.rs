//! Typed mutation statements and their console rendering.

pub mod render;
pub mod statement;

use serde::Serialize;

pub use render::render;
pub use statement::{ConfigPath, Literal, Statement};

/// Line echoed by a rendered script whose guards no longer hold.
pub const STALE_SENTINEL: &str = "reconcile: stale position";

/// Ordered list of statements executed as one console call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Script {
    statements: Vec<Statement>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Render to console syntax.
    pub fn render(&self) -> String {
        render(self)
    }
}

impl Extend<Statement> for Script {
    fn extend<T: IntoIterator<Item = Statement>>(&mut self, iter: T) {
        self.statements.extend(iter);
    }
}

impl FromIterator<Statement> for Script {
    fn from_iter<T: IntoIterator<Item = Statement>>(iter: T) -> Self {
        Self {
            statements: iter.into_iter().collect(),
        }
    }
}
