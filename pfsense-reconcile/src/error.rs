use config_reconcile_core::{Document, DocumentError, WriteError};
use thiserror::Error;

/// Everything that can abort a reconciliation.
///
/// All variants are fatal to the invocation in progress; nothing is retried.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The console is missing or the host is not the expected platform.
    #[error("precondition failed: {0}")]
    Precondition(String),
    /// The console ran but reported failure.
    #[error("error {context}: exit code {code}")]
    Transport {
        context: String,
        code: i32,
        stdout: String,
        stderr: String,
    },
    /// The console could not be started or fed.
    #[error("error {context}: {source}")]
    Spawn {
        context: String,
        #[source]
        source: std::io::Error,
    },
    /// A snapshot could not be written back to its file.
    #[error("failed to write snapshot {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: WriteError,
    },
    /// The console output could not be decoded.
    #[error("error converting to JSON: {reason}")]
    Parse { reason: String, payload: String },
    /// A parameter is outside its declared set.
    #[error("invalid value '{value}' for {field}; expected one of: {}", .allowed.join(", "))]
    Validation {
        field: String,
        value: String,
        allowed: Vec<String>,
    },
    /// A required parameter was not supplied.
    #[error("missing required parameter: {0}")]
    Missing(String),
    /// The `state` parameter is not `present` or `absent`.
    #[error("incorrect state value '{0}', possible choices: absent, present (default)")]
    State(String),
    /// The addressed record no longer carries the expected key.
    #[error("{kind} '{key}' moved or was removed since it was read; nothing was changed")]
    Conflict { kind: String, key: String },
    /// The manifest could not be read or decoded.
    #[error("failed to load manifest {path}: {reason}")]
    Manifest { path: String, reason: String },
}

impl ReconcileError {
    /// Captured console output, for diagnostics.
    pub fn diagnostic_output(&self) -> Option<String> {
        match self {
            Self::Transport { stdout, stderr, .. } => Some(format!("{stderr}{stdout}")),
            Self::Parse { payload, .. } => Some(payload.clone()),
            _ => None,
        }
    }
}

impl ReconcileError {
    /// A section that decoded as JSON but does not have the expected shape.
    ///
    /// The payload is the offending sequence node as read.
    pub fn malformed(err: DocumentError, document: &Document, list: &str) -> Self {
        Self::Parse {
            reason: err.to_string(),
            payload: document
                .root()
                .get(list)
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}
