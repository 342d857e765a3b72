//! Access to the appliance's configuration.
//!
//! The reconciler only needs three things from the outside world: a
//! precondition check, a fresh copy of one top-level section, and a way to
//! execute a mutation script.
//!
//! - [`shell`] talks to the pfSense developer shell (`pfSsh.php`), locally or
//!   through a command prefix such as `ssh root@fw`.
//! - [`snapshot`] works on an exported `config.xml` held in memory.

pub mod shell;
pub mod snapshot;

use config_reconcile_core::{Document, Script, STALE_SENTINEL};
use serde::Serialize;

use crate::error::ReconcileError;

pub use shell::ShellGateway;
pub use snapshot::SnapshotGateway;

/// Exit status and captured output of one script execution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ExecOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Whether the script's guards rejected a stale position.
    ///
    /// The console echoes each input line after its prompt, so the script's
    /// own `echo` statement shows up in the transcript too. Only a line that
    /// is exactly the sentinel counts.
    pub fn stale(&self) -> bool {
        self.stdout.lines().any(|line| line.trim_end() == STALE_SENTINEL)
    }
}

/// Narrow interface to the appliance.
pub trait Gateway {
    /// Verify the console is reachable before anything is read.
    fn check(&self) -> Result<(), ReconcileError>;

    /// Read one top-level section as a document.
    fn read(&mut self, section: &str) -> Result<Document, ReconcileError>;

    /// Execute a mutation script as a single console call.
    fn exec(&mut self, script: &Script) -> Result<ExecOutput, ReconcileError>;
}

impl<G: Gateway + ?Sized> Gateway for &mut G {
    fn check(&self) -> Result<(), ReconcileError> {
        (**self).check()
    }

    fn read(&mut self, section: &str) -> Result<Document, ReconcileError> {
        (**self).read(section)
    }

    fn exec(&mut self, script: &Script) -> Result<ExecOutput, ReconcileError> {
        (**self).exec(script)
    }
}
