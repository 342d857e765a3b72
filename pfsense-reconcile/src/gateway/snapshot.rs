use std::path::{Path, PathBuf};

use config_reconcile_core::{apply_script, parse_file, write_file, ConfigTree, Document, Script};
use tracing::{debug, info};

use crate::error::ReconcileError;
use crate::gateway::{ExecOutput, Gateway};

/// Gateway over an exported `config.xml`, held in memory.
///
/// Scripts are interpreted against the in-memory tree. A script that fails
/// part way leaves the tree as it was. Nothing touches the file until
/// [`save`](SnapshotGateway::save) is called.
#[derive(Debug, Clone)]
pub struct SnapshotGateway {
    path: Option<PathBuf>,
    tree: ConfigTree,
    modified: bool,
}

impl SnapshotGateway {
    /// Load a snapshot from disk.
    pub fn open(path: &Path) -> Result<Self, ReconcileError> {
        let tree = parse_file(path).map_err(|err| {
            ReconcileError::Precondition(format!(
                "failed to load snapshot {}: {err}",
                path.display()
            ))
        })?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            tree,
            modified: false,
        })
    }

    /// Wrap an already decoded tree, with no backing file.
    pub fn from_tree(tree: ConfigTree) -> Self {
        Self {
            path: None,
            tree,
            modified: false,
        }
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    /// Mutable access for callers simulating changes made by someone else.
    pub fn tree_mut(&mut self) -> &mut ConfigTree {
        &mut self.tree
    }

    /// Whether any script has changed the tree since it was loaded.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Write the tree back to the file it was loaded from.
    pub fn save(&self) -> Result<(), ReconcileError> {
        let Some(path) = &self.path else {
            return Err(ReconcileError::Precondition(
                "snapshot has no backing file".to_string(),
            ));
        };
        write_file(&self.tree, path).map_err(|source| ReconcileError::Write {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "snapshot written");
        Ok(())
    }
}

impl Gateway for SnapshotGateway {
    fn check(&self) -> Result<(), ReconcileError> {
        if self.tree.root_tag != "pfsense" {
            return Err(ReconcileError::Precondition(format!(
                "pfSense configuration expected: root element is <{}>",
                self.tree.root_tag
            )));
        }
        Ok(())
    }

    fn read(&mut self, section: &str) -> Result<Document, ReconcileError> {
        debug!(section, "reading section from snapshot");
        Ok(self.tree.section(section))
    }

    fn exec(&mut self, script: &Script) -> Result<ExecOutput, ReconcileError> {
        let mut root = self.tree.root.clone();
        match apply_script(&mut root, script) {
            Ok(applied) => {
                if !applied.stale {
                    self.tree.root = root;
                    self.modified = true;
                }
                Ok(ExecOutput {
                    code: 0,
                    stdout: applied.stdout(),
                    stderr: String::new(),
                })
            }
            Err(err) => Ok(ExecOutput {
                code: 1,
                stdout: String::new(),
                stderr: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use config_reconcile_core::{parse, ConfigPath, Position, Script, Statement};
    use serde_json::json;

    use super::SnapshotGateway;
    use crate::error::ReconcileError;
    use crate::gateway::Gateway;

    fn gateway() -> SnapshotGateway {
        let tree = parse(
            b"<pfsense><filter><rule><tracker>1</tracker></rule></filter></pfsense>",
        )
        .expect("parse");
        SnapshotGateway::from_tree(tree)
    }

    #[test]
    fn failed_script_leaves_tree_untouched() {
        let mut gateway = gateway();
        let script: Script = vec![
            Statement::Remove {
                path: ConfigPath::new(["filter", "rule"]),
                position: Position(0),
            },
            Statement::SetField {
                path: ConfigPath::new(["filter", "rule"]),
                position: Position(5),
                field: "descr".to_string(),
                value: config_reconcile_core::Literal::Text("x".to_string()),
            },
        ]
        .into_iter()
        .collect();

        let output = gateway.exec(&script).expect("exec");
        assert!(!output.success());
        assert!(!gateway.is_modified());
        assert_eq!(
            gateway.tree().root["filter"]["rule"],
            json!([{"tracker": "1"}])
        );
    }

    #[test]
    fn wrong_root_fails_precondition() {
        let tree = parse(b"<opnsense><filter/></opnsense>").expect("parse");
        let gateway = SnapshotGateway::from_tree(tree);
        assert!(matches!(
            gateway.check(),
            Err(ReconcileError::Precondition(_))
        ));
    }

    #[test]
    fn save_without_file_is_refused() {
        assert!(gateway().save().is_err());
    }

    #[test]
    fn unwritable_snapshot_reports_write_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.xml");
        std::fs::write(&path, "<pfsense><filter/></pfsense>").expect("seed");
        let gateway = SnapshotGateway::open(&path).expect("open");

        // A directory now sits where the file was.
        std::fs::remove_file(&path).expect("remove");
        std::fs::create_dir(&path).expect("mkdir");

        let err = gateway.save().expect_err("directory is not writable as a file");
        assert!(matches!(err, ReconcileError::Write { .. }), "{err:?}");
        assert!(err.to_string().contains("failed to write snapshot"));
    }
}
